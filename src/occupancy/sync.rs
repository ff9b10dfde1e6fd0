//! The occupancy synchronizer
//!
//! One tokio task owns the table writer. The poll interval, push
//! notifications and handle commands all feed the same loop, and every
//! trigger ends in the same full fetch followed by replace-if-different.
//! Consumers read the table through a `watch` channel and always see a
//! complete snapshot.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::backend::{BookingDetails, BookingStatus, ParkingBackend, PushEvent};
use super::expiry::{ExpirationPayload, ExpiryGuard, HandoffSlot};
use super::snapshot::{ActiveReservation, OccupancySnapshot, OccupancyTable};
use crate::config::SyncConfig;
use crate::errors::BackendError;
use crate::log::{debug, info, warn};

/// Terminal notifications for the screen
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The tracked reservation expired; the payload is also in the handoff slot
    ReservationExpired(ExpirationPayload),
    /// The session is gone; both channels have stopped
    AuthenticationLost,
}

pub type SyncEvents = mpsc::UnboundedReceiver<SyncEvent>;

enum Command {
    Push(PushEvent),
    AttachPush(mpsc::Receiver<PushEvent>),
    Track(String),
    Clear,
    Refresh,
}

/// What the loop does after handling a message
enum Flow {
    Continue,
    Refresh,
    Stop,
}

/// Configuration of a synchronizer before it is started
pub struct OccupancySync {
    backend: Arc<dyn ParkingBackend>,
    handoff: Arc<dyn HandoffSlot>,
    area_id: String,
    config: SyncConfig,
    reservation: Option<String>,
}

impl OccupancySync {
    pub fn new(
        backend: Arc<dyn ParkingBackend>,
        handoff: Arc<dyn HandoffSlot>,
        area_id: impl Into<String>,
    ) -> Self {
        OccupancySync {
            backend,
            handoff,
            area_id: area_id.into(),
            config: SyncConfig::default(),
            reservation: None,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Track this reservation from the first fetch on
    pub fn with_reservation(mut self, reservation_id: Option<String>) -> Self {
        self.reservation = reservation_id;
        self
    }

    /// Start the task. Must be called from within a tokio runtime.
    pub fn spawn(self) -> (SyncHandle, SyncEvents) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (table_tx, table_rx) = watch::channel(Arc::new(OccupancyTable::default()));

        let task = SyncTask {
            backend: self.backend,
            handoff: self.handoff,
            area_id: self.area_id,
            config: self.config,
            reservation: self.reservation,
            guard: ExpiryGuard::default(),
            table: table_tx,
            events: events_tx,
        };
        let join = tokio::spawn(task.run(commands_rx));

        let handle = SyncHandle {
            commands: commands_tx,
            table: table_rx,
            task: join,
        };
        (handle, events_rx)
    }
}

/// Control surface of a running synchronizer. Dropping it stops the task.
#[derive(Debug)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    table: watch::Receiver<Arc<OccupancyTable>>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("synchronizer already stopped");
        }
    }

    /// Feed one push notification
    pub fn notify(&self, event: PushEvent) {
        self.send(Command::Push(event));
    }

    /// Take notifications from a push subscription. Polling keeps running
    /// whether or not this channel ever delivers.
    pub fn attach_push(&self, events: mpsc::Receiver<PushEvent>) {
        self.send(Command::AttachPush(events));
    }

    pub fn track_reservation(&self, reservation_id: impl Into<String>) {
        self.send(Command::Track(reservation_id.into()));
    }

    pub fn clear_reservation(&self) {
        self.send(Command::Clear);
    }

    /// Fetch now instead of waiting for the next tick
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Current table
    pub fn table(&self) -> Arc<OccupancyTable> {
        self.table.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.table.borrow().generation
    }

    /// A receiver that is notified on every replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<OccupancyTable>> {
        self.table.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop both channels immediately
    pub fn shutdown(self) {}
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Push(e) => write!(f, "Push({})", e.kind.name()),
            Command::AttachPush(_) => f.write_str("AttachPush"),
            Command::Track(id) => write!(f, "Track({id})"),
            Command::Clear => f.write_str("Clear"),
            Command::Refresh => f.write_str("Refresh"),
        }
    }
}

struct SyncTask {
    backend: Arc<dyn ParkingBackend>,
    handoff: Arc<dyn HandoffSlot>,
    area_id: String,
    config: SyncConfig,
    reservation: Option<String>,
    guard: ExpiryGuard,
    table: watch::Sender<Arc<OccupancyTable>>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

async fn next_push(push: &mut Option<mpsc::Receiver<PushEvent>>) -> Option<PushEvent> {
    match push {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl SyncTask {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut poll = time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut push: Option<mpsc::Receiver<PushEvent>> = None;
        let mut debounce: Option<Instant> = None;

        info!(area = %self.area_id, "occupancy sync started");
        loop {
            let flow = tokio::select! {
                _ = poll.tick() => Flow::Refresh,
                command = commands.recv() => match command {
                    Some(command) => self.apply(command, &mut push, &mut debounce),
                    None => Flow::Stop,
                },
                event = next_push(&mut push) => match event {
                    Some(event) => self.on_push(event, &mut debounce),
                    None => {
                        warn!("push channel closed, continuing with polling only");
                        push = None;
                        Flow::Continue
                    }
                },
                _ = time::sleep_until(debounce.unwrap_or_else(Instant::now)), if debounce.is_some() => {
                    debounce = None;
                    Flow::Refresh
                }
            };

            match flow {
                Flow::Continue => {}
                Flow::Refresh => {
                    if let Flow::Stop = self.refresh().await {
                        break;
                    }
                }
                Flow::Stop => break,
            }
        }
        info!(area = %self.area_id, "occupancy sync stopped");
    }

    fn apply(
        &mut self,
        command: Command,
        push: &mut Option<mpsc::Receiver<PushEvent>>,
        debounce: &mut Option<Instant>,
    ) -> Flow {
        debug!(?command, "sync command");
        match command {
            Command::Push(event) => self.on_push(event, debounce),
            Command::AttachPush(rx) => {
                *push = Some(rx);
                Flow::Continue
            }
            Command::Track(id) => {
                if self.guard.was_reported(&id) {
                    debug!(reservation = %id, "reservation already expired, not tracking");
                    return Flow::Continue;
                }
                self.reservation = Some(id);
                Flow::Refresh
            }
            Command::Clear => {
                self.reservation = None;
                Flow::Refresh
            }
            Command::Refresh => Flow::Refresh,
        }
    }

    /// Open a debounce window unless one is already pending
    fn on_push(&mut self, event: PushEvent, debounce: &mut Option<Instant>) -> Flow {
        if !event.concerns(&self.area_id, self.reservation.as_deref()) {
            debug!(kind = event.kind.name(), "push event for someone else");
            return Flow::Continue;
        }
        if debounce.is_none() {
            *debounce = Some(Instant::now() + self.config.push_debounce);
        }
        Flow::Continue
    }

    async fn refresh(&mut self) -> Flow {
        match self.fetch().await {
            Ok((snapshot, booking)) => {
                self.publish(snapshot);
                if let Some((id, booking)) = booking {
                    if booking.booking_status == BookingStatus::Invalid {
                        self.expire(&id, &booking).await;
                    }
                }
                Flow::Continue
            }
            Err(BackendError::Unauthorized) => {
                warn!(area = %self.area_id, "authentication lost, stopping sync");
                self.reservation = None;
                self.publish(OccupancySnapshot::default());
                let _ = self.events.send(SyncEvent::AuthenticationLost);
                Flow::Stop
            }
            Err(e) => {
                warn!(area = %self.area_id, error = %e, "occupancy fetch failed, keeping last table");
                Flow::Continue
            }
        }
    }

    /// One full round: spots, capacity and the tracked booking
    async fn fetch(
        &mut self,
    ) -> Result<(OccupancySnapshot, Option<(String, BookingDetails)>), BackendError> {
        let (spots, capacity) = tokio::join!(
            self.backend.parking_spots_status(&self.area_id),
            self.backend.capacity_status(&self.area_id),
        );
        let (spots, capacity) = (spots?, capacity?);

        let booking = match self.reservation.clone() {
            None => None,
            Some(id) => match self.backend.booking_details(&id, false).await {
                Ok(details) => Some((id, details)),
                Err(BackendError::NotOwned { .. }) => {
                    debug!(reservation = %id, "reservation not owned, treating as no booking");
                    self.reservation = None;
                    None
                }
                Err(e) => return Err(e),
            },
        };

        let reservation = booking.as_ref().map(|(id, b)| ActiveReservation {
            reservation_id: id.clone(),
            area_id: b.parking_area.id.clone(),
            spot: b
                .parking_slot
                .as_ref()
                .map(|s| s.spot_number.clone().unwrap_or_else(|| s.id.clone())),
            section: b.parking_slot.as_ref().and_then(|s| s.section.clone()),
            status: b.booking_status,
        });

        Ok((
            OccupancySnapshot::from_parts(spots, capacity, reservation),
            booking,
        ))
    }

    fn publish(&self, snapshot: OccupancySnapshot) {
        let next = self.table.borrow().replaced_by(snapshot);
        match next {
            Some(table) => {
                debug!(generation = table.generation, "occupancy table replaced");
                self.table.send_replace(Arc::new(table));
            }
            None => debug!("occupancy unchanged"),
        }
    }

    /// Report an expired reservation once and stop tracking it
    async fn expire(&mut self, reservation_id: &str, booking: &BookingDetails) {
        self.reservation = None;
        if !self.guard.first_report(reservation_id) {
            return;
        }

        let billing = match self.backend.booking_details(reservation_id, true).await {
            Ok(details) => details.billing_breakdown,
            Err(e) => {
                warn!(reservation = %reservation_id, error = %e, "billing unavailable for expired reservation");
                None
            }
        };
        let payload = ExpirationPayload::from_booking(reservation_id, booking, billing);
        if let Err(e) = self.handoff.store(&payload) {
            warn!(error = %e, "could not write expiration handoff");
        }
        info!(reservation = %reservation_id, "reservation expired");
        let _ = self.events.send(SyncEvent::ReservationExpired(payload));
    }
}
