//! The live layout screen
//!
//! Owns one layout at a time: fetch, parse, position, center, then keep the
//! classification live through an [`OccupancySync`]. Loads are guarded per
//! area and the newest request wins; results of older requests are dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};

use crate::classify::{VisualState, classify};
use crate::config::EngineConfig;
use crate::errors::{MarkupError, ScreenError};
use crate::geometry::{PositionedLayout, resolve_layout};
use crate::log::{debug, info};
use crate::markup::{ParsedLayout, parse_layout};
use crate::occupancy::{
    ExpirationPayload, HandoffSlot, OccupancySnapshot, OccupancySync, OccupancyTable,
    ParkingBackend, PushEvent, SyncEvent, SyncEvents, SyncHandle,
};
use crate::region::RegionKind;
use crate::session::SessionCache;
use crate::types::{Px, RectPx, Size};
use crate::viewport::{ScrollOffset, center_offset};

/// What the rendering layer draws for one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub id: String,
    pub label: String,
    pub kind: RegionKind,
    pub rendered: RectPx,
    pub state: VisualState,
}

/// Result of [`LayoutScreen::load_layout`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded {
        regions: usize,
        diagnostics: Vec<MarkupError>,
    },
    /// The area has no usable layout yet; a normal state, not an error
    NoLayout,
    /// A load for the same area is already in flight; this request was dropped
    AlreadyLoading,
    /// A newer load started while this one was fetching
    Superseded,
}

/// Navigation the host must perform
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenTransition {
    SignedOut,
    /// The payload has also been written to the handoff slot
    ReservationExpired(ExpirationPayload),
}

pub type TapCallback = Arc<dyn Fn(&RegionView) + Send + Sync>;

struct Loaded {
    area_id: String,
    parsed: ParsedLayout,
    positioned: PositionedLayout,
    offset: ScrollOffset,
}

#[derive(Default)]
struct ScreenState {
    loaded: Option<Loaded>,
    live: Option<SyncHandle>,
}

/// Removes an area from the in-flight set when the load finishes, however it ends
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    area_id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.area_id);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct LayoutScreen {
    backend: Arc<dyn ParkingBackend>,
    handoff: Arc<dyn HandoffSlot>,
    session: Arc<SessionCache>,
    config: EngineConfig,
    target: Mutex<Size<Px>>,
    viewport: Size<Px>,
    in_flight: Mutex<HashSet<String>>,
    epoch: AtomicU64,
    state: Mutex<ScreenState>,
    events: tokio::sync::Mutex<Option<SyncEvents>>,
    on_tap: Mutex<Option<TapCallback>>,
}

impl LayoutScreen {
    /// A screen rendering into `target`, scrolled inside `viewport`
    pub fn new(
        backend: Arc<dyn ParkingBackend>,
        handoff: Arc<dyn HandoffSlot>,
        session: Arc<SessionCache>,
        target: Size<Px>,
        viewport: Size<Px>,
    ) -> Self {
        LayoutScreen {
            backend,
            handoff,
            session,
            config: EngineConfig::default(),
            target: Mutex::new(target),
            viewport,
            in_flight: Mutex::new(HashSet::new()),
            epoch: AtomicU64::new(0),
            state: Mutex::new(ScreenState::default()),
            events: tokio::sync::Mutex::new(None),
            on_tap: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch, parse and position the layout of an area
    pub async fn load_layout(&self, area_id: &str) -> Result<LoadOutcome, ScreenError> {
        if !lock(&self.in_flight).insert(area_id.to_string()) {
            debug!(area = %area_id, "layout load already in flight");
            return Ok(LoadOutcome::AlreadyLoading);
        }
        let _in_flight = InFlight {
            set: &self.in_flight,
            area_id: area_id.to_string(),
        };
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.teardown();

        let (layout, fresh) = match self.session.layout(area_id) {
            Some(cached) => (cached, false),
            None => {
                let fetched = self.backend.parking_area_layout(area_id).await?;
                (Arc::new(fetched), true)
            }
        };
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(area = %area_id, "discarding superseded layout");
            return Ok(LoadOutcome::Superseded);
        }

        let svg = match layout.layout_svg.as_deref() {
            Some(svg) if layout.has_layout && !svg.trim().is_empty() => svg,
            _ => return Ok(LoadOutcome::NoLayout),
        };
        let parsed = parse_layout(svg, &layout.sections, &self.config.parse);
        if parsed.is_empty() {
            info!(area = %area_id, "layout has no usable regions");
            return Ok(LoadOutcome::NoLayout);
        }
        // cache only layouts that produced regions
        if fresh {
            self.session.store_layout(area_id, layout.clone());
        }

        let target = *lock(&self.target);
        let positioned = resolve_layout(&parsed.regions, &parsed.view_box, target)?;
        let offset = center_offset(&positioned, self.viewport);
        let outcome = LoadOutcome::Loaded {
            regions: parsed.regions.len(),
            diagnostics: parsed.diagnostics.clone(),
        };
        {
            let mut state = lock(&self.state);
            // a newer load may have started while this one was resolving
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!(area = %area_id, "discarding superseded layout");
                return Ok(LoadOutcome::Superseded);
            }
            state.loaded = Some(Loaded {
                area_id: area_id.to_string(),
                parsed,
                positioned,
                offset,
            });
        }
        info!(area = %area_id, "layout loaded");
        Ok(outcome)
    }

    /// Drop the current layout and stop live updates
    fn teardown(&self) {
        let mut state = lock(&self.state);
        state.loaded = None;
        state.live = None;
    }

    /// Start live occupancy for the loaded area; replaces any previous sync.
    /// Returns false when no layout is loaded.
    pub async fn start_live(&self, reservation_id: Option<String>) -> bool {
        let spawned = {
            let mut state = lock(&self.state);
            let Some(area_id) = state.loaded.as_ref().map(|l| l.area_id.clone()) else {
                return false;
            };
            let (handle, events) =
                OccupancySync::new(self.backend.clone(), self.handoff.clone(), area_id)
                    .with_config(self.config.sync.clone())
                    .with_reservation(reservation_id)
                    .spawn();
            state.live = Some(handle);
            events
        };
        *self.events.lock().await = Some(spawned);
        true
    }

    pub fn stop_live(&self) {
        lock(&self.state).live = None;
    }

    pub fn is_live(&self) -> bool {
        lock(&self.state)
            .live
            .as_ref()
            .is_some_and(SyncHandle::is_running)
    }

    /// Forward a push notification to the synchronizer
    pub fn notify(&self, event: PushEvent) {
        if let Some(live) = &lock(&self.state).live {
            live.notify(event);
        }
    }

    pub fn attach_push(&self, events: mpsc::Receiver<PushEvent>) {
        if let Some(live) = &lock(&self.state).live {
            live.attach_push(events);
        }
    }

    pub fn track_reservation(&self, reservation_id: &str) {
        if let Some(live) = &lock(&self.state).live {
            live.track_reservation(reservation_id);
        }
    }

    /// Notified on every occupancy table replacement
    pub fn status_updates(&self) -> Option<watch::Receiver<Arc<OccupancyTable>>> {
        lock(&self.state).live.as_ref().map(SyncHandle::subscribe)
    }

    /// Wait for the next navigation the synchronizer asks for.
    ///
    /// `None` when the screen is not live or the synchronizer stopped
    /// without a transition.
    pub async fn next_transition(&self) -> Option<ScreenTransition> {
        let event = {
            let mut events = self.events.lock().await;
            events.as_mut()?.recv().await
        };
        match event? {
            SyncEvent::AuthenticationLost => {
                self.teardown();
                self.session.invalidate();
                Some(ScreenTransition::SignedOut)
            }
            SyncEvent::ReservationExpired(payload) => {
                self.stop_live();
                Some(ScreenTransition::ReservationExpired(payload))
            }
        }
    }

    /// Every region with its rendered rectangle and current classification
    pub fn view(&self) -> Vec<RegionView> {
        let state = lock(&self.state);
        let Some(loaded) = &state.loaded else {
            return Vec::new();
        };
        let table = state.live.as_ref().map(SyncHandle::table);
        let empty = OccupancySnapshot::default();
        let snapshot = table.as_ref().map_or(&empty, |t| &t.snapshot);

        loaded
            .positioned
            .regions()
            .iter()
            .map(|p| RegionView {
                id: p.region.id.clone(),
                label: p.region.label(),
                kind: p.region.kind(),
                rendered: p.rendered,
                state: classify(&p.region, snapshot, &self.config.fallback),
            })
            .collect()
    }

    /// Scroll offset computed at load or at the last tab activation
    pub fn center_offset(&self) -> ScrollOffset {
        lock(&self.state)
            .loaded
            .as_ref()
            .map(|l| l.offset)
            .unwrap_or_default()
    }

    /// Re-center the viewport when the screen becomes visible again
    pub fn on_tab_activated(&self) -> ScrollOffset {
        let mut state = lock(&self.state);
        let Some(loaded) = state.loaded.as_mut() else {
            return ScrollOffset::default();
        };
        loaded.offset = center_offset(&loaded.positioned, self.viewport);
        loaded.offset
    }

    /// Re-fit the layout to a new render target. The viewport offset stays.
    pub fn resize(&self, target: Size<Px>) -> Result<(), ScreenError> {
        *lock(&self.target) = target;
        let mut state = lock(&self.state);
        if let Some(loaded) = state.loaded.as_mut() {
            loaded.positioned =
                resolve_layout(&loaded.parsed.regions, &loaded.parsed.view_box, target)?;
        }
        Ok(())
    }

    pub fn set_on_tap(&self, callback: impl Fn(&RegionView) + Send + Sync + 'static) {
        *lock(&self.on_tap) = Some(Arc::new(callback));
    }

    /// Deliver a tap on a region; false when the id is not on screen
    pub fn tap(&self, region_id: &str) -> bool {
        let Some(view) = self.view().into_iter().find(|v| v.id == region_id) else {
            return false;
        };
        let callback = lock(&self.on_tap).clone();
        if let Some(callback) = callback {
            callback(&view);
        }
        true
    }

    pub fn area_id(&self) -> Option<String> {
        lock(&self.state).loaded.as_ref().map(|l| l.area_id.clone())
    }

    pub fn positioned(&self) -> Option<PositionedLayout> {
        lock(&self.state).loaded.as_ref().map(|l| l.positioned.clone())
    }
}
