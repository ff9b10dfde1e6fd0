mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{ScriptedBackend, capacity};
use parkview::SyncConfig;
use parkview::occupancy::{
    BookingStatus, HandoffSlot, MemoryHandoffSlot, OccupancyStatus, OccupancySync, PushEvent,
    PushEventKind, SyncEvent, SyncEvents, SyncHandle,
};
use tokio::sync::mpsc;
use tokio::time::sleep;

fn config(debounce_ms: u64) -> SyncConfig {
    SyncConfig {
        poll_interval: Duration::from_secs(5),
        push_debounce: Duration::from_millis(debounce_ms),
    }
}

fn backend() -> Arc<ScriptedBackend> {
    common::trace();
    let backend = ScriptedBackend::new();
    backend.set_spots(&[("1", "available"), ("2", "occupied")]);
    backend.set_capacity(vec![capacity("North", 20, 5, 0)]);
    Arc::new(backend)
}

fn spawn(
    backend: &Arc<ScriptedBackend>,
    slot: &Arc<MemoryHandoffSlot>,
    config: SyncConfig,
    reservation: Option<&str>,
) -> (SyncHandle, SyncEvents) {
    OccupancySync::new(backend.clone(), slot.clone(), "a1")
        .with_config(config)
        .with_reservation(reservation.map(str::to_string))
        .spawn()
}

fn drain(events: &mut SyncEvents) -> Vec<SyncEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn three_identical_snapshots_replace_the_table_once() {
    let backend = backend();
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, _events) = spawn(&backend, &slot, config(1500), None);

    // poll at t=0
    sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.status_calls(), 1);
    assert_eq!(handle.generation(), 1);

    // push, fetched when the debounce window closes
    handle.notify(PushEvent::new(PushEventKind::SpotsUpdated).for_area("a1"));
    sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.status_calls(), 2);

    // poll at t=5
    sleep(Duration::from_secs(4)).await;
    assert_eq!(backend.status_calls(), 3);
    assert_eq!(handle.generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn changed_status_replaces_the_table() {
    let backend = backend();
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, _events) = spawn(&backend, &slot, config(1500), None);
    let mut updates = handle.subscribe();

    sleep(Duration::from_millis(10)).await;
    assert_eq!(
        handle.table().snapshot.spots["1"].status,
        OccupancyStatus::Available
    );
    updates.borrow_and_update();

    backend.set_spots(&[("1", "occupied"), ("2", "occupied")]);
    sleep(Duration::from_secs(5)).await;
    assert!(updates.has_changed().unwrap());
    let table = handle.table();
    assert_eq!(table.generation, 2);
    assert_eq!(table.snapshot.spots["1"].status, OccupancyStatus::Occupied);
}

#[tokio::test(start_paused = true)]
async fn push_bursts_collapse_into_one_fetch() {
    let backend = backend();
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, _events) = spawn(&backend, &slot, config(1500), None);
    sleep(Duration::from_millis(10)).await;

    for _ in 0..5 {
        handle.notify(PushEvent::new(PushEventKind::CapacityUpdated));
        sleep(Duration::from_millis(200)).await;
    }
    sleep(Duration::from_secs(1)).await;
    assert_eq!(backend.status_calls(), 2);

    // someone else's area
    handle.notify(PushEvent::new(PushEventKind::SpotsUpdated).for_area("b7"));
    sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn expiry_from_poll_and_push_hands_off_once() {
    let backend = backend();
    backend.set_booking(BookingStatus::Active, "2");
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, mut events) = spawn(&backend, &slot, config(100), Some("r1"));

    sleep(Duration::from_millis(10)).await;
    assert!(handle.table().snapshot.reservation.is_some());

    // t=4.9: the hold lapses and the push arrives 100ms before the poll
    sleep(Duration::from_millis(4890)).await;
    backend.set_booking_status(BookingStatus::Invalid);
    handle.notify(
        PushEvent::new(PushEventKind::ReservationUpdated)
            .for_area("a1")
            .for_reservation("r1"),
    );
    sleep(Duration::from_millis(300)).await;

    let expired: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::ReservationExpired(_)))
        .collect();
    assert_eq!(expired.len(), 1);
    assert_eq!(backend.billing_calls(), 1);

    let payload = slot.take().unwrap().unwrap();
    assert_eq!(payload.reservation_id, "r1");
    assert_eq!(payload.spot.as_deref(), Some("2"));
    assert_eq!(payload.billing.unwrap().total_amount, 3.5);

    // tracking is cancelled; area polling goes on
    let bookings = backend.booking_calls();
    handle.track_reservation("r1");
    sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.booking_calls(), bookings);
    assert!(drain(&mut events).is_empty());
    assert!(handle.is_running());
    assert!(slot.take().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn authentication_loss_stops_everything() {
    let backend = backend();
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, mut events) = spawn(&backend, &slot, config(1500), None);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.generation(), 1);

    backend.unauthorized.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(5)).await;

    assert_eq!(events.recv().await, Some(SyncEvent::AuthenticationLost));
    assert!(!handle.is_running());
    let table = handle.table();
    assert_eq!(table.generation, 2);
    assert!(table.snapshot.spots.is_empty());

    let calls = backend.status_calls();
    handle.notify(PushEvent::new(PushEventKind::SpotsUpdated));
    sleep(Duration::from_secs(20)).await;
    assert_eq!(backend.status_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn network_failure_keeps_the_last_table() {
    let backend = backend();
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, mut events) = spawn(&backend, &slot, config(1500), None);
    sleep(Duration::from_millis(10)).await;

    backend.offline.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(11)).await;
    assert_eq!(backend.status_calls(), 3);
    assert_eq!(handle.generation(), 1);
    assert!(handle.is_running());
    assert!(drain(&mut events).is_empty());

    backend.offline.store(false, Ordering::SeqCst);
    backend.set_spots(&[("1", "reserved")]);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.generation(), 2);
}

#[tokio::test(start_paused = true)]
async fn reservation_not_owned_is_cleared_silently() {
    let backend = backend();
    backend.set_booking(BookingStatus::Active, "1");
    backend.not_owned.store(true, Ordering::SeqCst);
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, mut events) = spawn(&backend, &slot, config(1500), Some("r9"));

    sleep(Duration::from_secs(6)).await;
    assert_eq!(backend.booking_calls(), 1);
    assert_eq!(backend.status_calls(), 2);
    assert!(handle.table().snapshot.reservation.is_none());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn polling_survives_a_dead_push_channel() {
    let backend = backend();
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, _events) = spawn(&backend, &slot, config(1500), None);

    let (tx, rx) = mpsc::channel(8);
    handle.attach_push(rx);
    sleep(Duration::from_millis(10)).await;
    tx.send(PushEvent::new(PushEventKind::SpotsUpdated)).await.unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.status_calls(), 2);

    drop(tx);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.status_calls(), 4);
    assert!(handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_polling() {
    let backend = backend();
    let slot = Arc::new(MemoryHandoffSlot::new());
    let (handle, _events) = spawn(&backend, &slot, config(1500), None);
    sleep(Duration::from_millis(10)).await;

    handle.shutdown();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.status_calls(), 1);
}
