//! Live occupancy: backend interface, status table and its synchronizer

mod backend;
mod expiry;
mod keys;
mod snapshot;
mod sync;

pub use backend::{
    AreaLayout, AreaRef, BillingBreakdown, BookingDetails, BookingStatus, BookingTimestamps,
    ParkingBackend, PushEvent, PushEventKind, SlotRef, SpotStatus, SpotsStatus,
};
pub use expiry::{
    ExpirationPayload, ExpiryGuard, FileHandoffSlot, HandoffSlot, MemoryHandoffSlot,
};
pub use keys::{
    ExactId, FallbackChain, KeyDerivation, KeyStrategy, LocalSlotNumber, SpotNumber,
    StripFloorPrefix,
};
pub use snapshot::{
    ActiveReservation, CapacitySectionSnapshot, OccupancyRecord, OccupancySnapshot,
    OccupancyStatus, OccupancyTable,
};
pub use sync::{OccupancySync, SyncEvent, SyncEvents, SyncHandle};
