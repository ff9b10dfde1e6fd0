//! Reservation expiry: one-shot detection and the durable handoff slot

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::backend::{BillingBreakdown, BookingDetails};
use crate::errors::HandoffError;

/// What the next screen needs to explain an expired reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationPayload {
    pub reservation_id: String,
    pub spot: Option<String>,
    pub area_id: String,
    pub area_name: Option<String>,
    pub billing: Option<BillingBreakdown>,
    pub expired_at: Option<String>,
}

impl ExpirationPayload {
    pub fn from_booking(
        reservation_id: &str,
        booking: &BookingDetails,
        billing: Option<BillingBreakdown>,
    ) -> Self {
        let spot = booking
            .parking_slot
            .as_ref()
            .map(|s| s.spot_number.clone().unwrap_or_else(|| s.id.clone()));
        ExpirationPayload {
            reservation_id: reservation_id.to_string(),
            spot,
            area_id: booking.parking_area.id.clone(),
            area_name: booking.parking_area.name.clone(),
            billing: billing.or_else(|| booking.billing_breakdown.clone()),
            expired_at: booking
                .timestamps
                .expired_at
                .clone()
                .or_else(|| booking.timestamps.end_time.clone()),
        }
    }
}

/// Remembers which reservations were already reported as expired
#[derive(Debug, Default)]
pub struct ExpiryGuard {
    reported: HashSet<String>,
}

impl ExpiryGuard {
    /// True exactly once per reservation id
    pub fn first_report(&mut self, reservation_id: &str) -> bool {
        self.reported.insert(reservation_id.to_string())
    }

    pub fn was_reported(&self, reservation_id: &str) -> bool {
        self.reported.contains(reservation_id)
    }
}

/// Storage that survives the screen transition triggered by an expiry
pub trait HandoffSlot: Send + Sync {
    /// Replace whatever the slot holds
    fn store(&self, payload: &ExpirationPayload) -> Result<(), HandoffError>;

    /// Remove and return the stored payload
    fn take(&self) -> Result<Option<ExpirationPayload>, HandoffError>;
}

/// A JSON file, written via a temporary sibling and renamed into place
#[derive(Debug, Clone)]
pub struct FileHandoffSlot {
    path: PathBuf,
}

impl FileHandoffSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileHandoffSlot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HandoffSlot for FileHandoffSlot {
    fn store(&self, payload: &ExpirationPayload) -> Result<(), HandoffError> {
        let json = serde_json::to_vec_pretty(payload)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn take(&self) -> Result<Option<ExpirationPayload>, HandoffError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        fs::remove_file(&self.path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// In-process slot, for tests and hosts that keep the engine alive across screens
#[derive(Debug, Default)]
pub struct MemoryHandoffSlot {
    slot: Mutex<Option<ExpirationPayload>>,
}

impl MemoryHandoffSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content without consuming it
    pub fn peek(&self) -> Option<ExpirationPayload> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl HandoffSlot for MemoryHandoffSlot {
    fn store(&self, payload: &ExpirationPayload) -> Result<(), HandoffError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(payload.clone());
        Ok(())
    }

    fn take(&self) -> Result<Option<ExpirationPayload>, HandoffError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::backend::{AreaRef, BookingStatus, BookingTimestamps, SlotRef};

    fn booking() -> BookingDetails {
        BookingDetails {
            booking_status: BookingStatus::Invalid,
            parking_area: AreaRef {
                id: "a1".into(),
                name: Some("Lot A".into()),
            },
            parking_slot: Some(SlotRef {
                id: "s-9".into(),
                spot_number: Some("12".into()),
                section: None,
            }),
            timestamps: BookingTimestamps {
                end_time: Some("2026-01-01T10:00:00Z".into()),
                ..Default::default()
            },
            billing_breakdown: None,
        }
    }

    fn billing() -> BillingBreakdown {
        BillingBreakdown {
            currency: Some("EUR".into()),
            billed_minutes: Some(30),
            base_amount: 2.0,
            penalty_amount: 1.0,
            total_amount: 3.0,
        }
    }

    #[test]
    fn guard_reports_once() {
        let mut guard = ExpiryGuard::default();
        assert!(guard.first_report("r1"));
        assert!(!guard.first_report("r1"));
        assert!(guard.first_report("r2"));
        assert!(guard.was_reported("r1"));
    }

    #[test]
    fn payload_from_booking() {
        let payload = ExpirationPayload::from_booking("r1", &booking(), Some(billing()));
        assert_eq!(payload.spot.as_deref(), Some("12"));
        assert_eq!(payload.area_name.as_deref(), Some("Lot A"));
        assert_eq!(payload.expired_at.as_deref(), Some("2026-01-01T10:00:00Z"));
        assert_eq!(payload.billing.unwrap().total_amount, 3.0);
    }

    #[test]
    fn memory_slot_is_consumed_by_take() {
        let slot = MemoryHandoffSlot::new();
        let payload = ExpirationPayload::from_booking("r1", &booking(), None);
        slot.store(&payload).unwrap();
        assert_eq!(slot.peek(), Some(payload.clone()));
        assert_eq!(slot.take().unwrap(), Some(payload));
        assert_eq!(slot.take().unwrap(), None);
    }

    #[test]
    fn file_slot_survives_a_new_handle() {
        let path = std::env::temp_dir().join(format!("parkview-handoff-{}.json", std::process::id()));
        let payload = ExpirationPayload::from_booking("r1", &booking(), Some(billing()));

        FileHandoffSlot::new(&path).store(&payload).unwrap();
        let reopened = FileHandoffSlot::new(&path);
        assert_eq!(reopened.take().unwrap(), Some(payload));
        assert!(!reopened.path().exists());
        assert_eq!(reopened.take().unwrap(), None);
    }
}
