//! The remote parking API, as seen by the engine
//!
//! Transport is not modelled here; implementors decode the wire payloads
//! into these types.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::snapshot::CapacitySectionSnapshot;
use crate::errors::BackendError;
use crate::markup::SectionDescriptor;

/// Response of the layout endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaLayout {
    pub has_layout: bool,
    #[serde(default)]
    pub layout_svg: Option<String>,
    #[serde(default)]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpotsStatus {
    #[serde(default)]
    pub spots: Vec<SpotStatus>,
}

/// One spot as reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotStatus {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub spot_number: Option<String>,
    pub status: String,
    #[serde(default, alias = "isOwnedByCurrentUser")]
    pub is_owned_by_current_user: bool,
}

/// Spot numbers arrive as either `"12"` or `12`
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Lifecycle state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Held,
    Active,
    /// Expired hold; the terminal state that triggers the expiry handoff
    Invalid,
    Completed,
    Cancelled,
    #[serde(other)]
    Other,
}

impl BookingStatus {
    /// Booking still occupies its spot
    pub fn is_live(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Held | BookingStatus::Active
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    pub id: String,
    #[serde(default, alias = "spot_number", deserialize_with = "string_or_number")]
    pub spot_number: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingTimestamps {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub expired_at: Option<String>,
}

/// Charges computed by the backend for a finished or expired booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingBreakdown {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub billed_minutes: Option<u32>,
    #[serde(default)]
    pub base_amount: f64,
    #[serde(default)]
    pub penalty_amount: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub booking_status: BookingStatus,
    pub parking_area: AreaRef,
    #[serde(default)]
    pub parking_slot: Option<SlotRef>,
    #[serde(default)]
    pub timestamps: BookingTimestamps,
    #[serde(default)]
    pub billing_breakdown: Option<BillingBreakdown>,
}

/// The remote parking API
#[async_trait]
pub trait ParkingBackend: Send + Sync {
    async fn parking_area_layout(&self, area_id: &str) -> Result<AreaLayout, BackendError>;

    async fn parking_spots_status(&self, area_id: &str) -> Result<SpotsStatus, BackendError>;

    async fn capacity_status(
        &self,
        area_id: &str,
    ) -> Result<Vec<CapacitySectionSnapshot>, BackendError>;

    async fn booking_details(
        &self,
        reservation_id: &str,
        include_billing: bool,
    ) -> Result<BookingDetails, BackendError>;
}

/// Named change notifications on the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushEventKind {
    ReservationUpdated,
    SpotsUpdated,
    CapacityUpdated,
}

impl PushEventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reservation:updated" => Some(PushEventKind::ReservationUpdated),
            "spots:updated" => Some(PushEventKind::SpotsUpdated),
            "capacity:updated" => Some(PushEventKind::CapacityUpdated),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PushEventKind::ReservationUpdated => "reservation:updated",
            PushEventKind::SpotsUpdated => "spots:updated",
            PushEventKind::CapacityUpdated => "capacity:updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub kind: PushEventKind,
    pub area_id: Option<String>,
    pub reservation_id: Option<String>,
}

impl PushEvent {
    pub fn new(kind: PushEventKind) -> Self {
        PushEvent {
            kind,
            area_id: None,
            reservation_id: None,
        }
    }

    pub fn for_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = Some(area_id.into());
        self
    }

    pub fn for_reservation(mut self, reservation_id: impl Into<String>) -> Self {
        self.reservation_id = Some(reservation_id.into());
        self
    }

    /// Decode a named event with its JSON payload; unknown names are `None`
    pub fn from_wire(name: &str, payload: &Value) -> Option<Self> {
        let kind = PushEventKind::from_name(name)?;
        let field = |key: &str| match payload.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Some(PushEvent {
            kind,
            area_id: field("areaId"),
            reservation_id: field("reservationId"),
        })
    }

    /// Whether the event is about this area or the tracked reservation.
    ///
    /// Events without a filter concern everyone.
    pub fn concerns(&self, area_id: &str, reservation_id: Option<&str>) -> bool {
        let area_ok = self.area_id.as_deref().is_none_or(|a| a == area_id);
        let reservation_ok = match (&self.reservation_id, reservation_id) {
            (None, _) => true,
            (Some(event), Some(tracked)) => event == tracked,
            (Some(_), None) => false,
        };
        match (self.area_id.is_some(), self.reservation_id.is_some()) {
            (true, true) => area_ok || reservation_ok,
            _ => area_ok && reservation_ok,
        }
    }
}
