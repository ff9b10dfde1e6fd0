//! Visual state of a region
//!
//! A strict priority chain: ownership beats everything, an active
//! reservation in a capacity section beats utilization, and per-slot
//! regions fall back to their live status.

use serde::{Deserialize, Serialize};

use crate::defaults::{CRITICAL_UTILIZATION, HIGH_UTILIZATION, LOW_UTILIZATION};
use crate::occupancy::{CapacitySectionSnapshot, FallbackChain, OccupancySnapshot, OccupancyStatus};
use crate::region::{RawRegion, RegionSource, SectionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualState {
    /// Part of the current user's reservation
    Owned,
    Unavailable,
    Critical,
    High,
    Moderate,
    Low,
    Available,
    Occupied,
    Reserved,
    Unknown,
}

impl VisualState {
    pub fn name(self) -> &'static str {
        match self {
            VisualState::Owned => "owned",
            VisualState::Unavailable => "unavailable",
            VisualState::Critical => "critical",
            VisualState::High => "high",
            VisualState::Moderate => "moderate",
            VisualState::Low => "low",
            VisualState::Available => "available",
            VisualState::Occupied => "occupied",
            VisualState::Reserved => "reserved",
            VisualState::Unknown => "unknown",
        }
    }
}

impl From<OccupancyStatus> for VisualState {
    fn from(status: OccupancyStatus) -> Self {
        match status {
            OccupancyStatus::Available => VisualState::Available,
            OccupancyStatus::Occupied => VisualState::Occupied,
            OccupancyStatus::Reserved => VisualState::Reserved,
            OccupancyStatus::Unavailable => VisualState::Unavailable,
            OccupancyStatus::Unknown => VisualState::Unknown,
        }
    }
}

/// Classify one region against a snapshot
pub fn classify(
    region: &RawRegion,
    snapshot: &OccupancySnapshot,
    chain: &FallbackChain,
) -> VisualState {
    if snapshot.is_owned(region, chain) {
        return VisualState::Owned;
    }
    match &region.source {
        RegionSource::Section {
            mode: SectionMode::CapacityOnly,
            ..
        } => classify_utilization(snapshot.capacity_for(region)),
        RegionSource::Section {
            mode: SectionMode::SlotBased,
            ..
        }
        | RegionSource::Spot { .. }
        | RegionSource::SectionSlot { .. }
        | RegionSource::MarkedSlot { .. } => snapshot
            .lookup(region, chain)
            .map_or(VisualState::Unknown, |r| r.status.into()),
    }
}

/// Classification of a capacity-only section from its counts alone
pub fn classify_utilization(capacity: Option<&CapacitySectionSnapshot>) -> VisualState {
    let Some(capacity) = capacity else {
        return VisualState::Unknown;
    };
    if capacity.active_reservations > 0 {
        return VisualState::Unavailable;
    }
    match capacity.utilization() {
        None => VisualState::Unavailable,
        Some(u) if u >= CRITICAL_UTILIZATION => VisualState::Critical,
        Some(u) if u >= HIGH_UTILIZATION => VisualState::High,
        Some(u) if u <= LOW_UTILIZATION => VisualState::Low,
        Some(_) => VisualState::Moderate,
    }
}
