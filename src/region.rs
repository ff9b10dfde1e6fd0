//! Parsed regions: the spots and sections found in a layout document

use serde::{Deserialize, Serialize};

use crate::types::RectDoc;

/// How a section is tracked by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionMode {
    /// Aggregate pool, tracked purely by counts
    #[serde(alias = "capacity", alias = "capacity-only")]
    CapacityOnly,
    /// Individual slots, each with its own status
    #[serde(alias = "slot", alias = "slots")]
    SlotBased,
}

/// Coarse kind of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Spot,
    Section,
}

/// Where a region came from, and what it carries.
///
/// Each layout format contributes its own variant; consumers match
/// exhaustively instead of probing optional fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSource {
    /// Plain spot id (`spot-12`, `P12`, `12`, `F2-spot-7`)
    Spot {
        number: Option<u32>,
        floor: Option<String>,
    },
    /// Section-qualified slot (`A-12`, `B07`, `L1-C-3`)
    SectionSlot {
        section: String,
        local_slot: u32,
        floor: Option<String>,
    },
    /// Element carrying the `data-type="parking-slot"` marker set
    MarkedSlot {
        slot_id: String,
        slot_number: Option<u32>,
        section: Option<String>,
    },
    /// A whole section (`section-North`, or a backend-declared capacity section)
    Section { name: String, mode: SectionMode },
}

/// A candidate spot or section with document-space geometry
#[derive(Debug, Clone, PartialEq)]
pub struct RawRegion {
    pub id: String,
    pub source: RegionSource,
    /// Document-space rectangle, ancestor translations already applied
    pub rect: RectDoc,
}

impl RawRegion {
    pub fn kind(&self) -> RegionKind {
        match self.source {
            RegionSource::Section { .. } => RegionKind::Section,
            RegionSource::Spot { .. }
            | RegionSource::SectionSlot { .. }
            | RegionSource::MarkedSlot { .. } => RegionKind::Spot,
        }
    }

    pub fn spot_number(&self) -> Option<u32> {
        match &self.source {
            RegionSource::Spot { number, .. } => *number,
            RegionSource::MarkedSlot { slot_number, .. } => *slot_number,
            RegionSource::SectionSlot { .. } | RegionSource::Section { .. } => None,
        }
    }

    pub fn section_name(&self) -> Option<&str> {
        match &self.source {
            RegionSource::SectionSlot { section, .. } => Some(section),
            RegionSource::MarkedSlot { section, .. } => section.as_deref(),
            RegionSource::Section { name, .. } => Some(name),
            RegionSource::Spot { .. } => None,
        }
    }

    pub fn local_slot_number(&self) -> Option<u32> {
        match &self.source {
            RegionSource::SectionSlot { local_slot, .. } => Some(*local_slot),
            RegionSource::MarkedSlot { slot_number, .. } => *slot_number,
            RegionSource::Spot { .. } | RegionSource::Section { .. } => None,
        }
    }

    pub fn floor(&self) -> Option<&str> {
        match &self.source {
            RegionSource::Spot { floor, .. } | RegionSource::SectionSlot { floor, .. } => {
                floor.as_deref()
            }
            RegionSource::MarkedSlot { .. } | RegionSource::Section { .. } => None,
        }
    }

    /// True for sections tracked only by aggregate counts
    pub fn is_capacity_section(&self) -> bool {
        matches!(
            self.source,
            RegionSource::Section {
                mode: SectionMode::CapacityOnly,
                ..
            }
        )
    }

    /// Short human label (spot number, slot, or section name)
    pub fn label(&self) -> String {
        match &self.source {
            RegionSource::Spot {
                number: Some(n), ..
            } => n.to_string(),
            RegionSource::Spot { number: None, .. } => self.id.clone(),
            RegionSource::SectionSlot {
                section,
                local_slot,
                ..
            } => format!("{section}{local_slot}"),
            RegionSource::MarkedSlot {
                slot_number: Some(n),
                ..
            } => n.to_string(),
            RegionSource::MarkedSlot { slot_id, .. } => slot_id.clone(),
            RegionSource::Section { name, .. } => name.clone(),
        }
    }
}
