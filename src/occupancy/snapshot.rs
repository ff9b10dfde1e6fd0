//! The occupancy table: live status, replaced as a whole

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::backend::{BookingStatus, SpotsStatus};
use super::keys::FallbackChain;
use crate::region::RawRegion;

/// Live status of a single spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    Available,
    Occupied,
    Reserved,
    Unavailable,
    Unknown,
}

impl OccupancyStatus {
    /// Interpret a backend status string; unrecognized values are `Unknown`
    pub fn from_wire(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "available" | "free" | "vacant" => OccupancyStatus::Available,
            "occupied" | "parked" => OccupancyStatus::Occupied,
            "reserved" | "held" => OccupancyStatus::Reserved,
            "unavailable" | "maintenance" | "disabled" | "blocked" => OccupancyStatus::Unavailable,
            _ => OccupancyStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyRecord {
    /// Backend id of the spot
    pub region_id: String,
    pub status: OccupancyStatus,
    pub is_owned_by_current_user: bool,
}

/// Aggregate counts of a capacity-only section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySectionSnapshot {
    pub section_name: String,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    pub total_capacity: u32,
    pub available_capacity: u32,
    #[serde(default)]
    pub parked_count: u32,
    #[serde(default)]
    pub reserved_count: u32,
    #[serde(default)]
    pub active_reservations: u32,
}

impl CapacitySectionSnapshot {
    /// Percentage of capacity in use; `None` for a section with no capacity
    pub fn utilization(&self) -> Option<f64> {
        if self.total_capacity == 0 {
            return None;
        }
        let total = f64::from(self.total_capacity);
        let available = f64::from(self.available_capacity.min(self.total_capacity));
        Some((total - available) * 100.0 / total)
    }
}

/// The current user's reservation, as last reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveReservation {
    pub reservation_id: String,
    pub area_id: String,
    pub spot: Option<String>,
    pub section: Option<String>,
    pub status: BookingStatus,
}

/// One consistent view of everything the classifier needs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    /// Records by backend id and by spot number
    pub spots: BTreeMap<String, OccupancyRecord>,
    /// Capacity sections by lowercase section name
    pub capacity: BTreeMap<String, CapacitySectionSnapshot>,
    pub reservation: Option<ActiveReservation>,
}

impl OccupancySnapshot {
    /// Build a snapshot from one round of backend responses
    pub fn from_parts(
        spots: SpotsStatus,
        capacity: Vec<CapacitySectionSnapshot>,
        reservation: Option<ActiveReservation>,
    ) -> Self {
        let mut table = BTreeMap::new();
        for spot in spots.spots {
            let record = OccupancyRecord {
                region_id: spot.id.clone(),
                status: OccupancyStatus::from_wire(&spot.status),
                is_owned_by_current_user: spot.is_owned_by_current_user,
            };
            if let Some(number) = spot.spot_number.filter(|n| *n != spot.id) {
                table.entry(number).or_insert_with(|| record.clone());
            }
            table.entry(spot.id).or_insert(record);
        }

        let capacity = capacity
            .into_iter()
            .map(|c| (c.section_name.trim().to_lowercase(), c))
            .collect();

        OccupancySnapshot {
            spots: table,
            capacity,
            reservation,
        }
    }

    /// First record found under any key of the chain
    pub fn lookup(&self, region: &RawRegion, chain: &FallbackChain) -> Option<&OccupancyRecord> {
        chain
            .keys(region)
            .iter()
            .find_map(|key| self.spots.get(key))
    }

    pub fn capacity_for(&self, region: &RawRegion) -> Option<&CapacitySectionSnapshot> {
        let name = region.section_name()?;
        self.capacity.get(&name.trim().to_lowercase())
    }

    /// True when the region belongs to the current user's reservation
    pub fn is_owned(&self, region: &RawRegion, chain: &FallbackChain) -> bool {
        if self
            .lookup(region, chain)
            .is_some_and(|r| r.is_owned_by_current_user)
        {
            return true;
        }
        let Some(reservation) = self.reservation.as_ref().filter(|r| r.status.is_live()) else {
            return false;
        };
        if region.is_capacity_section() {
            return match (&reservation.section, region.section_name()) {
                (Some(held), Some(name)) => held.eq_ignore_ascii_case(name),
                _ => false,
            };
        }
        // a bare slot number is only unique within its section
        if let (Some(held), Some(name)) = (&reservation.section, region.section_name()) {
            if !held.trim().eq_ignore_ascii_case(name.trim()) {
                return false;
            }
        }
        reservation
            .spot
            .as_ref()
            .is_some_and(|spot| chain.keys(region).iter().any(|k| k == spot))
    }
}

/// A published snapshot; `generation` counts replacements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccupancyTable {
    pub generation: u64,
    pub snapshot: OccupancySnapshot,
}

impl OccupancyTable {
    /// The successor table, or `None` when nothing changed
    pub(crate) fn replaced_by(&self, snapshot: OccupancySnapshot) -> Option<OccupancyTable> {
        (snapshot != self.snapshot).then(|| OccupancyTable {
            generation: self.generation + 1,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::backend::SpotStatus;
    use crate::region::{RegionSource, SectionMode};
    use crate::types::{Doc, Rect};

    fn region(id: &str, source: RegionSource) -> RawRegion {
        RawRegion {
            id: id.into(),
            source,
            rect: Rect::new(Doc(0.0), Doc(0.0), Doc(10.0), Doc(20.0)),
        }
    }

    fn spot(id: &str, number: Option<&str>, status: &str, owned: bool) -> SpotStatus {
        SpotStatus {
            id: id.into(),
            spot_number: number.map(str::to_string),
            status: status.into(),
            is_owned_by_current_user: owned,
        }
    }

    fn snapshot() -> OccupancySnapshot {
        OccupancySnapshot::from_parts(
            SpotsStatus {
                spots: vec![
                    spot("s-1", Some("A-12"), "occupied", false),
                    spot("s-2", Some("7"), "Available", false),
                    spot("s-3", Some("8"), "parked", true),
                ],
            },
            vec![CapacitySectionSnapshot {
                section_name: "North ".into(),
                vehicle_type: Some("car".into()),
                total_capacity: 20,
                available_capacity: 1,
                parked_count: 19,
                reserved_count: 0,
                active_reservations: 0,
            }],
            None,
        )
    }

    #[test]
    fn status_strings() {
        assert_eq!(OccupancyStatus::from_wire("FREE"), OccupancyStatus::Available);
        assert_eq!(OccupancyStatus::from_wire("held"), OccupancyStatus::Reserved);
        assert_eq!(OccupancyStatus::from_wire("maintenance"), OccupancyStatus::Unavailable);
        assert_eq!(OccupancyStatus::from_wire("??"), OccupancyStatus::Unknown);
    }

    #[test]
    fn lookup_walks_the_chain() {
        let snap = snapshot();
        let chain = FallbackChain::default();
        let floor_slot = region(
            "F2-A-12",
            RegionSource::SectionSlot {
                section: "A".into(),
                local_slot: 12,
                floor: Some("F2".into()),
            },
        );
        assert_eq!(snap.lookup(&floor_slot, &chain).unwrap().region_id, "s-1");

        let numbered = region(
            "spot-7",
            RegionSource::Spot {
                number: Some(7),
                floor: None,
            },
        );
        assert_eq!(
            snap.lookup(&numbered, &chain).unwrap().status,
            OccupancyStatus::Available
        );

        let unknown = region(
            "spot-99",
            RegionSource::Spot {
                number: Some(99),
                floor: None,
            },
        );
        assert!(snap.lookup(&unknown, &chain).is_none());
    }

    #[test]
    fn capacity_is_matched_by_name() {
        let snap = snapshot();
        let north = region(
            "section-North",
            RegionSource::Section {
                name: "north".into(),
                mode: SectionMode::CapacityOnly,
            },
        );
        let cap = snap.capacity_for(&north).unwrap();
        assert_eq!(cap.utilization(), Some(95.0));
    }

    #[test]
    fn ownership_from_record_or_reservation() {
        let chain = FallbackChain::default();
        let mut snap = snapshot();
        let eight = region(
            "8",
            RegionSource::Spot {
                number: Some(8),
                floor: None,
            },
        );
        assert!(snap.is_owned(&eight, &chain));

        let seven = region(
            "P7",
            RegionSource::Spot {
                number: Some(7),
                floor: None,
            },
        );
        assert!(!snap.is_owned(&seven, &chain));
        snap.reservation = Some(ActiveReservation {
            reservation_id: "r1".into(),
            area_id: "a1".into(),
            spot: Some("7".into()),
            section: None,
            status: BookingStatus::Active,
        });
        assert!(snap.is_owned(&seven, &chain));
    }

    #[test]
    fn held_slot_number_does_not_leak_into_other_sections() {
        let chain = FallbackChain::default();
        let slot = |id: &str, section: &str| {
            region(
                id,
                RegionSource::SectionSlot {
                    section: section.into(),
                    local_slot: 7,
                    floor: None,
                },
            )
        };
        let mut snap = OccupancySnapshot::default();
        snap.reservation = Some(ActiveReservation {
            reservation_id: "r1".into(),
            area_id: "a1".into(),
            spot: Some("7".into()),
            section: Some("a".into()),
            status: BookingStatus::Active,
        });
        assert!(snap.is_owned(&slot("A-7", "A"), &chain));
        assert!(!snap.is_owned(&slot("B-7", "B"), &chain));

        // no section on the reservation: the key chain alone decides
        if let Some(r) = snap.reservation.as_mut() {
            r.section = None;
        }
        assert!(snap.is_owned(&slot("B-7", "B"), &chain));
    }

    #[test]
    fn identical_snapshot_keeps_the_table() {
        let table = OccupancyTable::default();
        let next = table.replaced_by(snapshot()).unwrap();
        assert_eq!(next.generation, 1);
        assert!(next.replaced_by(snapshot()).is_none());
    }

    #[test]
    fn zero_capacity_has_no_utilization() {
        let cap = CapacitySectionSnapshot {
            section_name: "Empty".into(),
            vehicle_type: None,
            total_capacity: 0,
            available_capacity: 0,
            parked_count: 0,
            reserved_count: 0,
            active_reservations: 0,
        };
        assert_eq!(cap.utilization(), None);
    }
}
