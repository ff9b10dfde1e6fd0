//! Scenario files and the scripted backend that plays them

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use async_trait::async_trait;
use parkview::occupancy::{
    AreaLayout, AreaRef, BillingBreakdown, BookingDetails, BookingStatus, BookingTimestamps,
    CapacitySectionSnapshot, ParkingBackend, PushEvent, SlotRef, SpotStatus, SpotsStatus,
};
use parkview::{BackendError, EngineConfig, SectionDescriptor};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub area: String,
    /// Layout document, relative to the scenario file
    pub layout: String,
    #[serde(default)]
    pub sections: Vec<SectionDescriptor>,
    #[serde(default)]
    pub reservation: Option<String>,
    #[serde(default)]
    pub config: EngineConfig,
    pub steps: Vec<Step>,
    /// How long to keep watching after the last step
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,
}

fn default_tail_ms() -> u64 {
    6_000
}

/// Backend state changes applied at `at_ms`, plus an optional push event
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub at_ms: u64,
    #[serde(default)]
    pub spots: Option<Vec<SpotStatus>>,
    #[serde(default)]
    pub capacity: Option<Vec<CapacitySectionSnapshot>>,
    #[serde(default)]
    pub booking: Option<BookingScript>,
    #[serde(default)]
    pub unauthorized: Option<bool>,
    #[serde(default)]
    pub push: Option<PushScript>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookingScript {
    pub status: BookingStatus,
    #[serde(default)]
    pub spot: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub billing: Option<BillingBreakdown>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushScript {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl PushScript {
    pub fn decode(&self) -> Option<PushEvent> {
        PushEvent::from_wire(&self.event, &self.payload)
    }
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<(Scenario, String)> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&json)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        scenario.config.validate()?;
        if !scenario.steps.windows(2).all(|w| w[0].at_ms <= w[1].at_ms) {
            bail!("scenario steps must be ordered by at_ms");
        }

        let layout_path = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&scenario.layout);
        let svg = std::fs::read_to_string(&layout_path)
            .with_context(|| format!("reading layout {}", layout_path.display()))?;
        Ok((scenario, svg))
    }
}

/// In-memory backend whose answers change as steps are applied
pub struct ScriptedBackend {
    area: String,
    layout: AreaLayout,
    spots: Mutex<Vec<SpotStatus>>,
    capacity: Mutex<Vec<CapacitySectionSnapshot>>,
    booking: Mutex<Option<BookingScript>>,
    unauthorized: AtomicBool,
}

impl ScriptedBackend {
    pub fn new(scenario: &Scenario, svg: String) -> Arc<Self> {
        Arc::new(ScriptedBackend {
            area: scenario.area.clone(),
            layout: AreaLayout {
                has_layout: true,
                layout_svg: Some(svg),
                layout_id: Some(format!("{}-replay", scenario.area)),
                sections: scenario.sections.clone(),
            },
            spots: Mutex::new(Vec::new()),
            capacity: Mutex::new(Vec::new()),
            booking: Mutex::new(None),
            unauthorized: AtomicBool::new(false),
        })
    }

    pub fn apply(&self, step: &Step) {
        if let Some(spots) = &step.spots {
            *lock(&self.spots) = spots.clone();
        }
        if let Some(capacity) = &step.capacity {
            *lock(&self.capacity) = capacity.clone();
        }
        if let Some(booking) = &step.booking {
            let mut current = lock(&self.booking);
            // a bare status change keeps the spot it was booked on
            let spot = booking
                .spot
                .clone()
                .or_else(|| current.as_ref().and_then(|b| b.spot.clone()));
            *current = Some(BookingScript {
                spot,
                ..booking.clone()
            });
        }
        if let Some(unauthorized) = step.unauthorized {
            self.unauthorized.store(unauthorized, Ordering::SeqCst);
        }
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(BackendError::Unauthorized);
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl ParkingBackend for ScriptedBackend {
    async fn parking_area_layout(&self, area_id: &str) -> Result<AreaLayout, BackendError> {
        self.check()?;
        if area_id != self.area {
            return Ok(AreaLayout::default());
        }
        Ok(self.layout.clone())
    }

    async fn parking_spots_status(&self, _area_id: &str) -> Result<SpotsStatus, BackendError> {
        self.check()?;
        Ok(SpotsStatus {
            spots: lock(&self.spots).clone(),
        })
    }

    async fn capacity_status(
        &self,
        _area_id: &str,
    ) -> Result<Vec<CapacitySectionSnapshot>, BackendError> {
        self.check()?;
        Ok(lock(&self.capacity).clone())
    }

    async fn booking_details(
        &self,
        reservation_id: &str,
        include_billing: bool,
    ) -> Result<BookingDetails, BackendError> {
        self.check()?;
        let Some(booking) = lock(&self.booking).clone() else {
            return Err(BackendError::NotFound {
                what: format!("reservation {reservation_id}"),
            });
        };
        Ok(BookingDetails {
            booking_status: booking.status,
            parking_area: AreaRef {
                id: self.area.clone(),
                name: None,
            },
            parking_slot: booking.spot.map(|spot| SlotRef {
                id: spot.clone(),
                spot_number: Some(spot),
                section: booking.section.clone(),
            }),
            timestamps: BookingTimestamps::default(),
            billing_breakdown: if include_billing { booking.billing } else { None },
        })
    }
}
