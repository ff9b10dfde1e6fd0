//! A scripted in-memory backend shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parkview::BackendError;
use parkview::occupancy::{
    AreaLayout, AreaRef, BillingBreakdown, BookingDetails, BookingStatus, BookingTimestamps,
    CapacitySectionSnapshot, ParkingBackend, SlotRef, SpotStatus, SpotsStatus,
};

#[derive(Default)]
pub struct ScriptedBackend {
    pub layouts: Mutex<HashMap<String, (AreaLayout, Duration)>>,
    pub spots: Mutex<SpotsStatus>,
    pub capacity: Mutex<Vec<CapacitySectionSnapshot>>,
    pub booking_status: Mutex<Option<BookingStatus>>,
    pub booking_spot: Mutex<Option<String>>,
    pub unauthorized: AtomicBool,
    pub offline: AtomicBool,
    pub not_owned: AtomicBool,
    pub layout_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub booking_calls: AtomicUsize,
    pub billing_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(self, area_id: &str, svg: &str) -> Self {
        self.set_layout(area_id, svg, Duration::ZERO);
        self
    }

    pub fn set_layout(&self, area_id: &str, svg: &str, delay: Duration) {
        let layout = AreaLayout {
            has_layout: true,
            layout_svg: Some(svg.to_string()),
            layout_id: Some(format!("layout-{area_id}")),
            sections: Vec::new(),
        };
        self.layouts
            .lock()
            .unwrap()
            .insert(area_id.to_string(), (layout, delay));
    }

    pub fn set_area_layout(&self, area_id: &str, layout: AreaLayout) {
        self.layouts
            .lock()
            .unwrap()
            .insert(area_id.to_string(), (layout, Duration::ZERO));
    }

    pub fn set_spots(&self, spots: &[(&str, &str)]) {
        *self.spots.lock().unwrap() = SpotsStatus {
            spots: spots
                .iter()
                .map(|(id, status)| SpotStatus {
                    id: id.to_string(),
                    spot_number: None,
                    status: status.to_string(),
                    is_owned_by_current_user: false,
                })
                .collect(),
        };
    }

    pub fn set_capacity(&self, capacity: Vec<CapacitySectionSnapshot>) {
        *self.capacity.lock().unwrap() = capacity;
    }

    pub fn set_booking(&self, status: BookingStatus, spot: &str) {
        *self.booking_status.lock().unwrap() = Some(status);
        *self.booking_spot.lock().unwrap() = Some(spot.to_string());
    }

    pub fn set_booking_status(&self, status: BookingStatus) {
        *self.booking_status.lock().unwrap() = Some(status);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn booking_calls(&self) -> usize {
        self.booking_calls.load(Ordering::SeqCst)
    }

    pub fn billing_calls(&self) -> usize {
        self.billing_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(BackendError::Unauthorized);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Network("connection reset".into()));
        }
        Ok(())
    }
}

/// Log to the test writer; `RUST_LOG=parkview=debug cargo test --features tracing`
pub fn trace() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn capacity(name: &str, total: u32, available: u32, active: u32) -> CapacitySectionSnapshot {
    CapacitySectionSnapshot {
        section_name: name.to_string(),
        vehicle_type: Some("car".into()),
        total_capacity: total,
        available_capacity: available,
        parked_count: total - available,
        reserved_count: 0,
        active_reservations: active,
    }
}

#[async_trait]
impl ParkingBackend for ScriptedBackend {
    async fn parking_area_layout(&self, area_id: &str) -> Result<AreaLayout, BackendError> {
        self.layout_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let entry = self.layouts.lock().unwrap().get(area_id).cloned();
        let Some((layout, delay)) = entry else {
            return Ok(AreaLayout::default());
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(layout)
    }

    async fn parking_spots_status(&self, _area_id: &str) -> Result<SpotsStatus, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.spots.lock().unwrap().clone())
    }

    async fn capacity_status(
        &self,
        _area_id: &str,
    ) -> Result<Vec<CapacitySectionSnapshot>, BackendError> {
        self.check()?;
        Ok(self.capacity.lock().unwrap().clone())
    }

    async fn booking_details(
        &self,
        reservation_id: &str,
        include_billing: bool,
    ) -> Result<BookingDetails, BackendError> {
        if include_billing {
            self.billing_calls.fetch_add(1, Ordering::SeqCst);
        } else {
            self.booking_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.check()?;
        if self.not_owned.load(Ordering::SeqCst) {
            return Err(BackendError::NotOwned {
                reservation_id: reservation_id.to_string(),
            });
        }
        let Some(status) = *self.booking_status.lock().unwrap() else {
            return Err(BackendError::NotFound {
                what: format!("reservation {reservation_id}"),
            });
        };
        let spot = self.booking_spot.lock().unwrap().clone();
        Ok(BookingDetails {
            booking_status: status,
            parking_area: AreaRef {
                id: "a1".into(),
                name: Some("Lot A".into()),
            },
            parking_slot: spot.map(|s| SlotRef {
                id: format!("slot-{s}"),
                spot_number: Some(s),
                section: None,
            }),
            timestamps: BookingTimestamps {
                expired_at: Some("2026-03-01T09:15:00Z".into()),
                ..Default::default()
            },
            billing_breakdown: include_billing.then(|| BillingBreakdown {
                currency: Some("EUR".into()),
                billed_minutes: Some(15),
                base_amount: 1.5,
                penalty_amount: 2.0,
                total_amount: 3.5,
            }),
        })
    }
}
