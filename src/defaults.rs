//! Default settings (document units unless noted otherwise)

use std::time::Duration;

/// Window used when the document declares neither `viewBox` nor `width`/`height`
pub const VIEW_BOX: [f64; 4] = [0.0, 0.0, 1000.0, 1000.0];

/// Plausible parking-spot size range; anything outside is a false positive
pub const MIN_REGION_SIZE: f64 = 2.0;
pub const MAX_REGION_SIZE: f64 = 1000.0;

/// Bare numeric ids are only accepted in `1..=MAX_SLOT_NUMBER`
pub const MAX_SLOT_NUMBER: u32 = 999;

/// Hard cap on nested group traversal
pub const MAX_GROUP_DEPTH: usize = 16;

/// Estimated size of a group with no measurable content, as a fraction of the viewBox
pub const ESTIMATED_WIDTH_RATIO: f64 = 0.03;
pub const ESTIMATED_HEIGHT_RATIO: f64 = 0.05;

/// Size of one backend grid cell in document units (capacity section placement)
pub const GRID_CELL_SIZE: f64 = 20.0;

/// Tolerance when matching a group translation against a grid offset
pub const GRID_MATCH_TOLERANCE: f64 = 0.5;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const PUSH_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Utilization thresholds (percent) for capacity sections
pub const CRITICAL_UTILIZATION: f64 = 95.0;
pub const HIGH_UTILIZATION: f64 = 50.0;
pub const LOW_UTILIZATION: f64 = 5.0;
