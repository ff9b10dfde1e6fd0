//! Engine configuration
//!
//! Every knob has a default in [`crate::defaults`]; a JSON document may
//! override any subset of them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::errors::ConfigError;
use crate::geometry::ViewBox;
use crate::occupancy::FallbackChain;

/// Settings for the markup parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// `[min_x, min_y, width, height]` used when the document declares none
    pub default_view_box: [f64; 4],
    pub min_region_size: f64,
    pub max_region_size: f64,
    pub max_slot_number: u32,
    pub max_group_depth: usize,
    pub grid_cell_size: f64,
    pub grid_match_tolerance: f64,
    pub estimated_width_ratio: f64,
    pub estimated_height_ratio: f64,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            default_view_box: defaults::VIEW_BOX,
            min_region_size: defaults::MIN_REGION_SIZE,
            max_region_size: defaults::MAX_REGION_SIZE,
            max_slot_number: defaults::MAX_SLOT_NUMBER,
            max_group_depth: defaults::MAX_GROUP_DEPTH,
            grid_cell_size: defaults::GRID_CELL_SIZE,
            grid_match_tolerance: defaults::GRID_MATCH_TOLERANCE,
            estimated_width_ratio: defaults::ESTIMATED_WIDTH_RATIO,
            estimated_height_ratio: defaults::ESTIMATED_HEIGHT_RATIO,
        }
    }
}

impl ParseConfig {
    pub fn default_view_box(&self) -> ViewBox {
        ViewBox::from_array(self.default_view_box)
    }

    /// True when both sides fall in the plausible spot range
    pub fn plausible_size(&self, width: f64, height: f64) -> bool {
        let range = self.min_region_size..=self.max_region_size;
        width > 0.0 && height > 0.0 && range.contains(&width) && range.contains(&height)
    }
}

/// Settings for the occupancy synchronizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
    #[serde(rename = "push_debounce_ms", with = "millis")]
    pub push_debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: defaults::POLL_INTERVAL,
            push_debounce: defaults::PUSH_DEBOUNCE,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub parse: ParseConfig,
    pub sync: SyncConfig,
    /// Order in which fallback keys are tried against the occupancy table
    pub fallback: FallbackChain,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.parse;
        if !(p.min_region_size > 0.0 && p.min_region_size.is_finite()) {
            return Err(invalid("parse.min_region_size", "must be positive"));
        }
        if !(p.max_region_size >= p.min_region_size && p.max_region_size.is_finite()) {
            return Err(invalid(
                "parse.max_region_size",
                "must be at least min_region_size",
            ));
        }
        if p.max_group_depth == 0 {
            return Err(invalid("parse.max_group_depth", "must be at least 1"));
        }
        if p.max_slot_number == 0 {
            return Err(invalid("parse.max_slot_number", "must be at least 1"));
        }
        if !(p.grid_cell_size > 0.0) {
            return Err(invalid("parse.grid_cell_size", "must be positive"));
        }
        if ViewBox::from_array(p.default_view_box).aspect().is_none() {
            return Err(invalid("parse.default_view_box", "width and height must be positive"));
        }
        if self.sync.poll_interval.is_zero() {
            return Err(invalid("sync.poll_interval_ms", "must be non-zero"));
        }
        if self.fallback.is_empty() {
            return Err(invalid("fallback", "needs at least one strategy"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
