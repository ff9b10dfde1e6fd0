//! Fallback keys for matching regions against the occupancy table
//!
//! Layout ids and backend ids rarely agree exactly: a layout may say
//! `F2-A-12` where the backend says `A-12` or just `12`. Each strategy
//! derives one candidate key from a region; a [`FallbackChain`] tries them
//! in order.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::region::RawRegion;

/// Derives one lookup key from a region
#[enum_dispatch]
pub trait KeyDerivation {
    /// Candidate key, or `None` when the strategy does not apply
    fn derive(&self, region: &RawRegion) -> Option<String>;
}

/// The region id as written in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExactId;

impl KeyDerivation for ExactId {
    fn derive(&self, region: &RawRegion) -> Option<String> {
        Some(region.id.clone())
    }
}

/// The region id without its floor prefix (`F2-A-12` → `A-12`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StripFloorPrefix;

impl KeyDerivation for StripFloorPrefix {
    fn derive(&self, region: &RawRegion) -> Option<String> {
        let floor = region.floor()?;
        let rest = region.id.get(floor.len()..)?;
        let rest = rest.strip_prefix(['-', '_'])?;
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

/// Slot number within its section (`A-12` → `12`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalSlotNumber;

impl KeyDerivation for LocalSlotNumber {
    fn derive(&self, region: &RawRegion) -> Option<String> {
        region.local_slot_number().map(|n| n.to_string())
    }
}

/// Global spot number (`spot-12` → `12`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpotNumber;

impl KeyDerivation for SpotNumber {
    fn derive(&self, region: &RawRegion) -> Option<String> {
        region.spot_number().map(|n| n.to_string())
    }
}

/// One step of a fallback chain
#[enum_dispatch(KeyDerivation)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StrategyName", into = "StrategyName")]
pub enum KeyStrategy {
    ExactId(ExactId),
    StripFloorPrefix(StripFloorPrefix),
    LocalSlotNumber(LocalSlotNumber),
    SpotNumber(SpotNumber),
}

/// Configuration name of a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StrategyName {
    ExactId,
    StripFloorPrefix,
    LocalSlotNumber,
    SpotNumber,
}

impl From<StrategyName> for KeyStrategy {
    fn from(name: StrategyName) -> Self {
        match name {
            StrategyName::ExactId => ExactId.into(),
            StrategyName::StripFloorPrefix => StripFloorPrefix.into(),
            StrategyName::LocalSlotNumber => LocalSlotNumber.into(),
            StrategyName::SpotNumber => SpotNumber.into(),
        }
    }
}

impl From<KeyStrategy> for StrategyName {
    fn from(strategy: KeyStrategy) -> Self {
        match strategy {
            KeyStrategy::ExactId(_) => StrategyName::ExactId,
            KeyStrategy::StripFloorPrefix(_) => StrategyName::StripFloorPrefix,
            KeyStrategy::LocalSlotNumber(_) => StrategyName::LocalSlotNumber,
            KeyStrategy::SpotNumber(_) => StrategyName::SpotNumber,
        }
    }
}

/// Ordered list of key strategies, configured as a list of names:
/// `["exact_id", "strip_floor_prefix", "local_slot_number", "spot_number"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackChain(Vec<KeyStrategy>);

impl FallbackChain {
    pub fn new(strategies: Vec<KeyStrategy>) -> Self {
        FallbackChain(strategies)
    }

    pub fn strategies(&self) -> &[KeyStrategy] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct candidate keys for a region, in chain order
    pub fn keys(&self, region: &RawRegion) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.0.len());
        for key in self.0.iter().filter_map(|s| s.derive(region)) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl Default for FallbackChain {
    fn default() -> Self {
        FallbackChain(vec![
            ExactId.into(),
            StripFloorPrefix.into(),
            LocalSlotNumber.into(),
            SpotNumber.into(),
        ])
    }
}
