//! Alert tiers — a pure mapping from measured distance to urgency.
//!
//! Thresholds are strict upper bounds checked in ascending order; the first
//! bound the distance is below wins.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Distance assumed when no reading has been received yet.
pub const OUT_OF_RANGE_MILLIMETERS: u16 = 10_000;

const CRITICAL_BELOW: u16 = 400;
const HIGH_BELOW: u16 = 800;
const MEDIUM_BELOW: u16 = 1200;
const LOW_BELOW: u16 = 1600;

/// Discrete alert level derived from a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTier {
    Critical,
    High,
    Medium,
    Low,
    None,
}

impl fmt::Display for AlertTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => f.write_str("critical"),
            Self::High => f.write_str("high"),
            Self::Medium => f.write_str("medium"),
            Self::Low => f.write_str("low"),
            Self::None => f.write_str("none"),
        }
    }
}

/// Classify a distance in millimetres.
#[must_use]
pub fn classify(distance_millimeters: u16) -> AlertTier {
    match distance_millimeters {
        d if d < CRITICAL_BELOW => AlertTier::Critical,
        d if d < HIGH_BELOW => AlertTier::High,
        d if d < MEDIUM_BELOW => AlertTier::Medium,
        d if d < LOW_BELOW => AlertTier::Low,
        _ => AlertTier::None,
    }
}
