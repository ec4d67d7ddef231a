//! Data structures for claude.ai plan usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized usage for the session (5h) and weekly (7d) windows.
///
/// Built fresh on every successful fetch and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Session window utilization, 0-100
    pub session_percent: f64,
    /// When the session window resets
    pub session_reset_at: Option<DateTime<Utc>>,

    /// Weekly window utilization, 0-100
    pub weekly_percent: f64,
    /// When the weekly window resets
    pub weekly_reset_at: Option<DateTime<Utc>>,
}

impl UsageRecord {
    /// Session utilization as a 0.0-1.0 fraction for progress bars.
    pub fn session_fraction(&self) -> f64 {
        percent_to_fraction(self.session_percent)
    }

    /// Weekly utilization as a 0.0-1.0 fraction for progress bars.
    pub fn weekly_fraction(&self) -> f64 {
        percent_to_fraction(self.weekly_percent)
    }
}

/// Convert a percent to a fraction clamped to [0, 1].
pub fn percent_to_fraction(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.0;
    }
    (percent / 100.0).clamp(0.0, 1.0)
}

// ============================================================================
// claude.ai API Response Types
// ============================================================================

/// One usage window (`five_hour` / `seven_day`) as sent by the backend.
///
/// Both fields are kept loosely typed; the normalizer decides what they mean.
#[derive(Debug, Default, Deserialize)]
pub struct WindowPayload {
    #[serde(default)]
    pub utilization: Option<Value>,
    #[serde(default)]
    pub resets_at: Option<Value>,
}

/// Entry of the `/organizations` list.
#[derive(Debug, Deserialize)]
pub struct OrganizationEntry {
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_clamps_above_and_below() {
        assert_eq!(percent_to_fraction(150.0), 1.0);
        assert_eq!(percent_to_fraction(-10.0), 0.0);
        assert_eq!(percent_to_fraction(42.0), 0.42);
        assert_eq!(percent_to_fraction(f64::NAN), 0.0);
    }

    #[test]
    fn record_fractions_use_their_own_window() {
        let record = UsageRecord {
            session_percent: 25.0,
            weekly_percent: 250.0,
            ..Default::default()
        };
        assert_eq!(record.session_fraction(), 0.25);
        assert_eq!(record.weekly_fraction(), 1.0);
    }

    #[test]
    fn default_record_is_empty() {
        let record = UsageRecord::default();
        assert_eq!(record.session_percent, 0.0);
        assert_eq!(record.weekly_percent, 0.0);
        assert!(record.session_reset_at.is_none());
        assert!(record.weekly_reset_at.is_none());
    }
}
