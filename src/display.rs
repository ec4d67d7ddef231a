//! Presentation model for the status indicator and the detail dropdown.
//!
//! Keeps the last successful record on screen when a later fetch fails, so a
//! transient error shows up as a message next to slightly stale numbers
//! instead of blanking the display.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::usage::{UsageError, UsageRecord};

const PROGRESS_BAR_WIDTH: usize = 20;

/// Colour band of a usage bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageLevel {
    Low,
    Elevated,
    Critical,
}

impl UsageLevel {
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction < 0.50 {
            UsageLevel::Low
        } else if fraction < 0.75 {
            UsageLevel::Elevated
        } else {
            UsageLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageLevel::Low => "low",
            UsageLevel::Elevated => "elevated",
            UsageLevel::Critical => "critical",
        }
    }
}

/// Human-readable time until `reset`.
pub fn format_remaining(reset: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (reset - now).num_seconds();
    if secs <= 0 {
        return "now".to_string();
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;

    if hours > 24 {
        reset.format("%a %H:%M").to_string()
    } else if hours > 0 {
        format!("in {}h {}m", hours, minutes)
    } else {
        format!("in {}m", minutes)
    }
}

/// Text progress bar, e.g. `[#####---------------]`.
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// What the status item and dropdown currently show.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    /// Last successfully fetched record
    pub usage: Option<UsageRecord>,
    /// When `usage` was fetched
    pub last_updated: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared by the next success
    pub error_message: Option<String>,
    /// Whether a session key is configured at all
    pub credential_configured: bool,
}

impl DisplayState {
    pub fn new(credential_configured: bool) -> Self {
        Self {
            credential_configured,
            ..Self::default()
        }
    }

    /// Fold one fetch outcome into the state.
    pub fn apply(&mut self, outcome: &Result<UsageRecord, UsageError>, now: DateTime<Utc>) {
        match outcome {
            Ok(record) => {
                self.usage = Some(record.clone());
                self.last_updated = Some(now);
                self.error_message = None;
            }
            Err(e) => {
                if matches!(e, UsageError::MissingCredential) {
                    self.credential_configured = false;
                }
                self.error_message = Some(e.to_string());
            }
        }
    }

    /// Compact status-bar text.
    pub fn indicator_text(&self) -> String {
        if !self.credential_configured {
            return "CC?".to_string();
        }
        match &self.usage {
            None => "CC".to_string(),
            Some(usage) => format!(
                "S {}% W {}%",
                whole_percent(usage.session_percent),
                whole_percent(usage.weekly_percent)
            ),
        }
    }

    /// Dropdown body, one entry per line.
    pub fn detail_lines(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut lines = vec!["Claude usage limits".to_string()];

        if let Some(message) = &self.error_message {
            lines.push(format!("! {}", message));
        }

        let usage = self.usage.clone().unwrap_or_default();
        push_window(
            &mut lines,
            "Current session",
            usage.session_percent,
            usage.session_fraction(),
            usage.session_reset_at,
            now,
        );
        push_window(
            &mut lines,
            "Weekly (all models)",
            usage.weekly_percent,
            usage.weekly_fraction(),
            usage.weekly_reset_at,
            now,
        );

        match self.last_updated {
            Some(updated) => lines.push(format!("Updated: {}", updated.format("%H:%M:%S"))),
            None => lines.push("Not updated yet".to_string()),
        }
        lines
    }
}

/// Percent as shown to the user: clamped to 0..=100 like the fractions, then
/// truncated.
fn whole_percent(percent: f64) -> i64 {
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0).trunc() as i64
}

fn push_window(
    lines: &mut Vec<String>,
    title: &str,
    percent: f64,
    fraction: f64,
    reset: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) {
    lines.push(format!(
        "{}: {}% used ({})",
        title,
        whole_percent(percent),
        UsageLevel::from_fraction(fraction).as_str()
    ));
    lines.push(format!("  {}", progress_bar(fraction, PROGRESS_BAR_WIDTH)));
    if let Some(reset) = reset {
        lines.push(format!("  Resets {}", format_remaining(reset, now)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        // A Monday
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn record(session: f64, weekly: f64) -> UsageRecord {
        UsageRecord {
            session_percent: session,
            weekly_percent: weekly,
            ..Default::default()
        }
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(UsageLevel::from_fraction(0.0), UsageLevel::Low);
        assert_eq!(UsageLevel::from_fraction(0.49), UsageLevel::Low);
        assert_eq!(UsageLevel::from_fraction(0.50), UsageLevel::Elevated);
        assert_eq!(UsageLevel::from_fraction(0.74), UsageLevel::Elevated);
        assert_eq!(UsageLevel::from_fraction(0.75), UsageLevel::Critical);
        assert_eq!(UsageLevel::from_fraction(1.0), UsageLevel::Critical);
    }

    #[test]
    fn remaining_in_the_past_is_now() {
        assert_eq!(format_remaining(now() - Duration::minutes(5), now()), "now");
        assert_eq!(format_remaining(now(), now()), "now");
    }

    #[test]
    fn remaining_minutes_and_hours() {
        assert_eq!(format_remaining(now() + Duration::minutes(42), now()), "in 42m");
        assert_eq!(
            format_remaining(now() + Duration::minutes(2 * 60 + 13), now()),
            "in 2h 13m"
        );
        assert_eq!(format_remaining(now() + Duration::hours(24), now()), "in 24h 0m");
    }

    #[test]
    fn remaining_beyond_a_day_shows_weekday() {
        let reset = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        assert_eq!(format_remaining(reset, now()), "Mon 00:00");
    }

    #[test]
    fn progress_bar_clamps() {
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(1.5, 4), "[####]");
        assert_eq!(progress_bar(-1.0, 4), "[----]");
    }

    #[test]
    fn indicator_states() {
        let mut state = DisplayState::new(false);
        assert_eq!(state.indicator_text(), "CC?");

        state.credential_configured = true;
        assert_eq!(state.indicator_text(), "CC");

        state.apply(&Ok(record(42.7, 80.0)), now());
        assert_eq!(state.indicator_text(), "S 42% W 80%");
    }

    #[test]
    fn out_of_range_percents_are_clamped_for_display() {
        let mut state = DisplayState::new(true);
        state.apply(&Ok(record(150.0, -10.0)), now());
        assert_eq!(state.indicator_text(), "S 100% W 0%");

        let lines = state.detail_lines(now());
        assert!(lines.contains(&"Current session: 100% used (critical)".to_string()));
        assert!(lines.contains(&"Weekly (all models): 0% used (low)".to_string()));
    }

    #[test]
    fn failure_keeps_last_record() {
        let mut state = DisplayState::new(true);
        state.apply(&Ok(record(10.0, 20.0)), now());
        state.apply(&Err(UsageError::RateLimited), now() + Duration::minutes(5));

        assert_eq!(state.usage, Some(record(10.0, 20.0)));
        assert_eq!(state.last_updated, Some(now()));
        assert_eq!(
            state.error_message.as_deref(),
            Some("Too many requests - please wait")
        );
    }

    #[test]
    fn success_clears_error() {
        let mut state = DisplayState::new(true);
        state.apply(&Err(UsageError::HttpError(500)), now());
        state.apply(&Ok(record(1.0, 2.0)), now());
        assert!(state.error_message.is_none());
    }

    #[test]
    fn missing_credential_flips_indicator() {
        let mut state = DisplayState::new(true);
        state.apply(&Err(UsageError::MissingCredential), now());
        assert_eq!(state.indicator_text(), "CC?");
    }

    #[test]
    fn detail_lines_show_error_and_resets() {
        let mut state = DisplayState::new(true);
        let mut usage = record(55.0, 80.0);
        usage.session_reset_at = Some(now() + Duration::minutes(90));
        state.apply(&Ok(usage), now());
        state.apply(&Err(UsageError::SessionExpired), now());

        let lines = state.detail_lines(now());
        assert_eq!(lines[0], "Claude usage limits");
        assert!(lines[1].starts_with("! Session expired"));
        assert!(lines.contains(&"Current session: 55% used (elevated)".to_string()));
        assert!(lines.contains(&"  Resets in 1h 30m".to_string()));
        assert!(lines.contains(&"Weekly (all models): 80% used (critical)".to_string()));
        assert_eq!(lines.last().unwrap(), "Updated: 12:00:00");
    }
}
