//! Session key derivation.
//!
//! A session key names one training occurrence of a plan: `W{week}D{day}`
//! by default, or a `YYYY-MM-DD` date when the plan's params set
//! `sessionKeyMode` to `DATE`. Resolving which date a week/day falls on is
//! the caller's job; this module only formats what it is given.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

/// How a plan names its sessions, read from `params.sessionKeyMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionKeyMode {
    #[default]
    WeekDay,
    Date,
}

impl SessionKeyMode {
    /// Read the mode from a plan's params. Anything other than `DATE`
    /// (case-insensitive) means week/day keys.
    pub fn from_params(params: &Value) -> Self {
        match params.get("sessionKeyMode").and_then(Value::as_str) {
            Some(mode) if mode.eq_ignore_ascii_case("date") => Self::Date,
            _ => Self::WeekDay,
        }
    }
}

/// `W{week}D{day}`.
pub fn week_day_key(week: i32, day: i32) -> String {
    format!("W{week}D{day}")
}

/// Pick the session key for a request.
///
/// In `Date` mode the supplied date wins. Without one the week/day key is
/// used so the session still has a stable name.
pub fn derive_session_key(
    mode: SessionKeyMode,
    week: i32,
    day: i32,
    date: Option<NaiveDate>,
) -> String {
    match (mode, date) {
        (SessionKeyMode::Date, Some(date)) => date.format("%Y-%m-%d").to_string(),
        (SessionKeyMode::Date, None) => {
            warn!(week, day, "date session keys requested but no date given; using week/day key");
            week_day_key(week, day)
        }
        (SessionKeyMode::WeekDay, _) => week_day_key(week, day),
    }
}

/// Sort key that puts session keys in calendar order.
///
/// Week/day keys compare numerically (`W2D1` before `W10D1`) and come
/// before date keys, which compare by date. Anything else sorts last as
/// plain text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionKeyOrder {
    WeekDay(i32, i32),
    Date(NaiveDate),
    Other(String),
}

impl SessionKeyOrder {
    pub fn of(key: &str) -> Self {
        if let Some((week, day)) = parse_week_day(key) {
            return Self::WeekDay(week, day);
        }
        match NaiveDate::parse_from_str(key, "%Y-%m-%d") {
            Ok(date) => Self::Date(date),
            Err(_) => Self::Other(key.to_owned()),
        }
    }
}

fn parse_week_day(key: &str) -> Option<(i32, i32)> {
    let (week, day) = key.strip_prefix('W')?.split_once('D')?;
    Some((week.parse().ok()?, day.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn week_day_format() {
        assert_eq!(week_day_key(3, 2), "W3D2");
        assert_eq!(week_day_key(12, 7), "W12D7");
    }

    #[test]
    fn mode_defaults_to_week_day() {
        assert_eq!(SessionKeyMode::from_params(&json!({})), SessionKeyMode::WeekDay);
        assert_eq!(
            SessionKeyMode::from_params(&json!({"sessionKeyMode": "WEEK_DAY"})),
            SessionKeyMode::WeekDay
        );
        assert_eq!(
            SessionKeyMode::from_params(&json!({"sessionKeyMode": 7})),
            SessionKeyMode::WeekDay
        );
    }

    #[test]
    fn date_mode_uses_iso_date() {
        let mode = SessionKeyMode::from_params(&json!({"sessionKeyMode": "DATE"}));
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(derive_session_key(mode, 1, 1, Some(date)), "2026-03-09");
    }

    #[test]
    fn date_mode_without_date_falls_back() {
        assert_eq!(derive_session_key(SessionKeyMode::Date, 2, 4, None), "W2D4");
    }

    #[test]
    fn key_order_is_numeric_for_week_day_keys() {
        let mut keys = vec!["W10D1", "custom", "2026-01-05", "W2D3", "W2D10", "2025-12-29", "W1D1"];
        keys.sort_by_key(|k| SessionKeyOrder::of(k));
        assert_eq!(
            keys,
            ["W1D1", "W2D3", "W2D10", "W10D1", "2025-12-29", "2026-01-05", "custom"]
        );
    }

    #[test]
    fn week_day_mode_ignores_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            derive_session_key(SessionKeyMode::WeekDay, 2, 4, Some(date)),
            "W2D4"
        );
    }
}
