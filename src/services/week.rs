// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current-week calculation for a fixed-length program.

use chrono::NaiveDate;
use serde::Serialize;

/// Number of weeks in a program.
pub const PROGRAM_WEEKS: u32 = 12;

/// Where "today" falls relative to the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Progress through the program on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekProgress {
    pub start_date: NaiveDate,
    /// 0 before the start, otherwise 1..=12
    pub current_week: u32,
    pub is_completed: bool,
    pub status: ProgramStatus,
    /// Only set before the program starts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_start: Option<u32>,
    pub progress_percent: f64,
    pub weeks_remaining: u32,
}

/// Compute progress for a program starting on `start_date`, as of `today`.
///
/// Day 0 is week 1 and each full 7 days adds a week. The reported week is
/// clamped to [`PROGRAM_WEEKS`]; `is_completed` is set once the unclamped
/// week passes it.
pub fn compute_week(start_date: NaiveDate, today: NaiveDate) -> WeekProgress {
    let days_since_start = (today - start_date).num_days();

    if days_since_start < 0 {
        return WeekProgress {
            start_date,
            current_week: 0,
            is_completed: false,
            status: ProgramStatus::NotStarted,
            days_until_start: Some(u32::try_from(-days_since_start).unwrap_or(u32::MAX)),
            progress_percent: progress_percent(0),
            weeks_remaining: PROGRAM_WEEKS,
        };
    }

    let raw_week = (days_since_start / 7 + 1).max(1);
    let current_week = raw_week.min(i64::from(PROGRAM_WEEKS)) as u32;
    let is_completed = raw_week > i64::from(PROGRAM_WEEKS);

    WeekProgress {
        start_date,
        current_week,
        is_completed,
        status: if is_completed {
            ProgramStatus::Completed
        } else {
            ProgramStatus::InProgress
        },
        days_until_start: None,
        progress_percent: progress_percent(current_week),
        weeks_remaining: PROGRAM_WEEKS.saturating_sub(current_week),
    }
}

/// Share of the program covered by `week`, in percent with one decimal.
fn progress_percent(week: u32) -> f64 {
    let pct = f64::from(week) / f64::from(PROGRAM_WEEKS) * 100.0;
    (pct * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn on_day(offset: i64) -> WeekProgress {
        compute_week(start(), start() + Duration::days(offset))
    }

    #[test]
    fn test_first_day_is_week_one() {
        let p = on_day(0);
        assert_eq!(p.current_week, 1);
        assert!(!p.is_completed);
        assert_eq!(p.status, ProgramStatus::InProgress);
        assert_eq!(p.days_until_start, None);
    }

    #[test]
    fn test_week_boundaries() {
        assert_eq!(on_day(6).current_week, 1);
        assert_eq!(on_day(7).current_week, 2);
        assert_eq!(on_day(13).current_week, 2);
        assert_eq!(on_day(14).current_week, 3);
    }

    #[test]
    fn test_before_start() {
        let p = on_day(-3);
        assert_eq!(p.current_week, 0);
        assert_eq!(p.status, ProgramStatus::NotStarted);
        assert_eq!(p.days_until_start, Some(3));
        assert_eq!(p.progress_percent, 0.0);
        assert_eq!(p.weeks_remaining, 12);

        assert_eq!(on_day(-400).current_week, 0);
    }

    #[test]
    fn test_last_week_not_completed() {
        // Day 83 is the last day of week 12
        let p = on_day(83);
        assert_eq!(p.current_week, 12);
        assert!(!p.is_completed);
        assert_eq!(p.weeks_remaining, 0);
        assert_eq!(p.progress_percent, 100.0);
    }

    #[test]
    fn test_completed_stays_clamped() {
        let p = on_day(84);
        assert_eq!(p.current_week, 12);
        assert!(p.is_completed);

        let p = on_day(90);
        assert_eq!(p.current_week, 12);
        assert!(p.is_completed);
        assert_eq!(p.status, ProgramStatus::Completed);
        assert_eq!(p.progress_percent, 100.0);
        assert_eq!(p.weeks_remaining, 0);
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(on_day(0).progress_percent, 8.3);
        assert_eq!(on_day(7).progress_percent, 16.7);
        assert_eq!(on_day(35).progress_percent, 50.0);
        assert_eq!(on_day(35).weeks_remaining, 6);
    }

    #[test]
    fn test_serializes_status_snake_case() {
        let json = serde_json::to_value(on_day(-1)).unwrap();
        assert_eq!(json["status"], "not_started");
        assert_eq!(json["days_until_start"], 1);

        let json = serde_json::to_value(on_day(1)).unwrap();
        assert!(json.get("days_until_start").is_none());
    }
}
