//! Date windows for the dashboard feed and due-date normalization.
//!
//! Due dates are stored as the midnight of a calendar date expressed in UTC terms: the
//! local wall-clock midnight minus the local UTC offset. Window bounds are built the same
//! way, so a stored due date can be compared to `[start, end)` as a plain instant no matter
//! which timezone the server runs in.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Named date-window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    Today,
    Week,
    Month,
}

impl FromStr for Timeline {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "today" => Ok(Timeline::Today),
            "week" => Ok(Timeline::Week),
            "month" => Ok(Timeline::Month),
            _ => Err(AppError::BadRequest("invalid timeline param".into())),
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Timeline::Today => "today",
            Timeline::Week => "week",
            Timeline::Month => "month",
        };
        f.write_str(name)
    }
}

/// Half-open interval `[start, end)` of stored instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Computes the window of `timeline` around `reference`, using the reference's own
    /// timezone to decide which calendar day it falls on.
    pub fn resolve<Tz: TimeZone>(timeline: Timeline, reference: &DateTime<Tz>) -> Self {
        let today = reference.date_naive();

        let (start, end) = match timeline {
            Timeline::Today => (today, today + Duration::days(1)),
            Timeline::Week => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday().into());
                (monday, monday + Duration::days(7))
            }
            Timeline::Month => {
                let first = first_of_month(today.year(), today.month());
                let next = if today.month() == 12 {
                    first_of_month(today.year() + 1, 1)
                } else {
                    first_of_month(today.year(), today.month() + 1)
                };
                (first, next)
            }
        };

        Self {
            start: utc_midnight(start),
            end: utc_midnight(end),
        }
    }

    /// Like [`DateWindow::resolve`], but for a timeline name taken from a request.
    pub fn resolve_named<Tz: TimeZone>(
        timeline: &str,
        reference: &DateTime<Tz>,
    ) -> Result<Self, AppError> {
        Ok(Self::resolve(timeline.parse()?, reference))
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant < self.end
    }

    /// Whether a task with this due date belongs in the window. Unscheduled tasks always do.
    pub fn admits(&self, due_date: Option<&DateTime<Utc>>) -> bool {
        due_date.map_or(true, |due| self.contains(due))
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Truncates an instant to the midnight of its calendar date in its own timezone, shifted to
/// UTC. Applying it to its own output returns the same value.
pub fn normalize_due_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateTime<Utc> {
    utc_midnight(instant.date_naive())
}

/// Offset-less timestamps as sent by `<input type="datetime-local">`.
const LOCAL_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parses a client-supplied due date.
///
/// Accepts a calendar date (`2024-06-01`), an RFC 3339 timestamp, which is first moved to
/// `offset` so that "tonight at 23:00 local" lands on today's date, or an offset-less
/// `2024-06-01T10:00[:00]`, read as wall-clock time in `offset`.
pub fn parse_due_date(raw: &str, offset: &FixedOffset) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(utc_midnight(date));
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(normalize_due_date(&instant.with_timezone(offset)));
    }
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|local| offset.from_local_datetime(&local).single())
        .map(|instant| normalize_due_date(&instant))
        .ok_or_else(|| AppError::BadRequest(format!("{} is a invalid date", raw)))
}

/// Parses a due date and rejects dates before `now`'s calendar day.
pub fn parse_upcoming_due_date(
    raw: &str,
    now: &DateTime<FixedOffset>,
) -> Result<DateTime<Utc>, AppError> {
    let due = parse_due_date(raw, now.offset())?;
    if due < normalize_due_date(now) {
        return Err(AppError::BadRequest(format!(
            "{} is a invalid date",
            due.date_naive()
        )));
    }
    Ok(due)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use pretty_assertions::assert_eq;

    fn offset(hours: i32, minutes: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600 + minutes * 60).unwrap()
    }

    fn at(offset: FixedOffset, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        offset.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_today_spans_one_day_from_local_midnight() {
        // 01:30 in +05:30 is still the previous day in UTC; the window follows the local date.
        let reference = at(offset(5, 30), 2024, 3, 15, 1, 30);
        let window = DateWindow::resolve(Timeline::Today, &reference);

        assert_eq!(window.start, midnight(2024, 3, 15));
        assert_eq!(window.end - window.start, Duration::days(1));
    }

    #[test]
    fn test_today_with_negative_offset() {
        let reference = at(offset(-8, 0), 2024, 3, 15, 22, 0);
        let window = DateWindow::resolve(Timeline::Today, &reference);

        assert_eq!(window.start, midnight(2024, 3, 15));
        assert_eq!(window.end, midnight(2024, 3, 16));
    }

    #[test]
    fn test_week_is_monday_anchored_for_every_weekday() {
        // 2024-03-11 is a Monday.
        for day in 11..=17 {
            let reference = at(offset(2, 0), 2024, 3, day, 12, 0);
            let window = DateWindow::resolve(Timeline::Week, &reference);

            assert_eq!(window.start.weekday(), Weekday::Mon, "day {}", day);
            assert_eq!(window.start, midnight(2024, 3, 11), "day {}", day);
            assert_eq!(window.end, midnight(2024, 3, 18), "day {}", day);
        }
    }

    #[test]
    fn test_week_on_sunday_belongs_to_previous_monday() {
        let sunday = at(offset(0, 0), 2024, 3, 31, 23, 59);
        let window = DateWindow::resolve(Timeline::Week, &sunday);

        assert_eq!(window.start, midnight(2024, 3, 25));
        assert_eq!(window.end, midnight(2024, 4, 1));
    }

    #[test]
    fn test_month_bounds() {
        let reference = at(offset(1, 0), 2024, 2, 29, 8, 0);
        let window = DateWindow::resolve(Timeline::Month, &reference);

        assert_eq!(window.start, midnight(2024, 2, 1));
        assert_eq!(window.end, midnight(2024, 3, 1));
    }

    #[test]
    fn test_month_rolls_over_december() {
        let reference = at(offset(-3, 0), 2023, 12, 31, 23, 0);
        let window = DateWindow::resolve(Timeline::Month, &reference);

        assert_eq!(window.start, midnight(2023, 12, 1));
        assert_eq!(window.end, midnight(2024, 1, 1));
    }

    #[test]
    fn test_unknown_timeline_is_rejected() {
        let reference = Utc::now();
        match DateWindow::resolve_named("bogus", &reference) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "invalid timeline param"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_timeline_names_round_trip_through_display() {
        for timeline in [Timeline::Today, Timeline::Week, Timeline::Month] {
            assert_eq!(timeline.to_string().parse::<Timeline>().unwrap(), timeline);
        }
    }

    #[test]
    fn test_window_is_half_open() {
        let window = DateWindow::resolve(Timeline::Today, &at(offset(0, 0), 2024, 5, 5, 9, 0));

        assert!(window.contains(&window.start));
        assert!(!window.contains(&window.end));
        assert!(window.contains(&(window.end - Duration::seconds(1))));
        assert!(window.admits(None));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            at(offset(5, 30), 2024, 1, 1, 0, 15),
            at(offset(-7, 0), 2024, 6, 30, 23, 45),
            at(offset(0, 0), 2024, 12, 31, 12, 0),
        ];
        for sample in samples {
            let once = normalize_due_date(&sample);
            assert_eq!(normalize_due_date(&once), once);
            assert_eq!(once.date_naive(), sample.date_naive());
        }
    }

    #[test]
    fn test_parse_due_date_formats() {
        let ist = offset(5, 30);

        assert_eq!(parse_due_date("2024-06-01", &ist).unwrap(), midnight(2024, 6, 1));
        // 20:00 UTC on May 31st is already June 1st in +05:30.
        assert_eq!(
            parse_due_date("2024-05-31T20:00:00Z", &ist).unwrap(),
            midnight(2024, 6, 1)
        );
        assert!(matches!(
            parse_due_date("next tuesday", &ist),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_local_datetime_uses_wall_clock_date() {
        let pst = offset(-8, 0);

        assert_eq!(
            parse_due_date("2024-06-01T10:00", &pst).unwrap(),
            midnight(2024, 6, 1)
        );
        // Late evening stays on the written date even though it is past midnight in UTC.
        assert_eq!(
            parse_due_date("2024-06-01T23:30:15", &pst).unwrap(),
            midnight(2024, 6, 1)
        );
        assert!(parse_due_date("2024-06-01T25:00", &pst).is_err());
    }

    #[test]
    fn test_past_due_dates_are_rejected() {
        let now = at(offset(0, 0), 2024, 6, 10, 15, 0);

        assert!(parse_upcoming_due_date("2024-06-10", &now).is_ok());
        assert!(parse_upcoming_due_date("2024-06-11", &now).is_ok());
        assert!(matches!(
            parse_upcoming_due_date("2024-06-09", &now),
            Err(AppError::BadRequest(_))
        ));
    }
}
