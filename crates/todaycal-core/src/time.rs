//! Time types for the daily report.
//!
//! This module provides [`EventStart`] for the start marker of a calendar
//! event (either an all-day date or a specific timestamp), and [`DayWindow`]
//! for the half-open local day the report covers.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The start marker of a calendar event.
///
/// Serialized in the calendar provider's shape, so a snapshot written to disk
/// looks like the API payload it came from:
/// `{"date": "2025-02-05"}` or `{"dateTime": "2025-02-05T09:00:00+01:00"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StartRepr", into = "StartRepr")]
pub enum EventStart {
    /// An all-day event date (no specific time).
    Date(NaiveDate),
    /// A specific timestamp, keeping the offset the provider reported.
    DateTime(DateTime<FixedOffset>),
}

impl EventStart {
    /// Creates an `EventStart::DateTime` from a datetime in any timezone.
    pub fn from_datetime<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }

    /// Creates an `EventStart::Date` for an all-day event.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Returns `true` if this is an all-day start.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the instant used for ordering.
    ///
    /// All-day starts sort at midnight UTC of their date.
    pub fn sort_key(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Utc),
            Self::Date(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

impl PartialOrd for EventStart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventStart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<FixedOffset>>,
}

impl TryFrom<StartRepr> for EventStart {
    type Error = &'static str;

    fn try_from(repr: StartRepr) -> Result<Self, Self::Error> {
        match (repr.date_time, repr.date) {
            (Some(dt), _) => Ok(Self::DateTime(dt)),
            (None, Some(date)) => Ok(Self::Date(date)),
            (None, None) => Err("event start needs either `date` or `dateTime`"),
        }
    }
}

impl From<EventStart> for StartRepr {
    fn from(start: EventStart) -> Self {
        match start {
            EventStart::Date(date) => Self {
                date: Some(date),
                date_time: None,
            },
            EventStart::DateTime(dt) => Self {
                date: None,
                date_time: Some(dt),
            },
        }
    }
}

/// The local day a report covers.
///
/// Represents the half-open interval `[start, end)` between two consecutive
/// local midnights, stored in UTC together with the local calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    /// The local calendar date of the window.
    pub date: NaiveDate,
    /// Local midnight of `date` (inclusive).
    pub start: DateTime<Utc>,
    /// Local midnight of the following date (exclusive).
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Returns the window containing the current instant in the machine's
    /// local time zone.
    pub fn today() -> Self {
        compute_day_window(&Local::now())
    }

    /// Returns the window for `date` in the given time zone.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
        Self {
            date,
            start: local_midnight(date, tz),
            end: local_midnight(next, tz),
        }
    }

    /// Returns the length of the window in absolute time.
    ///
    /// This is 24 hours except on days with a DST transition.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if an instant falls within `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if an event start falls within the window.
    ///
    /// All-day starts match on the local date, timed starts on the instant.
    pub fn contains_start(&self, start: &EventStart) -> bool {
        match start {
            EventStart::Date(date) => *date == self.date,
            EventStart::DateTime(dt) => self.contains(dt.with_timezone(&Utc)),
        }
    }
}

/// Derives the day window containing `reference` in the reference's own
/// time zone.
pub fn compute_day_window<Tz: TimeZone>(reference: &DateTime<Tz>) -> DayWindow {
    DayWindow::for_date(reference.date_naive(), &reference.timezone())
}

/// Resolves local midnight of `date`.
///
/// An ambiguous midnight resolves to the earliest instant. A midnight that
/// falls into a DST gap resolves to the first valid minute after it.
fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=24 * 60)
        .find_map(|minutes| {
            tz.from_local_datetime(&(midnight + Duration::minutes(minutes)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    mod event_start {
        use super::*;

        #[test]
        fn all_day_and_timed() {
            let d = EventStart::from_date(date(2025, 2, 5));
            assert!(d.is_all_day());

            let t = EventStart::from_datetime(utc(2025, 2, 5, 9, 0, 0));
            assert!(!t.is_all_day());
        }

        #[test]
        fn ordering() {
            let all_day = EventStart::from_date(date(2025, 2, 5));
            let nine = EventStart::from_datetime(utc(2025, 2, 5, 9, 0, 0));
            let ten_cet = EventStart::from_datetime(
                offset(1).with_ymd_and_hms(2025, 2, 5, 11, 0, 0).unwrap(),
            );

            assert!(all_day < nine);
            assert!(nine < ten_cet);
        }

        #[test]
        fn serializes_in_provider_shape() {
            let d = EventStart::from_date(date(2025, 2, 5));
            assert_eq!(
                serde_json::to_value(&d).unwrap(),
                serde_json::json!({"date": "2025-02-05"})
            );

            let t = EventStart::from_datetime(
                offset(1).with_ymd_and_hms(2025, 2, 5, 9, 30, 0).unwrap(),
            );
            assert_eq!(
                serde_json::to_value(&t).unwrap(),
                serde_json::json!({"dateTime": "2025-02-05T09:30:00+01:00"})
            );
        }

        #[test]
        fn deserializes_provider_payload() {
            let parsed: EventStart =
                serde_json::from_str(r#"{"dateTime": "2025-02-05T09:30:00-05:00", "timeZone": "America/New_York"}"#)
                    .unwrap();
            assert_eq!(
                parsed,
                EventStart::DateTime(offset(-5).with_ymd_and_hms(2025, 2, 5, 9, 30, 0).unwrap())
            );

            let parsed: EventStart = serde_json::from_str(r#"{"date": "2025-02-05"}"#).unwrap();
            assert_eq!(parsed, EventStart::Date(date(2025, 2, 5)));
        }

        #[test]
        fn rejects_empty_start() {
            let result: Result<EventStart, _> = serde_json::from_str("{}");
            assert!(result.is_err());
        }
    }

    mod day_window {
        use super::*;

        fn assert_window_properties<Tz: TimeZone>(reference: DateTime<Tz>) {
            let window = compute_day_window(&reference);
            let tz = reference.timezone();
            let t = reference.with_timezone(&Utc);

            assert!(window.start <= t, "start after reference");
            assert!(t < window.end, "end not after reference");

            let local_start = window.start.with_timezone(&tz);
            let local_end = window.end.with_timezone(&tz);
            assert_eq!(local_start.date_naive(), reference.date_naive());
            assert_eq!(local_end.date_naive(), reference.date_naive().succ_opt().unwrap());
            assert_eq!(local_start.time().num_seconds_from_midnight(), 0);
            assert_eq!(local_end.time().num_seconds_from_midnight(), 0);
        }

        #[test]
        fn window_contains_reference_for_many_instants() {
            for hours in [-11, -5, 0, 1, 5, 9, 14] {
                let tz = offset(hours);
                for (h, m) in [(0, 0), (0, 1), (9, 30), (12, 0), (23, 59)] {
                    let reference = tz.with_ymd_and_hms(2025, 2, 5, h, m, 0).unwrap();
                    assert_window_properties(reference);
                }
            }
        }

        #[test]
        fn fixed_offset_window_is_24_hours() {
            let reference = offset(2).with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap();
            let window = compute_day_window(&reference);
            assert_eq!(window.date, date(2025, 6, 1));
            assert_eq!(window.start, utc(2025, 5, 31, 22, 0, 0));
            assert_eq!(window.end, utc(2025, 6, 1, 22, 0, 0));
            assert_eq!(window.duration(), Duration::hours(24));
        }

        #[test]
        fn spring_forward_day_is_23_hours() {
            let tz = chrono_tz::America::New_York;
            let reference = tz.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
            assert_window_properties(reference);

            let window = compute_day_window(&reference);
            assert_eq!(window.start, utc(2024, 3, 10, 5, 0, 0));
            assert_eq!(window.end, utc(2024, 3, 11, 4, 0, 0));
            assert_eq!(window.duration(), Duration::hours(23));
        }

        #[test]
        fn fall_back_day_is_25_hours() {
            let tz = chrono_tz::Europe::Paris;
            let reference = tz.with_ymd_and_hms(2024, 10, 27, 18, 0, 0).unwrap();
            assert_window_properties(reference);
            assert_eq!(compute_day_window(&reference).duration(), Duration::hours(25));
        }

        #[test]
        fn midnight_in_dst_gap_uses_first_valid_instant() {
            // Brazil started DST at local midnight on 2018-11-04.
            let tz = chrono_tz::America::Sao_Paulo;
            let reference = tz.with_ymd_and_hms(2018, 11, 4, 12, 0, 0).unwrap();
            let window = compute_day_window(&reference);

            assert_eq!(window.start, utc(2018, 11, 4, 3, 0, 0));
            assert_eq!(window.end, utc(2018, 11, 5, 2, 0, 0));
            assert_eq!(window.start.with_timezone(&tz).hour(), 1);
        }

        #[test]
        fn contains_is_half_open() {
            let window = DayWindow::for_date(date(2025, 2, 5), &Utc);

            assert!(window.contains(utc(2025, 2, 5, 0, 0, 0)));
            assert!(window.contains(utc(2025, 2, 5, 23, 59, 59)));
            assert!(!window.contains(utc(2025, 2, 4, 23, 59, 59)));
            assert!(!window.contains(utc(2025, 2, 6, 0, 0, 0)));
        }

        #[test]
        fn contains_start_matches_all_day_on_local_date() {
            let window = DayWindow::for_date(date(2025, 2, 5), &offset(9));

            assert!(window.contains_start(&EventStart::from_date(date(2025, 2, 5))));
            assert!(!window.contains_start(&EventStart::from_date(date(2025, 2, 4))));
            assert!(!window.contains_start(&EventStart::from_date(date(2025, 2, 6))));
        }

        #[test]
        fn contains_start_compares_instants_across_offsets() {
            let window = DayWindow::for_date(date(2025, 2, 5), &offset(1));

            // 23:30 UTC on the 4th is 00:30 on the 5th in UTC+1.
            let inside = EventStart::from_datetime(utc(2025, 2, 4, 23, 30, 0));
            assert!(window.contains_start(&inside));

            // 23:30 UTC on the 5th is already the 6th in UTC+1.
            let outside = EventStart::from_datetime(utc(2025, 2, 5, 23, 30, 0));
            assert!(!window.contains_start(&outside));
        }

        #[test]
        fn serde_roundtrip() {
            let window = DayWindow::for_date(date(2025, 2, 5), &offset(-3));
            let json = serde_json::to_string(&window).unwrap();
            let parsed: DayWindow = serde_json::from_str(&json).unwrap();
            assert_eq!(window, parsed);
        }
    }
}
