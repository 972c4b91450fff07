//! Time-string parsing and status arithmetic.
//!
//! Nothing here reads the system clock. Every function takes the reference
//! instant explicitly; [`SystemClock`] is the only place "now" is sampled.

use time::{OffsetDateTime, PrimitiveDateTime, Weekday};

use crate::core::errors::TimeParseError;
use crate::models::ClassStatus;

/// Returned by [`time_to_minutes`] for empty or malformed input.
pub const INVALID_MINUTES: i32 = -1;

pub const DEFAULT_UPCOMING_WINDOW: i32 = 15;

/// Parses `"hh:mm AM|PM"` into minutes since midnight.
///
/// The meridiem is case-insensitive and may be glued to the minutes
/// (`"9:05pm"`). Without one the hour is read on a 24-hour clock.
pub fn parse_minutes(raw: &str) -> Result<i32, TimeParseError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let (clock, meridiem) = split_meridiem(s);
    let (h, m) = clock
        .split_once(':')
        .ok_or_else(|| TimeParseError::MissingColon(s.to_string()))?;
    let hours = parse_component(h.trim(), s)?;
    let minutes = parse_component(m.trim(), s)?;
    if minutes > 59 {
        return Err(TimeParseError::OutOfRange(s.to_string()));
    }

    let hours = match meridiem {
        None if hours < 24 => hours,
        None => return Err(TimeParseError::OutOfRange(s.to_string())),
        Some(_) if hours > 12 => return Err(TimeParseError::OutOfRange(s.to_string())),
        Some(mer) if mer.eq_ignore_ascii_case("am") => hours % 12,
        Some(mer) if mer.eq_ignore_ascii_case("pm") => hours % 12 + 12,
        Some(mer) => return Err(TimeParseError::BadMeridiem(mer.to_string())),
    };

    Ok(hours * 60 + minutes)
}

/// Lenient variant of [`parse_minutes`]: never fails, returns
/// [`INVALID_MINUTES`] instead.
pub fn time_to_minutes(raw: &str) -> i32 {
    parse_minutes(raw).unwrap_or(INVALID_MINUTES)
}

fn split_meridiem(s: &str) -> (&str, Option<&str>) {
    if let Some((clock, mer)) = s.rsplit_once(char::is_whitespace) {
        return (clock.trim_end(), Some(mer));
    }
    let lower = s.to_ascii_lowercase();
    if (lower.ends_with("am") || lower.ends_with("pm")) && s.len() > 2 {
        let cut = s.len() - 2;
        if s.is_char_boundary(cut) {
            return (&s[..cut], Some(&s[cut..]));
        }
    }
    (s, None)
}

fn parse_component(part: &str, whole: &str) -> Result<i32, TimeParseError> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::NotNumeric(whole.to_string()));
    }
    part.parse::<i32>()
        .map_err(|_| TimeParseError::NotNumeric(whole.to_string()))
}

/// Splits `"08:00 AM – 10:00 AM"` on a hyphen, en dash or em dash.
/// Anything other than exactly two non-empty sides yields `None`.
pub fn split_time_range(range: &str) -> Option<(&str, &str)> {
    let mut parts = range.split(|c| matches!(c, '-' | '\u{2013}' | '\u{2014}'));
    let start = parts.next()?.trim();
    let end = parts.next()?.trim();
    if parts.next().is_some() || start.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, end))
}

pub fn current_minutes(now: PrimitiveDateTime) -> i32 {
    i32::from(now.hour()) * 60 + i32::from(now.minute())
}

/// English weekday name of `now`, e.g. `"Monday"`.
pub fn current_day(now: PrimitiveDateTime) -> &'static str {
    weekday_name(now.weekday())
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Monday => "Monday",
        Weekday::Tuesday => "Tuesday",
        Weekday::Wednesday => "Wednesday",
        Weekday::Thursday => "Thursday",
        Weekday::Friday => "Friday",
        Weekday::Saturday => "Saturday",
        Weekday::Sunday => "Sunday",
    }
}

/// Elapsed share of `[start, end)` at `now`, clamped to `0..=100`.
pub fn get_progress(start: &str, end: &str, now: PrimitiveDateTime) -> f64 {
    progress_between(time_to_minutes(start), time_to_minutes(end), current_minutes(now))
}

pub(crate) fn progress_between(start: i32, end: i32, now: i32) -> f64 {
    if now < start {
        return 0.0;
    }
    if now >= end || end <= start {
        return 100.0;
    }
    let elapsed = f64::from(now - start);
    let total = f64::from(end - start);
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}

/// Classifies a session. The upcoming window is inclusive: exactly
/// `upcoming_window` minutes before start already counts as upcoming.
pub fn get_class_status(
    start: &str,
    end: &str,
    upcoming_window: i32,
    now: PrimitiveDateTime,
) -> ClassStatus {
    status_between(
        time_to_minutes(start),
        time_to_minutes(end),
        upcoming_window,
        current_minutes(now),
    )
}

pub(crate) fn status_between(start: i32, end: i32, upcoming_window: i32, now: i32) -> ClassStatus {
    if now >= start && now < end {
        ClassStatus::Active
    } else if now < start && start - now <= upcoming_window {
        ClassStatus::Upcoming
    } else if now >= end {
        ClassStatus::Finished
    } else {
        ClassStatus::Future
    }
}

/// Source of "now" for long-running callers such as the live view.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// Local wall-clock time, falling back to UTC when the offset is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub PrimitiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn midnight_and_noon() {
        assert_eq!(time_to_minutes("12:00 AM"), 0);
        assert_eq!(time_to_minutes("12:00 PM"), 720);
        assert_eq!(time_to_minutes("12:30 AM"), 30);
        assert_eq!(time_to_minutes("01:15 PM"), 795);
        assert_eq!(time_to_minutes("9:05pm"), 21 * 60 + 5);
    }

    #[test]
    fn monotonic_within_each_half_day() {
        for mer in ["AM", "PM"] {
            let mut last = i32::MIN;
            for h in [12, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11] {
                for m in [0, 15, 59] {
                    let v = time_to_minutes(&format!("{h:02}:{m:02} {mer}"));
                    assert!(v > last, "{h}:{m} {mer} not increasing");
                    last = v;
                }
            }
        }
    }

    #[test]
    fn malformed_input_yields_sentinel() {
        for raw in ["", "   ", "0800 AM", "ab:cd PM", "10:xx AM", "13:00 PM", "10:00 XM", "10:75"] {
            assert_eq!(time_to_minutes(raw), INVALID_MINUTES, "{raw:?}");
        }
        assert_eq!(
            parse_minutes("0800 AM"),
            Err(TimeParseError::MissingColon("0800 AM".into()))
        );
        assert_eq!(parse_minutes(""), Err(TimeParseError::Empty));
    }

    #[test]
    fn splits_any_dash_variant() {
        assert_eq!(
            split_time_range("08:00 AM – 10:00 AM"),
            Some(("08:00 AM", "10:00 AM"))
        );
        assert_eq!(split_time_range("08:00 AM-10:00 AM"), Some(("08:00 AM", "10:00 AM")));
        assert_eq!(split_time_range("08:00 AM — 10:00 AM"), Some(("08:00 AM", "10:00 AM")));
        assert_eq!(split_time_range("08:00 AM"), None);
        assert_eq!(split_time_range("08:00 AM – 09:00 AM – 10:00 AM"), None);
        assert_eq!(split_time_range("– 10:00 AM"), None);
    }

    #[test]
    fn progress_is_clamped_and_linear() {
        let progress = |now| get_progress("08:00 AM", "10:00 AM", now);
        assert_eq!(progress(datetime!(2024-01-01 07:00)), 0.0);
        assert_eq!(progress(datetime!(2024-01-01 08:00)), 0.0);
        assert_eq!(progress(datetime!(2024-01-01 08:30)), 25.0);
        assert_eq!(progress(datetime!(2024-01-01 10:00)), 100.0);
        assert_eq!(progress(datetime!(2024-01-01 11:00)), 100.0);
    }

    #[test]
    fn status_boundaries() {
        let status = |now| get_class_status("08:00 AM", "10:00 AM", 15, now);

        assert_eq!(status(datetime!(2024-01-01 07:44)), ClassStatus::Future);
        assert_eq!(status(datetime!(2024-01-01 07:45)), ClassStatus::Upcoming);
        assert_eq!(status(datetime!(2024-01-01 07:59)), ClassStatus::Upcoming);
        assert_eq!(status(datetime!(2024-01-01 08:00)), ClassStatus::Active);
        assert_eq!(status(datetime!(2024-01-01 09:59)), ClassStatus::Active);
        assert_eq!(status(datetime!(2024-01-01 10:00)), ClassStatus::Finished);
    }

    #[test]
    fn current_day_is_english_weekday() {
        assert_eq!(current_day(datetime!(2024-01-01 09:00)), "Monday");
        assert_eq!(current_day(datetime!(2024-01-06 09:00)), "Saturday");
        assert_eq!(current_minutes(datetime!(2024-01-06 09:41)), 581);
    }
}
