//! Relative date expression resolver
//!
//! Parses and evaluates expressions of the form `now[-<count><unit>][/<unit>]`
//! against a fixed reference instant, `unit ∈ {s,m,h,d,w,M,y}`. The subtract
//! component steps backwards (calendar-aware for months and years), the fit
//! component truncates down to the start of a calendar unit (weeks start on
//! Monday).
//!
//! # Examples
//!
//! ```text
//! now          the reference instant
//! now-5m       five minutes before the reference
//! now/d        midnight of the reference day
//! now-1w/w     start of the previous week
//! ```
//!
//! All results are epoch-millisecond strings with whole-second precision, so
//! every expression in one report resolves consistently from the same
//! reference timestamp no matter how long rendering takes.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, Months, NaiveDate, NaiveDateTime,
    TimeZone, Timelike,
};
use chrono_tz::Tz;
use nom::{
    character::complete::{char, digit1, one_of},
    combinator::{map_opt, map_res, opt},
    sequence::{pair, preceded},
    IResult,
};

use crate::timerange::error::{TimeRangeError, TimeRangeResult};

/// Calendar unit of a date expression component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(Self::Seconds),
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            'd' => Some(Self::Days),
            'w' => Some(Self::Weeks),
            'M' => Some(Self::Months),
            'y' => Some(Self::Years),
            _ => None,
        }
    }

    /// True for units smaller than a day
    fn sub_day(self) -> bool {
        matches!(self, Self::Seconds | Self::Minutes | Self::Hours)
    }
}

/// Decomposed relative date expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateExpression {
    /// Count and unit to subtract from the reference
    subtract: Option<(i64, TimeUnit)>,
    /// Unit to truncate ("fit") the result to
    fit: Option<TimeUnit>,
}

/// Resolve a timezone name against the tz database
pub fn parse_timezone(name: &str) -> TimeRangeResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| TimeRangeError::UnknownTimezone(name.to_string()))
}

/// Translate a raw time-range expression into an epoch-millisecond string.
///
/// An absent expression resolves to the reference instant. Absolute inputs
/// (bare integers or ISO-8601 timestamps) pass through unchanged; values
/// from the dashboard server are never re-interpreted. Anything else must
/// match the relative grammar or [`TimeRangeError::UnknownExpression`] is
/// returned, carrying the offending input for inline rendering.
///
/// When `is_to` is set the result models an exclusive upper bound: without a
/// fit the instant is moved back one second; with a day-or-larger fit the
/// result is one second before the next period start; with a sub-day fit it
/// is exactly the next period start.
pub fn translate(
    raw: Option<&str>,
    reference: DateTime<FixedOffset>,
    is_to: bool,
    timezone: Option<Tz>,
) -> TimeRangeResult<String> {
    let Some(raw) = raw else {
        return Ok(epoch_millis_string(reference.timestamp()));
    };
    if looks_absolute(raw) {
        return Ok(raw.to_string());
    }

    let expression = parse(raw)?;
    let seconds = match timezone {
        Some(tz) => evaluate(expression, reference.with_timezone(&tz), is_to),
        None => evaluate(expression, reference, is_to),
    };
    Ok(epoch_millis_string(seconds))
}

/// Bare integers and ISO-8601 timestamps are absolute and pass through
fn looks_absolute(raw: &str) -> bool {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    let b = raw.as_bytes();
    b.len() >= 11
        && b[0..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
        && b[10] == b'T'
}

fn parse(raw: &str) -> TimeRangeResult<DateExpression> {
    match parse_expression(raw) {
        Ok((remaining, expression)) if remaining.is_empty() => Ok(expression),
        _ => Err(TimeRangeError::UnknownExpression(raw.to_string())),
    }
}

fn parse_expression(input: &str) -> IResult<&str, DateExpression> {
    let (input, _) = nom::bytes::complete::tag("now")(input)?;
    let (input, subtract) = opt(preceded(
        char('-'),
        pair(opt(map_res(digit1, str::parse::<i64>)), parse_unit),
    ))(input)?;
    let (input, fit) = opt(preceded(char('/'), parse_unit))(input)?;

    Ok((
        input,
        DateExpression {
            // a bare unit means one unit, e.g. now-M
            subtract: subtract.map(|(count, unit)| (count.unwrap_or(1), unit)),
            fit,
        },
    ))
}

fn parse_unit(input: &str) -> IResult<&str, TimeUnit> {
    map_opt(one_of("smhdwMy"), TimeUnit::from_char)(input)
}

/// Evaluate the expression in the given local timezone, returning epoch
/// seconds
fn evaluate<Z: TimeZone>(expression: DateExpression, local: DateTime<Z>, is_to: bool) -> i64 {
    let mut date = local;

    if let Some((count, unit)) = expression.subtract {
        date = subtract(date, count, unit);
    }

    if let Some(unit) = expression.fit {
        let start = truncate(&date, unit);
        if !is_to {
            return start.timestamp();
        }
        let next = advance(&start, unit);
        return if unit.sub_day() {
            // exclusive upper bound: exactly the next period start
            next.timestamp()
        } else {
            // end of period: one second before the next period start
            next.timestamp() - 1
        };
    }

    if is_to {
        // "to: now" never equals "from: now" derived from the same instant
        date.timestamp() - 1
    } else {
        date.timestamp()
    }
}

/// Step backwards by `count` units; months and years use calendar stepping
fn subtract<Z: TimeZone>(date: DateTime<Z>, count: i64, unit: TimeUnit) -> DateTime<Z> {
    let months = |n: i64| Months::new(u32::try_from(n).unwrap_or(u32::MAX));
    match unit {
        TimeUnit::Seconds => date - Duration::seconds(count),
        TimeUnit::Minutes => date - Duration::minutes(count),
        TimeUnit::Hours => date - Duration::hours(count),
        TimeUnit::Days => date - Duration::days(count),
        TimeUnit::Weeks => date - Duration::weeks(count),
        TimeUnit::Months => date.clone().checked_sub_months(months(count)).unwrap_or(date),
        TimeUnit::Years => date
            .clone()
            .checked_sub_months(months(count.saturating_mul(12)))
            .unwrap_or(date),
    }
}

/// Truncate down to the start of the given unit in local time
fn truncate<Z: TimeZone>(date: &DateTime<Z>, unit: TimeUnit) -> DateTime<Z> {
    let naive = date.naive_local();
    let day = naive.date();
    let truncated = match unit {
        TimeUnit::Seconds => naive.with_nanosecond(0).unwrap_or(naive),
        TimeUnit::Minutes => day
            .and_hms_opt(naive.hour(), naive.minute(), 0)
            .unwrap_or(naive),
        TimeUnit::Hours => day.and_hms_opt(naive.hour(), 0, 0).unwrap_or(naive),
        TimeUnit::Days => day.and_hms_opt(0, 0, 0).unwrap_or(naive),
        TimeUnit::Weeks => {
            // weeks start on Monday
            let monday = day - Duration::days(day.weekday().num_days_from_monday() as i64);
            monday.and_hms_opt(0, 0, 0).unwrap_or(naive)
        }
        TimeUnit::Months => NaiveDate::from_ymd_opt(day.year(), day.month(), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(naive),
        TimeUnit::Years => NaiveDate::from_ymd_opt(day.year(), 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(naive),
    };
    resolve_local(date, truncated)
}

/// Start of the next period after an already-truncated start
fn advance<Z: TimeZone>(start: &DateTime<Z>, unit: TimeUnit) -> DateTime<Z> {
    let naive = start.naive_local();
    let next = match unit {
        TimeUnit::Seconds => naive + Duration::seconds(1),
        TimeUnit::Minutes => naive + Duration::minutes(1),
        TimeUnit::Hours => naive + Duration::hours(1),
        TimeUnit::Days => naive + Duration::days(1),
        TimeUnit::Weeks => naive + Duration::days(7),
        TimeUnit::Months => naive.checked_add_months(Months::new(1)).unwrap_or(naive),
        TimeUnit::Years => naive.checked_add_months(Months::new(12)).unwrap_or(naive),
    };
    resolve_local(start, next)
}

/// Resolve a local naive time in the zone of `anchor`, taking the earliest
/// interpretation on DST folds and shifting forward out of DST gaps
fn resolve_local<Z: TimeZone>(anchor: &DateTime<Z>, naive: NaiveDateTime) -> DateTime<Z> {
    let tz = anchor.timezone();
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| anchor.clone()),
    }
}

fn epoch_millis_string(seconds: i64) -> String {
    (seconds * 1000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference instant used by all worked scenarios
    fn reference() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2020-07-28T20:58:03.005+02:00").unwrap()
    }

    fn translate_ref(raw: &str, is_to: bool) -> String {
        translate(Some(raw), reference(), is_to, None).unwrap()
    }

    #[test]
    fn test_absent_expression_returns_reference() {
        assert_eq!(
            translate(None, reference(), false, None).unwrap(),
            "1595962683000"
        );
    }

    #[test]
    fn test_absolute_inputs_pass_through() {
        assert_eq!(translate_ref("1595962683000", false), "1595962683000");
        assert_eq!(
            translate_ref("2020-07-28T20:58:03.005Z", true),
            "2020-07-28T20:58:03.005Z"
        );
    }

    #[test]
    fn test_now_from_and_to() {
        assert_eq!(translate_ref("now", false), "1595962683000");
        // to-time strictly precedes from-time by exactly one second
        assert_eq!(translate_ref("now", true), "1595962682000");
    }

    #[test]
    fn test_fit_day() {
        assert_eq!(translate_ref("now/d", false), "1595887200000");
        assert_eq!(translate_ref("now/d", true), "1595973599000");
    }

    #[test]
    fn test_fit_week_starts_monday() {
        // 2020-07-28 is a Tuesday; the week starts 2020-07-27T00:00+02:00
        assert_eq!(translate_ref("now/w", false), "1595800800000");
    }

    #[test]
    fn test_fit_month_and_year() {
        assert_eq!(translate_ref("now/M", false), "1593554400000");
        assert_eq!(translate_ref("now/y", false), "1577829600000");
    }

    #[test]
    fn test_fit_hour_to_boundary_is_next_start() {
        // sub-day fits resolve to the exclusive next period start
        assert_eq!(translate_ref("now/h", false), "1595959200000");
        assert_eq!(translate_ref("now/h", true), "1595962800000");
    }

    #[test]
    fn test_subtract_fixed_units() {
        assert_eq!(translate_ref("now-5m", false), "1595962383000");
        assert_eq!(translate_ref("now-2d", false), "1595789883000");
        assert_eq!(translate_ref("now-1w", false), "1595357883000");
    }

    #[test]
    fn test_subtract_month_is_calendar_aware() {
        // one calendar month, not a fixed 30-day duration
        assert_eq!(translate_ref("now-M", false), "1593370683000");
    }

    #[test]
    fn test_subtract_month_clamps_short_months() {
        let reference = DateTime::parse_from_rfc3339("2020-03-31T12:00:00+00:00").unwrap();
        let result = translate(Some("now-M"), reference, false, None).unwrap();
        let expected = DateTime::parse_from_rfc3339("2020-02-29T12:00:00+00:00").unwrap();
        assert_eq!(result, (expected.timestamp() * 1000).to_string());
    }

    #[test]
    fn test_subtract_year() {
        let result = translate_ref("now-y", false);
        let expected = DateTime::parse_from_rfc3339("2019-07-28T20:58:03+02:00").unwrap();
        assert_eq!(result, (expected.timestamp() * 1000).to_string());
    }

    #[test]
    fn test_subtract_and_fit_combined() {
        // start of the previous week
        let result = translate_ref("now-1w/w", false);
        let expected = DateTime::parse_from_rfc3339("2020-07-20T00:00:00+02:00").unwrap();
        assert_eq!(result, (expected.timestamp() * 1000).to_string());
    }

    #[test]
    fn test_named_timezone_changes_fit() {
        let tz = parse_timezone("UTC").unwrap();
        let result = translate(Some("now/d"), reference(), false, Some(tz)).unwrap();
        // midnight UTC, not midnight +02:00
        assert_eq!(result, "1595894400000");
    }

    #[test]
    fn test_unknown_timezone() {
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(TimeRangeError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn test_malformed_expressions() {
        for raw in ["yesterday", "now-", "now-5", "now-5d/x", "now+1d", "now-5d extra"] {
            let result = translate(Some(raw), reference(), false, None);
            match result {
                Err(TimeRangeError::UnknownExpression(s)) => assert_eq!(s, raw),
                other => panic!("expected UnknownExpression for '{raw}', got {other:?}"),
            }
        }
    }

    #[test]
    fn test_determinism() {
        let first = translate_ref("now", false);
        let second = translate_ref("now", false);
        assert_eq!(first, second);
    }
}
