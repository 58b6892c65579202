//! Timestamp parsing, ISO-8601 serialization and calendar-aware ranges.
//!
//! Every timestamp that enters the core goes through [`parse`], which returns
//! a UTC [`OffsetDateTime`]. Naive inputs (no offset) are taken to be UTC;
//! inputs carrying an offset are converted.
//!
//! # Example
//!
//! ```
//! use tally_core::timestamp::{Step, parse, range, to_iso};
//!
//! let ts = parse("2022-02-01T00:00:00")?;
//! assert_eq!(to_iso(ts, false), "2022-02-01T00:00:00+00:00");
//! assert_eq!(to_iso(ts, true), "2022-02-01T00:00:00");
//!
//! let months: Vec<_> = range("2022-01-31", "2022-04-30", "+1 month".parse::<Step>()?, None)?
//!     .iter()
//!     .map(|ts| to_iso(ts, true))
//!     .collect();
//! assert_eq!(
//!     months,
//!     ["2022-01-31T00:00:00", "2022-02-28T00:00:00", "2022-03-31T00:00:00", "2022-04-30T00:00:00"]
//! );
//! # Ok::<(), tally_core::Error>(())
//! ```

use core::fmt;
use core::str::FromStr;
use std::fmt::Write as _;

use serde::Deserialize;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use tally_types::{CANONICAL_OFFSET, ContractError, ParseError};

use crate::error::Result;

/// Offset-bearing forms not covered by RFC 3339.
const ZONED_FORMATS: [&[BorrowedFormatItem<'static>]; 2] = [
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory]:[offset_minute]"
    ),
    format_description!("[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory]:[offset_minute]"),
];

/// Minute or space-separated forms ending in a literal `Z`.
const ZULU_FORMATS: [&[BorrowedFormatItem<'static>]; 2] = [
    format_description!("[year]-[month]-[day]T[hour]:[minute]Z"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]Z"),
];

/// Forms without an offset; these are read as UTC.
const NAIVE_FORMATS: [&[BorrowedFormatItem<'static>]; 4] = [
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A timestamp input: already structured, or ISO-8601 text.
///
/// Deserializes from any JSON value. Strings become [`TimeInput::Text`];
/// anything else is kept as [`TimeInput::Invalid`] and rejected by [`parse`]
/// with a [`ContractError`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum TimeInput {
    /// A timestamp with a known offset.
    Zoned(OffsetDateTime),
    /// A timestamp without offset, read as UTC.
    Naive(PrimitiveDateTime),
    /// ISO-8601 text.
    Text(String),
    /// Something that is not a timestamp, described for error reporting.
    Invalid(String),
}

impl From<OffsetDateTime> for TimeInput {
    fn from(value: OffsetDateTime) -> Self {
        TimeInput::Zoned(value)
    }
}

impl From<PrimitiveDateTime> for TimeInput {
    fn from(value: PrimitiveDateTime) -> Self {
        TimeInput::Naive(value)
    }
}

impl From<String> for TimeInput {
    fn from(value: String) -> Self {
        TimeInput::Text(value)
    }
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        TimeInput::Text(value.to_string())
    }
}

impl From<&String> for TimeInput {
    fn from(value: &String) -> Self {
        TimeInput::Text(value.clone())
    }
}

impl From<serde_json::Value> for TimeInput {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::String(s) => TimeInput::Text(s),
            Value::Null => TimeInput::Invalid("null".to_string()),
            Value::Bool(b) => TimeInput::Invalid(format!("boolean {}", b)),
            Value::Number(n) => TimeInput::Invalid(format!("number {}", n)),
            Value::Array(_) => TimeInput::Invalid("array".to_string()),
            Value::Object(_) => TimeInput::Invalid("object".to_string()),
        }
    }
}

/// Normalize a timestamp input to a UTC timestamp.
///
/// Accepted text forms: RFC 3339 (`2022-02-01T00:00:00Z`,
/// `2022-02-01T00:00:00+02:00`), the same with a space separator, minute
/// precision with or without an offset (`2022-02-01T00:00`,
/// `2022-02-01T00:00Z`, `2022-02-01T00:00+02:00`), naive date-times, and
/// bare dates (`2022-02-01`, midnight).
pub fn parse(source: impl Into<TimeInput>) -> Result<OffsetDateTime> {
    match source.into() {
        TimeInput::Zoned(ts) => Ok(ts.to_offset(CANONICAL_OFFSET)),
        TimeInput::Naive(ts) => Ok(ts.assume_utc()),
        TimeInput::Text(text) => Ok(parse_text(&text)?),
        TimeInput::Invalid(what) => Err(ContractError::NotATimestamp(what).into()),
    }
}

fn parse_text(input: &str) -> std::result::Result<OffsetDateTime, ParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ParseError::timestamp(input, "empty string"));
    }

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts.to_offset(CANONICAL_OFFSET));
    }
    for format in ZONED_FORMATS {
        if let Ok(ts) = OffsetDateTime::parse(s, format) {
            return Ok(ts.to_offset(CANONICAL_OFFSET));
        }
    }
    for format in ZULU_FORMATS.into_iter().chain(NAIVE_FORMATS) {
        if let Ok(ts) = PrimitiveDateTime::parse(s, format) {
            return Ok(ts.assume_utc());
        }
    }

    Date::parse(s, DATE_FORMAT)
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| ParseError::timestamp(input, "expected an ISO-8601 date or date-time"))
}

/// Serialize a timestamp as ISO-8601.
///
/// The offset is forced to `+00:00` (replaced, not converted). With
/// `drop_timezone` the offset suffix is left off. Fractional seconds appear
/// only when non-zero.
pub fn to_iso(timestamp: OffsetDateTime, drop_timezone: bool) -> String {
    let ts = timestamp.replace_offset(CANONICAL_OFFSET);
    let mut out = String::with_capacity(32);
    // Writing to a String cannot fail.
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        ts.year(),
        u8::from(ts.month()),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second()
    );

    let nanos = ts.nanosecond();
    if nanos != 0 {
        if nanos % 1_000 == 0 {
            let _ = write!(out, ".{:06}", nanos / 1_000);
        } else {
            let _ = write!(out, ".{:09}", nanos);
        }
    }

    if !drop_timezone {
        out.push_str("+00:00");
    }
    out
}

/// A calendar-aware step: whole months plus a fixed duration.
///
/// Month arithmetic clamps to the last day of the target month, so
/// `2022-01-31 + 1 month` is `2022-02-28`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    months: i32,
    duration: Duration,
}

impl Step {
    /// A step of `n` calendar months.
    pub const fn months(n: i32) -> Self {
        Self {
            months: n,
            duration: Duration::ZERO,
        }
    }

    /// A step of `n` calendar years.
    pub const fn years(n: i32) -> Self {
        Self::months(n * 12)
    }

    /// A fixed-length step.
    pub const fn duration(duration: Duration) -> Self {
        Self {
            months: 0,
            duration,
        }
    }

    pub const fn weeks(n: i64) -> Self {
        Self::duration(Duration::weeks(n))
    }

    pub const fn days(n: i64) -> Self {
        Self::duration(Duration::days(n))
    }

    pub const fn hours(n: i64) -> Self {
        Self::duration(Duration::hours(n))
    }

    pub const fn minutes(n: i64) -> Self {
        Self::duration(Duration::minutes(n))
    }

    pub const fn seconds(n: i64) -> Self {
        Self::duration(Duration::seconds(n))
    }

    /// Returns true if every application moves time strictly forward.
    pub fn advances(&self) -> bool {
        self.months >= 0
            && !self.duration.is_negative()
            && (self.months > 0 || self.duration.is_positive())
    }

    /// `start` moved forward by `n` steps, computed from `start` directly so
    /// month-end clamping does not accumulate.
    fn nth_from(&self, start: OffsetDateTime, n: i32) -> Option<OffsetDateTime> {
        let shifted = add_months(start, i64::from(self.months) * i64::from(n))?;
        shifted.checked_add(self.duration.checked_mul(n)?)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.duration.is_zero() {
            if self.months % 12 == 0 && self.months != 0 {
                return write!(f, "{:+} year", self.months / 12);
            }
            return write!(f, "{:+} month", self.months);
        }
        if self.months != 0 {
            write!(f, "{:+} month ", self.months)?;
        }
        write!(f, "{:+} second", self.duration.whole_seconds())
    }
}

impl FromStr for Step {
    type Err = ParseError;

    /// Parse `[+|-]<n> <unit>`, e.g. `+1 month`, `2 hours`, `15min`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .char_indices()
            .find(|(i, c)| c.is_alphabetic() && *i > 0)
            .map(|(i, _)| i)
            .ok_or_else(|| ParseError::step(s, "expected '<count> <unit>'"))?;
        let (count, unit) = trimmed.split_at(split);

        let count: i32 = count
            .trim()
            .parse()
            .map_err(|_| ParseError::step(s, format!("invalid count '{}'", count.trim())))?;
        let n = i64::from(count);

        match unit.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(Step::seconds(n)),
            "min" | "mins" | "minute" | "minutes" => Ok(Step::minutes(n)),
            "h" | "hr" | "hrs" | "hour" | "hours" => Ok(Step::hours(n)),
            "d" | "day" | "days" => Ok(Step::days(n)),
            "w" | "week" | "weeks" => Ok(Step::weeks(n)),
            "mo" | "month" | "months" => Ok(Step::months(count)),
            "y" | "year" | "years" => count
                .checked_mul(12)
                .map(Step::months)
                .ok_or_else(|| ParseError::step(s, "too many years")),
            other => Err(ParseError::step(s, format!("unknown unit '{}'", other))),
        }
    }
}

fn add_months(ts: OffsetDateTime, months: i64) -> Option<OffsetDateTime> {
    if months == 0 {
        return Some(ts);
    }
    let index = i64::from(ts.year()) * 12 + i64::from(u8::from(ts.month())) - 1 + months;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;

    let mut day = ts.day();
    loop {
        match Date::from_calendar_date(year, month, day) {
            Ok(date) => return Some(ts.replace_date(date)),
            Err(_) if day > 28 => day -= 1,
            Err(_) => return None,
        }
    }
}

/// An inclusive, lazily generated sequence of timestamps.
///
/// Restartable: [`TimeRange::iter`] (or iterating `&range`) starts over from
/// the first element each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    start: OffsetDateTime,
    end: OffsetDateTime,
    step: Step,
    offset: Option<UtcOffset>,
}

impl TimeRange {
    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Iterate the range from the beginning.
    pub fn iter(&self) -> TimeRangeIter<'_> {
        TimeRangeIter {
            range: self,
            index: 0,
            done: false,
        }
    }
}

impl<'a> IntoIterator for &'a TimeRange {
    type Item = OffsetDateTime;
    type IntoIter = TimeRangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`TimeRange`].
#[derive(Debug, Clone)]
pub struct TimeRangeIter<'a> {
    range: &'a TimeRange,
    index: i32,
    done: bool,
}

impl Iterator for TimeRangeIter<'_> {
    type Item = OffsetDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self
            .range
            .step
            .nth_from(self.range.start, self.index)
            .filter(|ts| *ts <= self.range.end);
        let Some(ts) = next else {
            self.done = true;
            return None;
        };
        match self.index.checked_add(1) {
            Some(index) => self.index = index,
            None => self.done = true,
        }
        Some(match self.range.offset {
            Some(offset) => ts.replace_offset(offset),
            None => ts,
        })
    }
}

/// Build the sequence `start, start + step, ...` up to and including `end`.
///
/// With `timezone`, every produced timestamp has its offset replaced by it
/// (wall-clock values are kept, not converted). Fails with
/// [`ContractError::NonAdvancingStep`] for a zero or backward step.
pub fn range(
    start: impl Into<TimeInput>,
    end: impl Into<TimeInput>,
    step: Step,
    timezone: Option<UtcOffset>,
) -> Result<TimeRange> {
    if !step.advances() {
        return Err(ContractError::NonAdvancingStep(step.to_string()).into());
    }
    Ok(TimeRange {
        start: parse(start)?,
        end: parse(end)?,
        step,
        offset: timezone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use time::macros::{datetime, offset};

    #[test]
    fn test_parse_naive_is_utc() {
        let ts = parse("2022-02-01T00:00:00").unwrap();
        assert_eq!(ts, datetime!(2022-02-01 00:00:00 UTC));
        assert_eq!(ts.offset(), UtcOffset::UTC);
    }

    #[test]
    fn test_parse_accepted_forms() {
        let expected = datetime!(2022-09-01 10:30:00 UTC);
        for input in [
            "2022-09-01T10:30:00Z",
            "2022-09-01T10:30:00+00:00",
            "2022-09-01T12:30:00+02:00",
            "2022-09-01 10:30:00",
            "2022-09-01 12:30:00+02:00",
            "2022-09-01T10:30",
            "2022-09-01 10:30",
            "2022-09-01T12:30+02:00",
            "2022-09-01T10:30Z",
            "2022-09-01 10:30:00Z",
            "  2022-09-01T10:30:00  ",
        ] {
            assert_eq!(parse(input).unwrap(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let ts = parse("2022-09-01T10:30:00.250").unwrap();
        assert_eq!(ts.millisecond(), 250);
    }

    #[test]
    fn test_parse_bare_date_is_midnight() {
        assert_eq!(
            parse("2022-12-31").unwrap(),
            datetime!(2022-12-31 00:00:00 UTC)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "yesterday", "2022-13-01T00:00:00", "2022-02-30", "01/02/2022"] {
            let err = parse(input).unwrap_err();
            assert!(matches!(err, Error::Parse(_)), "input: {:?}", input);
        }
    }

    #[test]
    fn test_parse_structured_inputs() {
        let zoned = datetime!(2022-02-01 02:00:00 +02:00);
        assert_eq!(parse(zoned).unwrap(), datetime!(2022-02-01 00:00:00 UTC));

        let naive = datetime!(2022-02-01 05:00:00);
        assert_eq!(parse(naive).unwrap(), datetime!(2022-02-01 05:00:00 UTC));
    }

    #[test]
    fn test_parse_rejects_non_timestamp_json() {
        let input = TimeInput::from(serde_json::json!(1643673600));
        let err = parse(input).unwrap_err();
        assert!(matches!(
            err,
            Error::Contract(ContractError::NotATimestamp(ref what)) if what == "number 1643673600"
        ));
    }

    #[test]
    fn test_time_input_deserializes_from_any_json() {
        let inputs: Vec<TimeInput> =
            serde_json::from_str(r#"["2022-02-01T00:00:00", null, true]"#).unwrap();
        assert_eq!(inputs[0], TimeInput::Text("2022-02-01T00:00:00".to_string()));
        assert_eq!(inputs[1], TimeInput::Invalid("null".to_string()));
        assert_eq!(inputs[2], TimeInput::Invalid("boolean true".to_string()));
    }

    #[test]
    fn test_to_iso_forces_utc_suffix() {
        let ts = datetime!(2022-02-01 13:00:00 UTC);
        assert_eq!(to_iso(ts, false), "2022-02-01T13:00:00+00:00");
        assert_eq!(to_iso(ts, true), "2022-02-01T13:00:00");
    }

    #[test]
    fn test_to_iso_replaces_rather_than_converts() {
        let ts = datetime!(2022-02-01 13:00:00 +02:00);
        assert_eq!(to_iso(ts, false), "2022-02-01T13:00:00+00:00");
    }

    #[test]
    fn test_to_iso_fractional_seconds() {
        let micros = datetime!(2022-02-01 13:00:00.123456 UTC);
        assert_eq!(to_iso(micros, true), "2022-02-01T13:00:00.123456");

        let nanos = datetime!(2022-02-01 13:00:00.000000001 UTC);
        assert_eq!(to_iso(nanos, true), "2022-02-01T13:00:00.000000001");
    }

    #[test]
    fn test_to_iso_parse_round_trip() {
        for s in [
            "2022-02-01T00:00:00+00:00",
            "1999-12-31T23:59:59+00:00",
            "2024-02-29T12:00:00+00:00",
        ] {
            assert_eq!(to_iso(parse(s).unwrap(), false), s);
        }
    }

    #[test]
    fn test_step_from_str() {
        assert_eq!("+1 month".parse::<Step>().unwrap(), Step::months(1));
        assert_eq!("2 hours".parse::<Step>().unwrap(), Step::hours(2));
        assert_eq!("1 week".parse::<Step>().unwrap(), Step::weeks(1));
        assert_eq!("15min".parse::<Step>().unwrap(), Step::minutes(15));
        assert_eq!("+1 year".parse::<Step>().unwrap(), Step::months(12));
        assert_eq!("-3 days".parse::<Step>().unwrap(), Step::days(-3));
        assert!("month".parse::<Step>().is_err());
        assert!("1 fortnight".parse::<Step>().is_err());
        assert!("".parse::<Step>().is_err());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::months(1).to_string(), "+1 month");
        assert_eq!(Step::years(2).to_string(), "+2 year");
        assert_eq!(Step::hours(1).to_string(), "+3600 second");
    }

    #[test]
    fn test_range_hourly_inclusive() {
        let hours: Vec<_> = range(
            "2022-02-01T00:00:00",
            "2022-02-02T00:00:00",
            Step::hours(1),
            None,
        )
        .unwrap()
        .iter()
        .collect();
        assert_eq!(hours.len(), 25);
        assert_eq!(hours[0], datetime!(2022-02-01 00:00 UTC));
        assert_eq!(hours[24], datetime!(2022-02-02 00:00 UTC));
    }

    #[test]
    fn test_range_month_end_clamps_without_drift() {
        let months: Vec<_> = range("2022-01-31", "2022-05-31", Step::months(1), None)
            .unwrap()
            .iter()
            .map(|ts| ts.date())
            .collect();
        assert_eq!(
            months,
            vec![
                time::macros::date!(2022-01-31),
                time::macros::date!(2022-02-28),
                time::macros::date!(2022-03-31),
                time::macros::date!(2022-04-30),
                time::macros::date!(2022-05-31),
            ]
        );
    }

    #[test]
    fn test_range_is_restartable() {
        let r = range("2022-01-01", "2022-01-03", Step::days(1), None).unwrap();
        let first: Vec<_> = r.iter().collect();
        let second: Vec<_> = (&r).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_range_stamps_timezone_without_converting() {
        let r = range("2022-01-01", "2022-01-02", Step::days(1), Some(offset!(+2))).unwrap();
        let stamped: Vec<_> = r.iter().collect();
        assert_eq!(stamped[0], datetime!(2022-01-01 00:00 +2));
        assert_eq!(stamped[0].offset(), offset!(+2));
    }

    #[test]
    fn test_range_empty_when_start_after_end() {
        let r = range("2022-01-02", "2022-01-01", Step::days(1), None).unwrap();
        assert_eq!(r.iter().count(), 0);
    }

    #[test]
    fn test_range_rejects_non_advancing_step() {
        for step in [Step::days(0), Step::days(-1), Step::months(-1)] {
            let err = range("2022-01-01", "2022-01-02", step, None).unwrap_err();
            assert!(matches!(err, Error::Contract(ContractError::NonAdvancingStep(_))));
        }
    }
}

/// Property-based tests for parsing and serialization.
///
/// # Running Tests
///
/// ```bash
/// cargo test -p tally-core timestamp::proptests
/// ```
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const CANONICAL: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]+00:00");

    fn any_whole_second() -> impl Strategy<Value = OffsetDateTime> {
        // 1900..2100
        (-2_208_988_800i64..4_102_444_800).prop_map(|secs| {
            OffsetDateTime::from_unix_timestamp(secs).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        })
    }

    proptest! {
        /// Canonical UTC strings survive parse then to_iso unchanged.
        #[test]
        fn canonical_string_round_trips(ts in any_whole_second()) {
            let text = ts.format(CANONICAL).unwrap();
            let parsed = parse(text.as_str()).unwrap();
            prop_assert_eq!(to_iso(parsed, false), text);
        }

        /// Parsing any offset form lands on the same UTC instant.
        #[test]
        fn offset_input_is_converted(ts in any_whole_second(), hours in -12i8..=14) {
            let offset = UtcOffset::from_hms(hours, 0, 0).unwrap();
            let text = ts.to_offset(offset).format(&Rfc3339).unwrap();
            let parsed = parse(text.as_str()).unwrap();
            prop_assert_eq!(parsed, ts);
            prop_assert_eq!(parsed.offset(), UtcOffset::UTC);
        }
    }
}
