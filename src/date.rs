//! Normalizes the assorted date shapes found in front matter into a single
//! comparable UTC instant. See [`normalize`] for the rules.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_yaml::Value;
use std::fmt;
use tracing::warn;

/// A date as it was written by an author, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum RawDate {
    /// A string which should hold an ISO-8601 timestamp or a bare
    /// `YYYY-MM-DD` date.
    Text(String),

    /// A calendar date with no time of day.
    Date(NaiveDate),

    /// A date and time with no offset.
    DateTime(NaiveDateTime),

    /// A date and time with an explicit offset.
    Zoned(DateTime<FixedOffset>),

    /// Any other front-matter value. Holds the name of the value's kind for
    /// error reporting.
    Unsupported(&'static str),
}

impl From<&Value> for RawDate {
    /// Converts a front-matter value into a [`RawDate`]. Only strings can
    /// carry dates; YAML 1.2 has no native timestamp type.
    fn from(value: &Value) -> RawDate {
        match value {
            Value::String(s) => RawDate::Text(s.clone()),
            Value::Tagged(tagged) => RawDate::from(&tagged.value),
            Value::Null => RawDate::Unsupported("null"),
            Value::Bool(_) => RawDate::Unsupported("boolean"),
            Value::Number(_) => RawDate::Unsupported("number"),
            Value::Sequence(_) => RawDate::Unsupported("sequence"),
            Value::Mapping(_) => RawDate::Unsupported("mapping"),
        }
    }
}

impl fmt::Display for RawDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RawDate::Text(s) => write!(f, "{:?}", s),
            RawDate::Date(d) => write!(f, "{}", d),
            RawDate::DateTime(dt) => write!(f, "{}", dt),
            RawDate::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            RawDate::Unsupported(kind) => write!(f, "<{}>", kind),
        }
    }
}

/// Converts `raw` into a UTC instant.
///
/// 1. A date without a time of day means midnight of that date.
/// 2. A value without an offset is read in `default_tz`, the author's zone.
/// 3. A value with an offset keeps it (`Z` is the same as `+00:00`).
/// 4. The result is converted to UTC.
///
/// Strings must be full ISO-8601 (date, optional time, optional offset) or a
/// bare `YYYY-MM-DD`. Anything else is a [`NotADate`], which is logged.
pub fn normalize(raw: &RawDate, default_tz: FixedOffset) -> Result<DateTime<Utc>, NotADate> {
    let result = match raw {
        RawDate::Text(s) => match parse_text(s) {
            Ok(Parsed::Zoned(dt)) => Ok(dt.with_timezone(&Utc)),
            Ok(Parsed::Naive(naive)) => attach(naive, default_tz),
            Err(reason) => Err(reason),
        },
        RawDate::Date(d) => attach(d.and_time(NaiveTime::MIN), default_tz),
        RawDate::DateTime(naive) => attach(*naive, default_tz),
        RawDate::Zoned(dt) => Ok(dt.with_timezone(&Utc)),
        RawDate::Unsupported(kind) => Err(Reason::Unsupported(kind)),
    };

    result.map_err(|reason| {
        warn!(value = %raw, %reason, "rejected date value");
        NotADate {
            value: raw.to_string(),
            reason,
        }
    })
}

fn attach(naive: NaiveDateTime, tz: FixedOffset) -> Result<DateTime<Utc>, Reason> {
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(Reason::OutOfRange)
}

enum Parsed {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    // Offsets with the minutes left off, e.g. `+08`.
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_text(raw: &str) -> Result<Parsed, Reason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Reason::Empty);
    }

    let input = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{}+00:00", rest),
        None => trimmed.to_owned(),
    };
    let input = with_minutes(input);

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&input, format) {
            return Ok(Parsed::Zoned(dt));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&input, format) {
            return Ok(Parsed::Naive(naive));
        }
    }
    match NaiveDate::parse_from_str(&input, DATE_FORMAT) {
        Ok(date) => Ok(Parsed::Naive(date.and_time(NaiveTime::MIN))),
        Err(_) => Err(Reason::Unrecognized),
    }
}

// chrono needs minutes to build a time, so an hour-only time such as
// `2025-01-10T08` or `2025-01-10T08+08` gets `:00` after the hour.
fn with_minutes(mut input: String) -> String {
    let bytes = input.as_bytes();
    let hour_only = bytes.len() >= 13
        && matches!(bytes[10], b'T' | b't' | b' ')
        && bytes[11].is_ascii_digit()
        && bytes[12].is_ascii_digit()
        && matches!(bytes.get(13), None | Some(b'+') | Some(b'-'));
    if hour_only {
        input.insert_str(13, ":00");
    }
    input
}

/// Why a value could not be normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reason {
    /// The string was blank.
    Empty,

    /// The string was neither ISO-8601 nor `YYYY-MM-DD`.
    Unrecognized,

    /// The value wasn't a string or a date.
    Unsupported(&'static str),

    /// The date couldn't be placed in the author's zone.
    OutOfRange,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reason::Empty => write!(f, "empty string"),
            Reason::Unrecognized => {
                write!(f, "expected ISO-8601 or YYYY-MM-DD")
            }
            Reason::Unsupported(kind) => write!(f, "unsupported {} value", kind),
            Reason::OutOfRange => write!(f, "date out of range"),
        }
    }
}

/// Returned when a value can't be normalized into an instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotADate {
    /// The offending value as written.
    pub value: String,

    /// Why it was rejected.
    pub reason: Reason,
}

impl fmt::Display for NotADate {
    /// Displays a [`NotADate`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} is not a date: {}", self.value, self.reason)
    }
}

impl std::error::Error for NotADate {}
