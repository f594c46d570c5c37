//! Time ranges written as `start; stop; step; timezone`.
//!
//! Any item may be omitted or left empty, in which case the range defaults to
//! today in ten minute steps:
//!
//! ```
//! use azely::time::Time;
//! use regex::Regex;
//! let separator = Regex::new(r"\s*;\s*").unwrap();
//! let time = Time::from_query(";;5min", &separator).unwrap();
//! assert_eq!(time.start, "00:00 today");
//! assert_eq!(time.step, "5min");
//! ```
//!
//! Dates are read as wall-clock times in the range's timezone. When the range
//! names none, the timezone of the observer's location is used, and UTC when
//! that is unknown too.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{Entity, EntityKind};

pub const DEFAULT_START: &str = "00:00 today";
pub const DEFAULT_STOP: &str = "00:00 tomorrow";
pub const DEFAULT_STEP: &str = "10min";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

lazy_static! {
    static ref DAY_WORD: Regex =
        Regex::new(r"(?i)^(?:(\d{1,2}):(\d{2})(?::(\d{2}))?\s+)?(today|tomorrow|yesterday)$").unwrap();
    static ref STEP: Regex = Regex::new(r"^(\d+)\s*(s|sec|min|T|h|H|D|d|day)$").unwrap();
    static ref OFFSET: Regex = Regex::new(r"^([+-])(\d{2}):(\d{2})$").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeError {
    #[error("unrecognized date expression {0:?}")]
    Expression(String),
    #[error("unrecognized step {0:?}")]
    Step(String),
    #[error("unknown timezone {0:?}")]
    Timezone(String),
    #[error("expected at most 4 items (start, stop, step, timezone), got {0}")]
    TooManyItems(usize),
}

/// A time range. The expressions are kept as written so that relative ones
/// (`now`, `00:00 today`) are evaluated when the range is expanded, not when
/// it was cached. An empty timezone means "the timezone of the location".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub start: String,
    pub stop: String,
    pub step: String,
    #[serde(default)]
    pub timezone: String,
}

impl Entity for Time {
    const KIND: EntityKind = EntityKind::Time;
}

impl Default for Time {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_owned(),
            stop: DEFAULT_STOP.to_owned(),
            step: DEFAULT_STEP.to_owned(),
            timezone: String::new(),
        }
    }
}

impl Time {
    /// Splits a query into its items, fills in defaults and validates every
    /// item without evaluating the dates.
    pub fn from_query(query: &str, separator: &Regex) -> Result<Self, TimeError> {
        let items: Vec<&str> = separator.split(query.trim()).map(str::trim).collect();
        if items.len() > 4 {
            return Err(TimeError::TooManyItems(items.len()));
        }
        let item = |i: usize, default: &str| -> String {
            match items.get(i) {
                Some(s) if !s.is_empty() => (*s).to_owned(),
                _ => default.to_owned(),
            }
        };
        let time = Self {
            start: item(0, DEFAULT_START),
            stop: item(1, DEFAULT_STOP),
            step: item(2, DEFAULT_STEP),
            timezone: item(3, ""),
        };
        // any instant will do for a syntax check
        let reference = NaiveDateTime::default();
        parse_datetime(&time.start, reference)?;
        parse_datetime(&time.stop, reference)?;
        parse_step(&time.step)?;
        if !time.timezone.is_empty() {
            Zone::parse(&time.timezone)?;
        }
        Ok(time)
    }

    /// The zone the range is read in: its own timezone, else `fallback`
    /// (usually the location's), else UTC.
    pub fn zone(&self, fallback: &str) -> Result<Zone, TimeError> {
        match (self.timezone.as_str(), fallback) {
            ("", "") => Ok(Zone::Named(Tz::UTC)),
            ("", name) | (name, _) => Zone::parse(name),
        }
    }

    /// Expands the range into instants from start (inclusive) to stop
    /// (exclusive). Relative expressions are evaluated against `now` on the
    /// wall clock of [`Time::zone`]; steps are taken in absolute time.
    pub fn index(&self, now: DateTime<Utc>, fallback: &str) -> Result<Vec<DateTime<FixedOffset>>, TimeError> {
        let zone = self.zone(fallback)?;
        let local_now = zone.at(now.naive_utc()).naive_local();
        let instant = |expression: &str| -> Result<NaiveDateTime, TimeError> {
            let local = parse_datetime(expression, local_now)?;
            zone.localize(local)
                .map(|t| t.naive_utc())
                .ok_or_else(|| TimeError::Expression(expression.to_owned()))
        };
        let start = instant(&self.start)?;
        let stop = instant(&self.stop)?;
        let step = parse_step(&self.step)?;
        let mut instants = Vec::new();
        let mut current = start;
        while current < stop {
            instants.push(zone.at(current));
            match current.checked_add_signed(step) {
                Some(next) => current = next,
                // past the last representable instant, so past stop as well
                None => break,
            }
        }
        Ok(instants)
    }
}

/// A timezone given either by IANA name or as a fixed `±HH:MM` offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Zone {
    pub fn parse(name: &str) -> Result<Self, TimeError> {
        let unknown = || TimeError::Timezone(name.to_owned());
        if let Some(captures) = OFFSET.captures(name) {
            let hours: i32 = captures[2].parse().map_err(|_| unknown())?;
            let minutes: i32 = captures[3].parse().map_err(|_| unknown())?;
            let seconds = (hours * 3600 + minutes * 60) * if &captures[1] == "-" { -1 } else { 1 };
            return FixedOffset::east_opt(seconds).map(Zone::Fixed).ok_or_else(unknown);
        }
        name.parse::<Tz>().map(Zone::Named).map_err(|_| unknown())
    }

    /// The UTC instant `utc` on this zone's clock.
    pub fn at(&self, utc: NaiveDateTime) -> DateTime<FixedOffset> {
        let offset = match self {
            Zone::Named(tz) => tz.offset_from_utc_datetime(&utc).fix(),
            Zone::Fixed(offset) => *offset,
        };
        offset.from_utc_datetime(&utc)
    }

    /// Attaches this zone to a wall-clock time. Ambiguous times take the
    /// earlier instant; times skipped by a DST change take the offset in
    /// force after it.
    pub fn localize(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        let offset_at = |local: &NaiveDateTime| match self {
            Zone::Named(tz) => tz.offset_from_local_datetime(local).earliest().map(|o| o.fix()),
            Zone::Fixed(offset) => Some(*offset),
        };
        let offset = offset_at(&local).or_else(|| offset_at(&local.checked_add_signed(Duration::hours(1))?))?;
        offset.from_local_datetime(&local).single()
    }
}

pub fn parse_datetime(expression: &str, now: NaiveDateTime) -> Result<NaiveDateTime, TimeError> {
    let expression = expression.trim();
    if expression.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Some(captures) = DAY_WORD.captures(expression) {
        let number = |i: usize| captures.get(i).map_or(Ok(0), |m| m.as_str().parse::<u32>());
        let (hour, minute, second) = match (number(1), number(2), number(3)) {
            (Ok(h), Ok(m), Ok(s)) => (h, m, s),
            _ => return Err(TimeError::Expression(expression.to_owned())),
        };
        let days = match captures[4].to_ascii_lowercase().as_str() {
            "tomorrow" => 1,
            "yesterday" => -1,
            _ => 0,
        };
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| TimeError::Expression(expression.to_owned()))?;
        let date = now
            .date()
            .checked_add_signed(Duration::days(days))
            .ok_or_else(|| TimeError::Expression(expression.to_owned()))?;
        return Ok(date.and_time(time));
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(expression, format) {
            return Ok(datetime);
        }
    }
    NaiveDate::parse_from_str(expression, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| TimeError::Expression(expression.to_owned()))
}

pub fn parse_step(step: &str) -> Result<Duration, TimeError> {
    let error = || TimeError::Step(step.to_owned());
    let captures = STEP.captures(step.trim()).ok_or_else(error)?;
    let count: i64 = captures[1].parse().map_err(|_| error())?;
    if count == 0 {
        return Err(error());
    }
    let duration = match &captures[2] {
        "s" | "sec" => Duration::try_seconds(count),
        "min" | "T" => Duration::try_minutes(count),
        "h" | "H" => Duration::try_hours(count),
        _ => Duration::try_days(count),
    };
    duration.ok_or_else(error)
}
