//! RFC 5545 recurrence rules and their expansion into concrete occurrences.
//!
//! Only the subset used by events and tasks is supported: `FREQ`
//! (`DAILY`, `WEEKLY`, `MONTHLY`, `YEARLY`), `INTERVAL`, and one end
//! condition among `COUNT` and `UNTIL`. `WKST` is accepted and ignored since
//! no `BYDAY` expansion is performed. Anything else is rejected while parsing,
//! never silently dropped.
//!
//! Expansion is a pure projection: [`expand`] returns a lazy iterator bounded
//! by a [`DateWindow`], so a rule without an end condition can never be
//! iterated forever.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use engine::recurrence::{DateWindow, RecurrenceBase, RecurrenceRule, expand};
//!
//! let rule: RecurrenceRule = "FREQ=WEEKLY;INTERVAL=2".parse().unwrap();
//! let window = DateWindow::new(
//!     Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
//! )
//! .unwrap();
//! let base = RecurrenceBase::Event {
//!     start_at: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
//!     end_at: Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
//! };
//! // Jan 6 and Jan 20; Feb 3 falls outside the window.
//! assert_eq!(expand(&rule, window, base).count(), 2);
//! ```

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing a rule or building a window.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("recurrence rule is empty")]
    Empty,
    #[error("malformed rule part '{0}', expected KEY=VALUE")]
    MalformedPart(String),
    #[error("unsupported rule part '{0}'")]
    UnsupportedPart(String),
    #[error("duplicate rule part '{0}'")]
    DuplicatePart(String),
    #[error("rule has no FREQ part")]
    MissingFrequency,
    #[error("invalid FREQ '{0}', expected DAILY, WEEKLY, MONTHLY or YEARLY")]
    InvalidFrequency(String),
    #[error("invalid {part} value '{value}'")]
    InvalidValue { part: &'static str, value: String },
    #[error("COUNT and UNTIL cannot both be set")]
    CountAndUntil,
    #[error("window start {start} must be before window end {end}")]
    EmptyWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Start of the occurrence `steps` units after `base`.
    fn nth(self, base: DateTime<Utc>, steps: u64) -> Candidate {
        let naive = base.naive_utc();
        match self {
            Self::Daily => shift_days(naive, steps),
            Self::Weekly => steps.checked_mul(7).map_or(Candidate::OutOfRange, |days| {
                shift_days(naive, days)
            }),
            Self::Monthly => shift_months(naive, steps),
            Self::Yearly => steps
                .checked_mul(12)
                .map_or(Candidate::OutOfRange, |months| shift_months(naive, months)),
        }
    }
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            other => Err(RecurrenceError::InvalidFrequency(other.to_string())),
        }
    }
}

/// When a series stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecurrenceEnd {
    Never,
    /// After this many occurrences, the base one included.
    After(u32),
    /// Inclusive upper bound on occurrence start.
    Until(DateTime<Utc>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub end: RecurrenceEnd,
}

impl RecurrenceRule {
    #[must_use]
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            end: RecurrenceEnd::Never,
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .get(..6)
            .filter(|prefix| prefix.eq_ignore_ascii_case("RRULE:"))
            .map_or(trimmed, |_| &trimmed[6..]);
        if body.trim().is_empty() {
            return Err(RecurrenceError::Empty);
        }

        let mut frequency = None;
        let mut interval = None;
        let mut count = None;
        let mut until = None;
        let mut wkst = false;

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .filter(|(k, v)| !k.trim().is_empty() && !v.trim().is_empty())
                .ok_or_else(|| RecurrenceError::MalformedPart(part.to_string()))?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim().to_ascii_uppercase();

            match key.as_str() {
                "FREQ" => set_once(&mut frequency, &key, value.parse::<Frequency>()?)?,
                "INTERVAL" => {
                    let parsed = parse_positive(&value, "INTERVAL")?;
                    set_once(&mut interval, &key, parsed)?;
                }
                "COUNT" => {
                    let parsed = parse_positive(&value, "COUNT")?;
                    set_once(&mut count, &key, parsed)?;
                }
                "UNTIL" => set_once(&mut until, &key, parse_until(&value)?)?,
                "WKST" => {
                    if wkst {
                        return Err(RecurrenceError::DuplicatePart(key));
                    }
                    if !["MO", "TU", "WE", "TH", "FR", "SA", "SU"].contains(&value.as_str()) {
                        return Err(RecurrenceError::InvalidValue {
                            part: "WKST",
                            value,
                        });
                    }
                    wkst = true;
                }
                _ => return Err(RecurrenceError::UnsupportedPart(part.to_string())),
            }
        }

        let frequency = frequency.ok_or(RecurrenceError::MissingFrequency)?;
        let end = match (count, until) {
            (Some(_), Some(_)) => return Err(RecurrenceError::CountAndUntil),
            (Some(count), None) => RecurrenceEnd::After(count),
            (None, Some(until)) => RecurrenceEnd::Until(until),
            (None, None) => RecurrenceEnd::Never,
        };

        Ok(Self {
            frequency,
            interval: interval.unwrap_or(1),
            end,
        })
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency.as_str())?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        match self.end {
            RecurrenceEnd::Never => Ok(()),
            RecurrenceEnd::After(count) => write!(f, ";COUNT={count}"),
            RecurrenceEnd::Until(until) => write!(f, ";UNTIL={}", until.format("%Y%m%dT%H%M%SZ")),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<(), RecurrenceError> {
    if slot.is_some() {
        return Err(RecurrenceError::DuplicatePart(key.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_positive(value: &str, part: &'static str) -> Result<u32, RecurrenceError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| RecurrenceError::InvalidValue {
            part,
            value: value.to_string(),
        })
}

/// `YYYYMMDD` (inclusive through the end of that day) or `YYYYMMDDTHHMMSS[Z]`.
fn parse_until(value: &str) -> Result<DateTime<Utc>, RecurrenceError> {
    let invalid = || RecurrenceError::InvalidValue {
        part: "UNTIL",
        value: value.to_string(),
    };

    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| invalid())?;
        let end_of_day = date.and_hms_opt(23, 59, 59).ok_or_else(invalid)?;
        return Ok(Utc.from_utc_datetime(&end_of_day));
    }

    let stamp = value.strip_suffix('Z').unwrap_or(value);
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
    Ok(Utc.from_utc_datetime(&naive))
}

enum Candidate {
    At(DateTime<Utc>),
    /// The step lands on a date that does not exist (e.g. the 31st of April).
    Skip,
    OutOfRange,
}

fn shift_days(base: NaiveDateTime, days: u64) -> Candidate {
    let Ok(days) = i64::try_from(days) else {
        return Candidate::OutOfRange;
    };
    Duration::try_days(days)
        .and_then(|delta| base.checked_add_signed(delta))
        .map_or(Candidate::OutOfRange, |dt| Candidate::At(Utc.from_utc_datetime(&dt)))
}

fn shift_months(base: NaiveDateTime, months: u64) -> Candidate {
    let Ok(months) = i64::try_from(months) else {
        return Candidate::OutOfRange;
    };
    let index = i64::from(base.year()) * 12 + i64::from(base.month0()) + months;
    let Ok(year) = i32::try_from(index.div_euclid(12)) else {
        return Candidate::OutOfRange;
    };
    let month = u32::try_from(index.rem_euclid(12)).unwrap_or(0) + 1;
    if year > 9999 {
        return Candidate::OutOfRange;
    }
    match NaiveDate::from_ymd_opt(year, month, base.day()) {
        Some(date) => Candidate::At(Utc.from_utc_datetime(&date.and_time(base.time()))),
        None => Candidate::Skip,
    }
}

/// Half-open window `[start, end)` that bounds an expansion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RecurrenceError> {
        if start >= end {
            return Err(RecurrenceError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window covering whole days from `start` (inclusive) to `end` (exclusive), UTC.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, RecurrenceError> {
        Self::new(
            Utc.from_utc_datetime(&start.and_time(chrono::NaiveTime::MIN)),
            Utc.from_utc_datetime(&end.and_time(chrono::NaiveTime::MIN)),
        )
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// The stored item a series is projected from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecurrenceBase {
    /// Duration based: every occurrence keeps `end_at - start_at`.
    Event {
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    },
    /// Due date based: every occurrence keeps `due_at - start_at`.
    Task {
        start_at: DateTime<Utc>,
        due_at: Option<DateTime<Utc>>,
    },
}

impl RecurrenceBase {
    #[must_use]
    pub fn start_at(&self) -> DateTime<Utc> {
        match self {
            Self::Event { start_at, .. } | Self::Task { start_at, .. } => *start_at,
        }
    }

    /// Timing of the occurrence starting at `start_at`, `None` when shifting
    /// the base end or due time leaves the representable range.
    fn timing(&self, start_at: DateTime<Utc>) -> Option<OccurrenceTiming> {
        match *self {
            Self::Event {
                start_at: base,
                end_at,
            } => start_at
                .checked_add_signed(end_at - base)
                .map(OccurrenceTiming::Ends),
            Self::Task { due_at: None, .. } => Some(OccurrenceTiming::Due(None)),
            Self::Task {
                start_at: base,
                due_at: Some(due),
            } => start_at
                .checked_add_signed(due - base)
                .map(|due_at| OccurrenceTiming::Due(Some(due_at))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceTiming {
    Ends(DateTime<Utc>),
    Due(Option<DateTime<Utc>>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Position in the series, the base occurrence being 0.
    pub index: u32,
    pub start_at: DateTime<Utc>,
    pub timing: OccurrenceTiming,
}

impl Occurrence {
    #[must_use]
    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        match self.timing {
            OccurrenceTiming::Ends(end_at) => Some(end_at),
            OccurrenceTiming::Due(_) => None,
        }
    }

    #[must_use]
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        match self.timing {
            OccurrenceTiming::Due(due_at) => due_at,
            OccurrenceTiming::Ends(_) => None,
        }
    }
}

/// Lazy iterator over the occurrences of a series inside a window.
#[derive(Clone, Debug)]
pub struct Occurrences {
    rule: RecurrenceRule,
    window: DateWindow,
    base: RecurrenceBase,
    step: u64,
    produced: u32,
    done: bool,
}

impl Iterator for Occurrences {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let steps = self.step * u64::from(self.rule.interval);
            self.step += 1;

            let start_at = match self.rule.frequency.nth(self.base.start_at(), steps) {
                Candidate::At(start_at) => start_at,
                Candidate::Skip => continue,
                Candidate::OutOfRange => {
                    self.done = true;
                    break;
                }
            };

            match self.rule.end {
                RecurrenceEnd::After(count) if self.produced >= count => {
                    self.done = true;
                    break;
                }
                RecurrenceEnd::Until(until) if start_at > until => {
                    self.done = true;
                    break;
                }
                _ => {}
            }

            let index = self.produced;
            self.produced += 1;

            if start_at >= self.window.end {
                self.done = true;
                break;
            }
            if start_at < self.window.start {
                continue;
            }

            // Later starts only move further out of range.
            let Some(timing) = self.base.timing(start_at) else {
                self.done = true;
                break;
            };
            return Some(Occurrence {
                index,
                start_at,
                timing,
            });
        }
        None
    }
}

/// Expands `rule` starting at `base` into the occurrences that start inside `window`.
#[must_use]
pub fn expand(rule: &RecurrenceRule, window: DateWindow, base: RecurrenceBase) -> Occurrences {
    Occurrences {
        rule: *rule,
        window,
        base,
        step: 0,
        produced: 0,
        done: false,
    }
}

/// Parses `rule` and expands it, see [`expand`].
pub fn expand_str(
    rule: &str,
    window: DateWindow,
    base: RecurrenceBase,
) -> Result<Occurrences, RecurrenceError> {
    let rule: RecurrenceRule = rule.parse()?;
    Ok(expand(&rule, window, base))
}
