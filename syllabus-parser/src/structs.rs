use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which pattern rule produced a [`RawMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PatternKind {
    ExplicitDate,
    NumericDate,
    WeekReference,
    RecurringWeekday,
    DateRange,
    TemporalEntity,
}

/// A date-like substring located in the scanned text, before any resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub text: String,
    /// Byte range into the scanned text.
    pub span: Range<usize>,
    /// Zero-based line index.
    pub line: usize,
    pub kind: PatternKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecurrencePattern {
    pub weekday: Weekday,
    pub start: NaiveDate,
    pub until: NaiveDate,
}

impl RecurrencePattern {
    /// First date in the window that falls on `weekday`.
    #[must_use]
    pub fn first_occurrence(&self) -> Option<NaiveDate> {
        let offset = (7 + self.weekday.num_days_from_monday()
            - self.start.weekday().num_days_from_monday())
            % 7;
        let first = self
            .start
            .checked_add_signed(Duration::try_days(i64::from(offset))?)?;

        (first <= self.until).then_some(first)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "type", rename_all = "snake_case")
)]
pub enum ResolvedDate {
    Concrete {
        date: NaiveDate,
        time: Option<NaiveTime>,
    },
    Recurring(RecurrencePattern),
}

impl ResolvedDate {
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self::Concrete { date, time: None }
    }

    /// Chronological ordering key. Untimed dates sort before timed ones on the same day.
    #[must_use]
    pub fn sort_key(&self) -> (NaiveDate, Option<NaiveTime>) {
        match self {
            Self::Concrete { date, time } => (*date, *time),
            Self::Recurring(pattern) => (
                pattern.first_occurrence().unwrap_or(pattern.start),
                None,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyllabusEvent {
    pub date: ResolvedDate,
    pub description: String,
    pub original_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CourseInfo {
    pub title: Option<String>,
    pub instructor: Option<String>,
}

/// A match that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Warning {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Extraction {
    pub events: Vec<SyllabusEvent>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RecurrenceRule {
    pub weekday: Weekday,
    pub until: DateTime<Utc>,
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = match self.weekday {
            Weekday::Mon => "MO",
            Weekday::Tue => "TU",
            Weekday::Wed => "WE",
            Weekday::Thu => "TH",
            Weekday::Fri => "FR",
            Weekday::Sat => "SA",
            Weekday::Sun => "SU",
        };

        write!(
            f,
            "FREQ=WEEKLY;BYDAY={day};UNTIL={}",
            self.until.format("%Y%m%dT%H%M%SZ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CalendarEvent {
    pub uid: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub summary: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub recurrence: Option<RecurrenceRule>,
}
