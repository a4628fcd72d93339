use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a date's description is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ContextMode {
    /// Text after the date on the same line, else the text before it.
    #[default]
    LineBased,
    /// First configured keyword found within `context_window` characters of the date.
    KeywordWindow,
}

static DEFAULT_KEYWORDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\blab\s+\d+",
        r"(?i)\bmidterm\s+project",
        r"(?i)\bmidterm(?:\s+exam)?",
        r"(?i)\bfinal\s+project(?:\s+due)?",
        r"(?i)\bfinal\s+presentations?(?:\s+due)?",
        r"(?i)\bfinal\s+exam",
        r"(?i)\bquiz\s+\d+",
        r"(?i)\bhomework\s+\d+",
        r"(?i)\bweek\s+\d+",
        r"(?i)\boffice\s+hours",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Extraction settings. Nothing in the engine reads the clock; every "current"
/// value is derived from the reference date handed to [`Config::for_date`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Reference date, used for relative words and assignment countdowns.
    pub today: NaiveDate,
    /// Year filled into dates that omit one.
    pub default_year: i32,
    /// Monday of "Week 1". Falls back to the first Monday on or after January 1
    /// of `default_year`.
    pub semester_start: Option<NaiveDate>,
    pub recurrence_start: NaiveDate,
    pub recurrence_until: NaiveDate,
    /// Start time for events without one.
    pub default_time: NaiveTime,
    pub duration: Duration,
    pub mode: ContextMode,
    /// Characters searched on each side of a date in keyword mode.
    pub context_window: usize,
    pub keywords: Vec<Regex>,
    /// In keyword mode, skip dates with no keyword nearby instead of using the line.
    pub require_keyword: bool,
}

impl Config {
    #[must_use]
    pub fn for_date(today: NaiveDate) -> Self {
        Self {
            today,
            default_year: today.year(),
            semester_start: None,
            recurrence_start: today,
            recurrence_until: NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            default_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            duration: Duration::hours(1),
            mode: ContextMode::default(),
            context_window: 100,
            keywords: DEFAULT_KEYWORDS.clone(),
            require_keyword: false,
        }
    }

    /// Moves the default year and everything derived from it. Recurrences in
    /// another year than the reference date's run from January 1.
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.default_year = year;
        if let Some(until) = NaiveDate::from_ymd_opt(year, 12, 31) {
            self.recurrence_until = until;
        }
        if year != self.today.year() {
            if let Some(start) = NaiveDate::from_ymd_opt(year, 1, 1) {
                self.recurrence_start = start;
            }
        }
        self
    }

    #[must_use]
    pub fn with_semester_start(mut self, start: NaiveDate) -> Self {
        self.semester_start = Some(start);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ContextMode) -> Self {
        self.mode = mode;
        self
    }

    /// Monday of the first semester week.
    #[must_use]
    pub fn semester_base(&self) -> Option<NaiveDate> {
        self.semester_start
            .or_else(|| first_monday_on_or_after(self.default_year, 1, 1))
    }
}

pub(crate) fn first_monday_on_or_after(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let mut date = NaiveDate::from_ymd_opt(year, month, day)?;
    while date.weekday() != chrono::Weekday::Mon {
        date = date.succ_opt()?;
    }
    Some(date)
}
