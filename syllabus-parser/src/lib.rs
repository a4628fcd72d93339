macro_rules! regex {
    ($pattern:expr) => {{
        static REGEX: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pattern).unwrap());
        &REGEX
    }};
}

mod assemble;
mod assignments;
mod config;
mod context;
mod dedup;
mod entities;
mod error;
mod matcher;
mod parser;
mod resolver;
mod structs;

#[cfg(feature = "ics")]
mod ics;

pub use assemble::{build_events, parse_timezone};
pub use assignments::{extract_assignments, Assignment};
pub use config::{Config, ContextMode};
pub use context::associate_context;
pub use dedup::dedup_and_sort;
pub use entities::{HeuristicDetector, TemporalEntityDetector};
pub use error::{Error, Result};
pub use matcher::{extract_candidate_dates, extract_candidate_dates_with};
pub use parser::{extract_events, important_dates, parse_syllabus};
pub use resolver::resolve;
pub use structs::{
    CalendarEvent, CourseInfo, Extraction, PatternKind, RawMatch, RecurrencePattern,
    RecurrenceRule, ResolvedDate, SyllabusEvent, Warning,
};

#[cfg(feature = "ics")]
pub use self::ics::{render, to_ics};
