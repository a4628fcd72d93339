use std::ops::Range;

use regex::Regex;

use crate::matcher::{MONTH, ORDINAL};

/// Finds generic DATE/TIME spans in a line that none of the explicit rules matched.
///
/// Implementations may wrap an entity recognizer; returned ranges are byte ranges
/// into `text` and must fall on character boundaries.
pub trait TemporalEntityDetector {
    fn find_temporal_entities(&self, text: &str) -> Vec<Range<usize>>;
}

impl<F> TemporalEntityDetector for F
where
    F: Fn(&str) -> Vec<Range<usize>>,
{
    fn find_temporal_entities(&self, text: &str) -> Vec<Range<usize>> {
        self(text)
    }
}

/// Regex heuristics for formats the explicit rules leave out: day-first dates,
/// relative days and bare clock times. Adjacent spans joined only by "at", "@" or
/// a comma are merged so "tomorrow at 3pm" comes out as one entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDetector;

fn day_first() -> &'static Regex {
    regex!(&format!(
        r"(?i)\b\d{{1,2}}{ORDINAL}\s+(?:of\s+)?{MONTH}\b\.?(?:,?\s+\d{{4}}\b)?"
    ))
}

fn relative_day() -> &'static Regex {
    regex!(r"(?i)\b(?:today|tonight|tomorrow|yesterday)\b")
}

fn clock_time() -> &'static Regex {
    regex!(r"(?i)\b\d{1,2}(?::\d{2})?\s*[ap]\.?m\b\.?|\b\d{1,2}:\d{2}\b|\b(?:noon|midnight)\b")
}

fn joiner() -> &'static Regex {
    regex!(r"(?i)^\s*(?:,|at|@)?\s*$")
}

impl TemporalEntityDetector for HeuristicDetector {
    fn find_temporal_entities(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = [day_first(), relative_day(), clock_time()]
            .into_iter()
            .flat_map(|regex| regex.find_iter(text).map(|found| found.range()))
            .collect::<Vec<_>>();

        spans.sort_by_key(|span| (span.start, std::cmp::Reverse(span.end)));

        let mut merged: Vec<Range<usize>> = Vec::new();
        for span in spans {
            match merged.last_mut() {
                Some(last) if span.start < last.end => last.end = last.end.max(span.end),
                Some(last) if joiner().is_match(&text[last.end..span.start]) => last.end = span.end,
                _ => merged.push(span),
            }
        }

        merged
    }
}
