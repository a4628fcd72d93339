use std::ops::Range;

use regex::Regex;

use crate::entities::{HeuristicDetector, TemporalEntityDetector};
use crate::{PatternKind, RawMatch};

pub(crate) const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";
pub(crate) const ORDINAL: &str = r"(?:st|nd|rd|th)?";
const TIME: &str = r"(?:\s*,?\s*(?:at\s+|@\s*)?\d{1,2}(?::\d{2})?\s*[ap]\.?m\.?|\s*,?\s*(?:at\s+|@\s*)?\d{1,2}:\d{2})?";
const RANGE_SEPARATOR: &str = r"\s*(?:-|–|—|\bto\b|\bthrough\b)\s*";
const SLASH_DATE: &str = r"\d{1,2}/\d{1,2}(?:/(?:\d{4}|\d{2}))?";

fn explicit_date() -> &'static Regex {
    regex!(&format!(
        r"(?i)\b{MONTH}\.?\s+\d{{1,2}}{ORDINAL}\b(?:,?\s+\d{{4}}\b)?{TIME}"
    ))
}

fn numeric_date() -> &'static Regex {
    regex!(&format!(
        r"(?i)\b(?:\d{{4}}-\d{{1,2}}-\d{{1,2}}|\d{{1,2}}[/-]\d{{1,2}}(?:[/-](?:\d{{4}}|\d{{2}}))?)\b{TIME}"
    ))
}

fn week_reference() -> &'static Regex {
    regex!(r"(?i)\bweek\s+(?:#\s*)?\w+")
}

fn recurring_weekday() -> &'static Regex {
    regex!(r"(?i)\bevery\s+(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b")
}

fn date_range() -> &'static Regex {
    regex!(&format!(
        r"(?i)\b(?:{MONTH}\.?\s+\d{{1,2}}{ORDINAL}{RANGE_SEPARATOR}(?:{MONTH}\.?\s+)?\d{{1,2}}{ORDINAL}\b(?:,?\s+\d{{4}}\b)?|{SLASH_DATE}{RANGE_SEPARATOR}{SLASH_DATE}\b)"
    ))
}

/// A complete numeric date ending right where the text ends.
fn trailing_date() -> &'static Regex {
    regex!(&format!(
        r"(?:{SLASH_DATE}|\d{{1,2}}-\d{{1,2}}-(?:\d{{4}}|\d{{2}})|\d{{4}}-\d{{1,2}}-\d{{1,2}})$"
    ))
}

/// Rules in priority order.
fn rules() -> [(PatternKind, &'static Regex); 5] {
    [
        (PatternKind::ExplicitDate, explicit_date()),
        (PatternKind::NumericDate, numeric_date()),
        (PatternKind::WeekReference, week_reference()),
        (PatternKind::RecurringWeekday, recurring_weekday()),
        (PatternKind::DateRange, date_range()),
    ]
}

/// Scans `text` line by line with the built-in fallback detector.
#[must_use]
pub fn extract_candidate_dates(text: &str) -> Vec<RawMatch> {
    extract_candidate_dates_with(text, &HeuristicDetector)
}

/// Scans `text` line by line. Lines where no explicit rule matches are handed to
/// `detector`. Overlapping matches from different rules are all kept; a range and
/// the dates inside it are sorted out after resolution.
pub fn extract_candidate_dates_with(
    text: &str,
    detector: &dyn TemporalEntityDetector,
) -> Vec<RawMatch> {
    let mut matches = Vec::new();

    for (line_index, (offset, line)) in lines(text).enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let before = matches.len();

        for (kind, regex) in rules() {
            for found in regex.find_iter(line) {
                if kind == PatternKind::NumericDate && is_embedded_number(line, found.range()) {
                    continue;
                }

                matches.push(raw_match(line, offset, line_index, found.range(), kind));
            }
        }

        if matches.len() == before {
            for span in detector.find_temporal_entities(line) {
                if line.get(span.clone()).is_none() {
                    continue;
                }
                tracing::debug!(line = line_index, span = ?span, "fallback temporal entity");
                matches.push(raw_match(
                    line,
                    offset,
                    line_index,
                    span,
                    PatternKind::TemporalEntity,
                ));
            }
        }
    }

    matches
}

/// Lines with the byte offset at which each starts. A trailing `\r` is dropped.
pub(crate) fn lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len() + 1;
        Some((start, line.strip_suffix('\r').unwrap_or(line)))
    })
}

fn raw_match(
    line: &str,
    offset: usize,
    line_index: usize,
    range: Range<usize>,
    kind: PatternKind,
) -> RawMatch {
    RawMatch {
        text: line[range.clone()].to_string(),
        span: offset + range.start..offset + range.end,
        line: line_index,
        kind,
    }
}

/// Rejects fragments of longer numeric runs: `01-15` inside `x-01-15`, `30-3`
/// out of `2:30-3:45`, `9/24-10` out of `9/24-10/30`. Complete dates on either
/// side of a range dash are kept.
fn is_embedded_number(line: &str, range: Range<usize>) -> bool {
    let before = &line[..range.start];
    let preceded = match before.chars().next_back() {
        Some(':' | '.' | '/') => true,
        Some('-') => !trailing_date().is_match(&before[..before.len() - 1]),
        _ => false,
    };

    let mut rest = line[range.end..].chars();
    let followed = match (rest.next(), rest.next()) {
        (Some(':' | '.' | '/'), Some(next)) => next.is_ascii_digit(),
        (Some('-'), Some(next)) => next.is_ascii_digit() && !line[range].contains('/'),
        _ => false,
    };

    preceded || followed
}
