use std::ops::Range;

use crate::context::line_bounds;
use crate::error::{Error, Result};
use crate::{
    associate_context, dedup_and_sort, extract_candidate_dates_with, resolve, Config,
    ContextMode, Extraction, HeuristicDetector, PatternKind, RawMatch, SyllabusEvent,
    TemporalEntityDetector, Warning,
};

fn academic_calendar() -> &'static regex::Regex {
    regex!(r"(?is)academic\s+calendar(.*?)(?:\n[ \t]*\r?\n|\z)")
}

/// Runs the whole extraction over `text` and fails when nothing usable is found.
pub fn parse_syllabus(text: &str, config: &Config) -> Result<Extraction> {
    non_empty(extract_events(text, config, &HeuristicDetector))
}

/// Scans the "Academic Calendar" section, or the whole text when there is none,
/// describing each date by the nearest keyword.
///
/// Warning line numbers count from the start of the scanned section.
pub fn important_dates(text: &str, config: &Config) -> Result<Extraction> {
    let section = academic_calendar()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |section| section.as_str());

    if section.len() != text.len() {
        tracing::debug!(bytes = section.len(), "scanning academic calendar section");
    }

    let config = config.clone().with_mode(ContextMode::KeywordWindow);
    non_empty(extract_events(section, &config, &HeuristicDetector))
}

/// Matches, resolves and describes every date in `text`.
///
/// A resolved range stands for the dates written inside it, so matches that
/// overlap it are dropped. Matches that cannot be resolved, or that lack a
/// required keyword, are reported as warnings and skipped. The surviving events
/// are deduplicated and sorted.
pub fn extract_events(
    text: &str,
    config: &Config,
    detector: &dyn TemporalEntityDetector,
) -> Extraction {
    let mut warnings = Vec::new();
    let mut events = Vec::new();

    let resolved = extract_candidate_dates_with(text, detector)
        .into_iter()
        .map(|raw| {
            let date = resolve(&raw, config);
            (raw, date)
        })
        .collect::<Vec<_>>();

    let ranges = resolved
        .iter()
        .filter(|(raw, date)| raw.kind == PatternKind::DateRange && date.is_ok())
        .map(|(raw, _)| raw.span.clone())
        .collect::<Vec<_>>();

    for (raw, date) in resolved {
        let inside_range = ranges.iter().any(|range| overlaps(range, &raw.span));
        if raw.kind != PatternKind::DateRange && inside_range {
            tracing::debug!(line = raw.line, text = %raw.text, "date is part of a range");
            continue;
        }

        let date = match date {
            Ok(date) => date,
            Err(error) => {
                tracing::warn!(line = raw.line, "{error}");
                warnings.push(warning(&raw, error));
                continue;
            }
        };

        let Some(description) = describe(text, &raw, config) else {
            tracing::warn!(line = raw.line, text = %raw.text, "no keyword near date");
            warnings.push(Warning {
                line: raw.line,
                text: raw.text,
                reason: "no keyword near date".to_string(),
            });
            continue;
        };

        let line = line_bounds(text, raw.span.clone());
        events.push(SyllabusEvent {
            date,
            description,
            original_text: text[line].trim().to_string(),
        });
    }

    let events = dedup_and_sort(events);
    tracing::debug!(events = events.len(), skipped = warnings.len(), "extraction finished");

    Extraction { events, warnings }
}

fn overlaps(range: &Range<usize>, span: &Range<usize>) -> bool {
    span.start < range.end && range.start < span.end
}

fn describe(text: &str, raw: &RawMatch, config: &Config) -> Option<String> {
    if config.mode == ContextMode::KeywordWindow {
        let keyword = associate_context(
            text,
            raw.span.clone(),
            ContextMode::KeywordWindow,
            &config.keywords,
            config.context_window,
        );

        if keyword.is_some() {
            return keyword;
        }
        if config.require_keyword {
            return None;
        }
    }

    // A bare date still gets a description: its own text.
    Some(
        associate_context(text, raw.span.clone(), ContextMode::LineBased, &[], 0)
            .unwrap_or_else(|| raw.text.trim().to_string()),
    )
}

fn warning(raw: &RawMatch, error: Error) -> Warning {
    let reason = match error {
        Error::UnresolvableDate { reason, .. } => reason,
        other => other.to_string(),
    };

    Warning {
        line: raw.line,
        text: raw.text.clone(),
        reason,
    }
}

fn non_empty(extraction: Extraction) -> Result<Extraction> {
    if extraction.events.is_empty() {
        Err(Error::EmptyExtractionResult)
    } else {
        Ok(extraction)
    }
}
