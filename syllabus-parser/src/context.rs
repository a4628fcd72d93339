use std::ops::Range;

use regex::Regex;

use crate::ContextMode;

const SEPARATORS: &[char] = &['-', '–', '—', ':', '|', ',', '.', ';'];

/// Chooses a description for the date at `span` in `text`.
///
/// Line mode returns the rest of the line after the date, or the part before it
/// when nothing follows. Keyword mode returns the match of any of `keywords`
/// nearest to the date within `window` characters either side of it, earlier
/// keywords winning ties. `None` means nothing usable was found; callers decide
/// whether to fall back or skip.
#[must_use]
pub fn associate_context(
    text: &str,
    span: Range<usize>,
    mode: ContextMode,
    keywords: &[Regex],
    window: usize,
) -> Option<String> {
    match mode {
        ContextMode::LineBased => line_context(text, span),
        ContextMode::KeywordWindow => keyword_context(text, span, keywords, window),
    }
}

fn line_context(text: &str, span: Range<usize>) -> Option<String> {
    let line = line_bounds(text, span.clone());

    let after = text[span.end..line.end]
        .trim_start_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .trim_end();
    if !after.is_empty() {
        return Some(after.to_string());
    }

    let before = text[line.start..span.start]
        .trim_end_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .trim_start();
    (!before.is_empty()).then(|| before.to_string())
}

fn keyword_context(text: &str, span: Range<usize>, keywords: &[Regex], window: usize) -> Option<String> {
    let start = text[..span.start]
        .char_indices()
        .rev()
        .take(window)
        .last()
        .map_or(span.start, |(index, _)| index);

    let end = text[span.end..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(index, _)| span.end + index);

    let region = &text[start..end];
    let date = span.start - start..span.end - start;

    keywords
        .iter()
        .flat_map(|keyword| keyword.find_iter(region))
        .min_by_key(|found| distance(found.range(), &date))
        .map(|found| found.as_str().trim().to_string())
}

fn distance(found: Range<usize>, date: &Range<usize>) -> usize {
    if found.end <= date.start {
        date.start - found.end
    } else {
        found.start.saturating_sub(date.end)
    }
}

/// Byte range of the line holding `span`, without its line terminator.
pub(crate) fn line_bounds(text: &str, span: Range<usize>) -> Range<usize> {
    let start = text[..span.start].rfind('\n').map_or(0, |index| index + 1);
    let end = text[span.end..]
        .find('\n')
        .map_or(text.len(), |index| span.end + index);

    let end = if text[start..end].ends_with('\r') { end - 1 } else { end };
    start..end.max(span.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<Regex> {
        vec![
            Regex::new(r"(?i)\blab\s+\d+").unwrap(),
            Regex::new(r"(?i)\bmidterm\s+project").unwrap(),
            Regex::new(r"(?i)\boffice\s+hours").unwrap(),
        ]
    }

    fn span_of(text: &str, needle: &str) -> Range<usize> {
        let start = text.find(needle).unwrap();
        start..start + needle.len()
    }

    #[test]
    fn text_after_date() {
        let text = "Intro\nJan 15, 2024 - Syllabus Overview\nWeek 2";
        let span = span_of(text, "Jan 15, 2024");
        assert_eq!(
            associate_context(text, span, ContextMode::LineBased, &[], 100).as_deref(),
            Some("Syllabus Overview")
        );
    }

    #[test]
    fn falls_back_to_text_before_date() {
        let text = "Midterm exam: 10/15/2024\r\nnext";
        let span = span_of(text, "10/15/2024");
        assert_eq!(
            associate_context(text, span, ContextMode::LineBased, &[], 100).as_deref(),
            Some("Midterm exam")
        );
    }

    #[test]
    fn bare_date_has_no_line_context() {
        let text = "header\n  March 3  \nfooter";
        let span = span_of(text, "March 3");
        assert_eq!(
            associate_context(text, span, ContextMode::LineBased, &[], 100),
            None
        );
    }

    #[test]
    fn keyword_within_window() {
        let text = "Lab 4: loops and recursion, due 10/01";
        let span = span_of(text, "10/01");
        assert_eq!(
            associate_context(text, span, ContextMode::KeywordWindow, &keywords(), 100).as_deref(),
            Some("Lab 4")
        );
    }

    #[test]
    fn nearest_keyword_wins() {
        let text = "Sep 5 - Lab 1 due\nOct 8 - Midterm Project presentations";
        let span = span_of(text, "Oct 8");
        assert_eq!(
            associate_context(text, span, ContextMode::KeywordWindow, &keywords(), 100).as_deref(),
            Some("Midterm Project")
        );
    }

    #[test]
    fn ties_follow_list_order() {
        let text = "Office hours 10/08 Lab 3";
        let span = span_of(text, "10/08");
        assert_eq!(
            associate_context(text, span, ContextMode::KeywordWindow, &keywords(), 100).as_deref(),
            Some("Lab 3")
        );
    }

    #[test]
    fn keyword_before_date_counts() {
        let text = "Office hours cancelled. Midterm Project due 10/08";
        let span = span_of(text, "10/08");
        assert_eq!(
            associate_context(text, span, ContextMode::KeywordWindow, &keywords(), 100).as_deref(),
            Some("Midterm Project")
        );
    }

    #[test]
    fn keyword_outside_window_is_ignored() {
        let text = format!("Lab 1{}12/01 reading day", " ".repeat(40));
        let span = span_of(&text, "12/01");
        assert_eq!(
            associate_context(&text, span.clone(), ContextMode::KeywordWindow, &keywords(), 10),
            None
        );
        assert_eq!(
            associate_context(&text, span, ContextMode::KeywordWindow, &keywords(), 50).as_deref(),
            Some("Lab 1")
        );
    }

    #[test]
    fn window_respects_char_boundaries() {
        let text = "Ünïcödé — Lab 2 — 9/3 — façade";
        let span = span_of(text, "9/3");
        assert_eq!(
            associate_context(text, span, ContextMode::KeywordWindow, &keywords(), 3),
            None
        );
    }
}
