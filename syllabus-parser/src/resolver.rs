use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::{Config, PatternKind, RawMatch, RecurrencePattern, ResolvedDate};

/// Templates tried in order. Year-consuming templates come first so they win
/// over the yearless fallback.
const DATED_TEMPLATES: &[&str] = &["%B %d %Y", "%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d"];
const DAY_FIRST_TEMPLATES: &[&str] = &["%d %B %Y"];

fn ordinal_suffix() -> &'static Regex {
    regex!(r"(\d)(?:st|nd|rd|th)\b")
}

fn two_digit_year() -> &'static Regex {
    regex!(r"^(\d{1,2}[/-]\d{1,2}[/-])(\d{2})$")
}

fn trailing_year() -> &'static Regex {
    regex!(r"\s(\d{4})$")
}

fn range_separator() -> &'static Regex {
    regex!(r"\s*(?:-|–|—|\bto\b|\bthrough\b)\s*")
}

fn twelve_hour_time() -> &'static Regex {
    regex!(r"(?i)[\s,]*(?:at\s+|@\s*)?(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\.?$")
}

fn twenty_four_hour_time() -> &'static Regex {
    regex!(r"(?i)[\s,]*(?:at\s+|@\s*)?(\d{1,2}):(\d{2})$")
}

fn week_number() -> &'static Regex {
    regex!(r"(?i)^week\s+(?:#\s*)?(\w+)$")
}

fn every_weekday() -> &'static Regex {
    regex!(r"(?i)^every\s+([a-z]+?)s?$")
}

fn filler_words() -> &'static Regex {
    regex!(r"(?i)\b(?:of|on|the|monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues?|wed|thu(?:rs)?|fri|sat|sun)\b")
}

/// Turns a [`RawMatch`] into a [`ResolvedDate`], or explains why it cannot.
///
/// Missing years come from `config.default_year`, week numbers count from
/// `config.semester_base()`, and recurrences span the configured window.
pub fn resolve(raw: &RawMatch, config: &Config) -> Result<ResolvedDate> {
    let text = raw.text.trim();

    match raw.kind {
        PatternKind::ExplicitDate | PatternKind::NumericDate => resolve_calendar_date(text, config),
        PatternKind::DateRange => resolve_range_start(text, config),
        PatternKind::WeekReference => resolve_week(text, config),
        PatternKind::RecurringWeekday => resolve_recurrence(text, config),
        PatternKind::TemporalEntity => resolve_fuzzy(text, config),
    }
}

fn resolve_calendar_date(text: &str, config: &Config) -> Result<ResolvedDate> {
    let (date_text, time) = split_time(text)?;
    let date = parse_with_templates(&normalize(date_text), DATED_TEMPLATES, config.default_year)
        .ok_or_else(|| Error::unresolvable(text, "no date template matched"))?;

    Ok(ResolvedDate::Concrete { date, time })
}

fn resolve_range_start(text: &str, config: &Config) -> Result<ResolvedDate> {
    let normalized = normalize(text);
    let year = trailing_year()
        .captures(&normalized)
        .map(|caps| caps[1].to_string());

    let start = normalize(range_separator().split(&normalized).next().unwrap_or_default());

    let start = match year {
        Some(year) => format!("{start} {year}"),
        None => start.to_string(),
    };

    parse_with_templates(&start, DATED_TEMPLATES, config.default_year)
        .map(ResolvedDate::on)
        .ok_or_else(|| Error::unresolvable(text, "range start is not a date"))
}

fn resolve_week(text: &str, config: &Config) -> Result<ResolvedDate> {
    let number = week_number()
        .captures(text)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::unresolvable(text, "not a week reference"))?;

    let week = number
        .parse::<u32>()
        .map_err(|_| Error::unresolvable(text, "week number is not an integer"))?;

    if week == 0 {
        return Err(Error::unresolvable(text, "week numbers start at 1"));
    }

    let base = config
        .semester_base()
        .ok_or_else(|| Error::unresolvable(text, "no semester start for the default year"))?;

    Duration::try_weeks(i64::from(week - 1))
        .and_then(|offset| base.checked_add_signed(offset))
        .map(ResolvedDate::on)
        .ok_or_else(|| Error::unresolvable(text, "week is out of range"))
}

fn resolve_recurrence(text: &str, config: &Config) -> Result<ResolvedDate> {
    let weekday = every_weekday()
        .captures(text)
        .and_then(|caps| Weekday::from_str(&caps[1]).ok())
        .ok_or_else(|| Error::unresolvable(text, "unknown weekday"))?;

    let pattern = RecurrencePattern {
        weekday,
        start: config.recurrence_start,
        until: config.recurrence_until,
    };

    if pattern.first_occurrence().is_none() {
        return Err(Error::unresolvable(
            text,
            format!(
                "no {weekday} between {} and {}",
                pattern.start, pattern.until
            ),
        ));
    }

    Ok(ResolvedDate::Recurring(pattern))
}

/// Permissive parsing for fallback entities. Weekday names and filler words are
/// dropped, day-first templates are allowed and relative days are taken from
/// `config.today`. Anything without a calendar date fails.
fn resolve_fuzzy(text: &str, config: &Config) -> Result<ResolvedDate> {
    let (date_text, time) = split_time(text)?;
    let cleaned = normalize(&filler_words().replace_all(&normalize(date_text), " "));

    let date = match cleaned.as_str() {
        "" | "noon" | "midnight" => {
            return Err(Error::unresolvable(text, "time without a calendar date"));
        }
        "today" | "tonight" => Some(config.today),
        "tomorrow" => config.today.succ_opt(),
        "yesterday" => config.today.pred_opt(),
        other => parse_with_templates(other, DATED_TEMPLATES, config.default_year).or_else(|| {
            parse_with_templates(other, DAY_FIRST_TEMPLATES, config.default_year)
        }),
    };

    date.map(|date| ResolvedDate::Concrete { date, time })
        .ok_or_else(|| Error::unresolvable(text, "not confident this is a date"))
}

/// Lowercases, drops ordinal suffixes, commas and dots, collapses whitespace and
/// expands two-digit years.
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace([',', '.'], " ");
    let stripped = ordinal_suffix().replace_all(&lowered, "$1");

    let collapsed = stripped
        .split_whitespace()
        .map(|token| if token == "sept" { "sep" } else { token })
        .collect::<Vec<_>>()
        .join(" ");

    two_digit_year()
        .replace(&collapsed, "${1}20${2}")
        .into_owned()
}

/// Tries each template on the text as-is, then again with `default_year` appended.
fn parse_with_templates(text: &str, templates: &[&str], default_year: i32) -> Option<NaiveDate> {
    let parse = |candidate: &str| {
        templates
            .iter()
            .find_map(|template| NaiveDate::parse_from_str(candidate, template).ok())
    };

    parse(text).or_else(|| {
        let separator = if text.contains('/') {
            "/"
        } else if text.contains('-') {
            "-"
        } else {
            " "
        };
        parse(&format!("{text}{separator}{default_year}"))
    })
}

/// Splits a trailing clock time ("at 2:30 pm", "@ 14:00") off a date string.
fn split_time(text: &str) -> Result<(&str, Option<NaiveTime>)> {
    if let Some(caps) = twelve_hour_time().captures(text) {
        let time = twelve_hour(&caps).ok_or_else(|| Error::unresolvable(text, "invalid clock time"))?;
        return Ok((&text[..whole_match_start(&caps)], Some(time)));
    }

    if let Some(caps) = twenty_four_hour_time().captures(text) {
        let time = caps[1]
            .parse()
            .ok()
            .zip(caps[2].parse().ok())
            .and_then(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
            .ok_or_else(|| Error::unresolvable(text, "invalid clock time"))?;
        return Ok((&text[..whole_match_start(&caps)], Some(time)));
    }

    Ok((text, None))
}

fn whole_match_start(caps: &Captures<'_>) -> usize {
    caps.get(0).map_or(0, |found| found.start())
}

fn twelve_hour(caps: &Captures<'_>) -> Option<NaiveTime> {
    let hour = caps[1].parse::<u32>().ok()?;
    let minute = caps.get(2).map_or(Some(0), |m| m.as_str().parse::<u32>().ok())?;

    if !(1..=12).contains(&hour) {
        return None;
    }

    let pm = caps[3].eq_ignore_ascii_case("p");
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (hour, false) => hour,
        (hour, true) => hour + 12,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}
