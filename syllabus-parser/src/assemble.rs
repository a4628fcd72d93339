use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};
use crate::{CalendarEvent, Config, CourseInfo, RecurrenceRule, ResolvedDate, SyllabusEvent};

/// Turns resolved events into calendar events in `timezone`.
///
/// An unknown timezone fails the whole call. Events that cannot be placed on the
/// calendar are logged and left out.
pub fn build_events(
    events: &[SyllabusEvent],
    course: Option<&CourseInfo>,
    timezone: &str,
    config: &Config,
) -> Result<Vec<CalendarEvent>> {
    let tz = parse_timezone(timezone)?;

    Ok(events
        .iter()
        .filter_map(|event| {
            let built = build_event(event, course, tz, config);
            if built.is_none() {
                tracing::warn!(description = %event.description, "event could not be placed in {tz}");
            }
            built
        })
        .collect())
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| Error::InvalidTimezone(name.to_string()))
}

fn build_event(
    event: &SyllabusEvent,
    course: Option<&CourseInfo>,
    tz: Tz,
    config: &Config,
) -> Option<CalendarEvent> {
    let (start, recurrence) = match event.date {
        ResolvedDate::Concrete { date, time } => {
            let time = time
                .filter(|time| *time != NaiveTime::MIN)
                .unwrap_or(config.default_time);
            (localize(date.and_time(time), tz)?, None)
        }
        ResolvedDate::Recurring(pattern) => {
            let first = pattern.first_occurrence()?;
            let until = localize(pattern.until.and_hms_opt(23, 59, 59)?, tz)?;
            let rule = RecurrenceRule {
                weekday: pattern.weekday,
                until: until.with_timezone(&Utc),
            };
            (localize(first.and_time(config.default_time), tz)?, Some(rule))
        }
    };

    let summary = summary(&event.description, course);
    let uid = format!(
        "{}_{}",
        start.format("%Y%m%dT%H%M%S"),
        summary.replace(' ', "-")
    );

    Some(CalendarEvent {
        uid,
        start,
        end: start + config.duration,
        summary,
        description: Some(description(event, course)),
        recurrence,
    })
}

/// Places a wall-clock time in `tz`. Times inside a DST gap move forward an hour;
/// ambiguous times take the earlier instant.
fn localize(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&local).earliest().or_else(|| {
        let shifted = local.checked_add_signed(Duration::try_hours(1)?)?;
        tz.from_local_datetime(&shifted).earliest()
    })
}

fn summary(description: &str, course: Option<&CourseInfo>) -> String {
    match course
        .and_then(|course| course.title.as_deref())
        .map(str::trim)
        .filter(|title| !title.is_empty())
    {
        Some(title) => format!("{title}: {description}"),
        None => description.to_string(),
    }
}

fn description(event: &SyllabusEvent, course: Option<&CourseInfo>) -> String {
    let mut lines = Vec::new();

    if let Some(course) = course {
        lines.push(format!(
            "Course: {}",
            course.title.as_deref().unwrap_or("N/A")
        ));
        lines.push(format!(
            "Instructor: {}",
            course.instructor.as_deref().unwrap_or("N/A")
        ));
        lines.push(String::new());
    }

    lines.push(format!("Original text: {}", event.original_text));
    lines.join("\n")
}
