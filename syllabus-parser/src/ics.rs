use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use ics::{
    escape_text,
    parameters::TzIDParam,
    properties::{Description, DtEnd, DtStart, RRule, Summary, TzName},
    Daylight, ICalendar, Standard, TimeZone as VTimeZone,
};

use crate::CalendarEvent;

const PRODID: &str = "-//Syllabus Calendar Generator//EN";

/// Serializes `events` into an iCalendar document.
#[must_use]
pub fn render(events: &[CalendarEvent]) -> Vec<u8> {
    to_ics(events).to_string().into_bytes()
}

#[must_use]
pub fn to_ics(events: &[CalendarEvent]) -> ICalendar<'static> {
    let mut icalendar = ICalendar::new("2.0", PRODID);

    let mut zones: BTreeMap<&'static str, (Tz, RangeInclusive<i32>)> = BTreeMap::new();
    for event in events {
        let tz = event.start.timezone();
        if tz == Tz::UTC {
            continue;
        }

        let first = event.start.year();
        let last = event
            .recurrence
            .as_ref()
            .map_or(event.end.year(), |rule| rule.until.with_timezone(&tz).year());

        zones
            .entry(tz.name())
            .and_modify(|(_, years)| {
                *years = (*years.start()).min(first)..=(*years.end()).max(last);
            })
            .or_insert((tz, first..=last));
    }

    for (tz, years) in zones.into_values() {
        // Observances from the year before, so the first event has a preceding onset.
        icalendar.add_timezone(vtimezone(tz, years.start() - 1..=*years.end()));
    }

    for event in events {
        icalendar.add_event(event.to_ics());
    }

    icalendar
}

impl CalendarEvent {
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'static> {
        let stamp = self
            .start
            .with_timezone(&Utc)
            .format("%Y%m%dT%H%M%SZ")
            .to_string();

        let mut ics_event = ics::Event::new(self.uid.clone(), stamp);

        let (start, tzid) = date_time(&self.start);
        let mut dtstart = DtStart::new(start);
        if let Some(tzid) = tzid {
            dtstart.add(TzIDParam::new(tzid));
        }

        let (end, tzid) = date_time(&self.end);
        let mut dtend = DtEnd::new(end);
        if let Some(tzid) = tzid {
            dtend.add(TzIDParam::new(tzid));
        }

        ics_event.push(dtstart);
        ics_event.push(dtend);
        ics_event.push(Summary::new(escape_text(self.summary.clone())));

        if let Some(description) = &self.description {
            ics_event.push(Description::new(escape_text(description.clone())));
        }

        if let Some(rule) = &self.recurrence {
            ics_event.push(RRule::new(rule.to_string()));
        }

        ics_event
    }
}

/// UTC instants use the `Z` form; anything else is local time plus its TZID.
fn date_time(at: &DateTime<Tz>) -> (String, Option<&'static str>) {
    let tz = at.timezone();
    if tz == Tz::UTC {
        (at.format("%Y%m%dT%H%M%SZ").to_string(), None)
    } else {
        (at.format("%Y%m%dT%H%M%S").to_string(), Some(tz.name()))
    }
}

struct Transition {
    onset: NaiveDateTime,
    offset_from: i32,
    offset_to: i32,
    daylight: bool,
    name: String,
}

enum Observance {
    Standard(Standard<'static>),
    Daylight(Daylight<'static>),
}

fn vtimezone(tz: Tz, years: RangeInclusive<i32>) -> VTimeZone<'static> {
    let mut observances = years
        .flat_map(|year| transitions(tz, year))
        .map(observance)
        .collect::<Vec<_>>()
        .into_iter();

    let mut timezone = match observances.next() {
        Some(Observance::Standard(standard)) => VTimeZone::standard(tz.name(), standard),
        Some(Observance::Daylight(daylight)) => VTimeZone::daylight(tz.name(), daylight),
        None => VTimeZone::standard(tz.name(), fixed_standard(tz)),
    };

    for observance in observances {
        match observance {
            Observance::Standard(standard) => timezone.add_standard(standard),
            Observance::Daylight(daylight) => timezone.add_daylight(daylight),
        }
    }

    timezone
}

fn observance(transition: Transition) -> Observance {
    let onset = transition.onset.format("%Y%m%dT%H%M%S").to_string();
    let from = format_offset(transition.offset_from);
    let to = format_offset(transition.offset_to);

    if transition.daylight {
        let mut daylight = Daylight::new(onset, from, to);
        daylight.push(TzName::new(transition.name));
        Observance::Daylight(daylight)
    } else {
        let mut standard = Standard::new(onset, from, to);
        standard.push(TzName::new(transition.name));
        Observance::Standard(standard)
    }
}

/// Zones without transitions get one observance covering all time.
fn fixed_standard(tz: Tz) -> Standard<'static> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN);
    let offset = tz.offset_from_utc_datetime(&epoch);
    let seconds = offset.fix().local_minus_utc();

    let mut standard = Standard::new(
        epoch.format("%Y%m%dT%H%M%S").to_string(),
        format_offset(seconds),
        format_offset(seconds),
    );
    standard.push(TzName::new(offset.to_string()));
    standard
}

/// Offset changes during `year`, found by comparing daily UTC midnights and then
/// narrowing to the quarter hour.
fn transitions(tz: Tz, year: i32) -> Vec<Transition> {
    let offset_at = |instant: NaiveDateTime| tz.offset_from_utc_datetime(&instant).fix().local_minus_utc();
    let mut found = Vec::new();

    let Some(mut day) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return found;
    };
    let (Some(step), Some(quarter)) = (Duration::try_days(1), Duration::try_minutes(15)) else {
        return found;
    };

    let mut previous = offset_at(day.and_time(NaiveTime::MIN));

    while day.year() == year {
        let midnight = day.and_time(NaiveTime::MIN);
        let Some(next_midnight) = midnight.checked_add_signed(step) else {
            break;
        };

        if offset_at(next_midnight) != previous {
            let mut instant = midnight;
            while offset_at(instant) == previous && instant < next_midnight {
                instant += quarter;
            }

            let offset = tz.offset_from_utc_datetime(&instant);
            let offset_to = offset.fix().local_minus_utc();

            found.push(Transition {
                onset: instant + Duration::seconds(i64::from(previous)),
                offset_from: previous,
                offset_to,
                daylight: !offset.dst_offset().is_zero(),
                name: offset.to_string(),
            });

            previous = offset_to;
        }

        day = next_midnight.date();
    }

    found
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    let (hours, minutes, rest) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);

    if rest == 0 {
        format!("{sign}{hours:02}{minutes:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}{rest:02}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;
    use crate::RecurrenceRule;

    fn event(tz: Tz, y: i32, m: u32, d: u32, summary: &str) -> CalendarEvent {
        let start = tz.with_ymd_and_hms(y, m, d, 9, 0, 0).single().unwrap();
        CalendarEvent {
            uid: format!("{}_{}", start.format("%Y%m%dT%H%M%S"), summary.replace(' ', "-")),
            start,
            end: start + Duration::hours(1),
            summary: summary.to_string(),
            description: Some("Original text: a, b; c".to_string()),
            recurrence: None,
        }
    }

    fn render_str(events: &[CalendarEvent]) -> String {
        String::from_utf8(render(events)).unwrap()
    }

    #[test]
    fn utc_events_use_z_form() {
        let ics = render_str(&[event(Tz::UTC, 2024, 1, 15, "Syllabus Overview")]);

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("PRODID:-//Syllabus Calendar Generator//EN\r\n"));
        assert!(ics.contains("DTSTART:20240115T090000Z\r\n"));
        assert!(ics.contains("DTEND:20240115T100000Z\r\n"));
        assert!(ics.contains("SUMMARY:Syllabus Overview\r\n"));
        assert!(!ics.contains("BEGIN:VTIMEZONE"));
    }

    #[test]
    fn text_is_escaped() {
        let ics = render_str(&[event(Tz::UTC, 2024, 1, 15, "Quiz")]);
        assert!(ics.contains("DESCRIPTION:Original text: a\\, b\\; c\r\n"));
    }

    #[test]
    fn zoned_events_carry_tzid_and_vtimezone() {
        let ics = render_str(&[event(Tz::America__New_York, 2024, 7, 1, "Exam")]);

        assert!(ics.contains("DTSTART;TZID=America/New_York:20240701T090000\r\n"));
        assert!(ics.contains("BEGIN:VTIMEZONE\r\nTZID:America/New_York\r\n"));
        assert!(ics.contains("BEGIN:DAYLIGHT\r\nDTSTART:20240310T020000\r\n"));
        assert!(ics.contains("TZOFFSETFROM:-0500\r\nTZOFFSETTO:-0400\r\n"));
        assert!(ics.contains("BEGIN:STANDARD\r\nDTSTART:20241103T020000\r\n"));
    }

    #[test]
    fn recurrence_rule_is_written() {
        let mut weekly = event(Tz::UTC, 2024, 1, 9, "Lab Session");
        weekly.recurrence = Some(RecurrenceRule {
            weekday: Weekday::Tue,
            until: Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap(),
        });

        let ics = render_str(&[weekly]);
        assert!(ics.contains("RRULE:FREQ=WEEKLY;BYDAY=TU;UNTIL=20241231T235959Z\r\n"));
    }

    #[test]
    fn transitions_for_new_york() {
        let found = transitions(Tz::America__New_York, 2024);
        assert_eq!(found.len(), 2);

        assert!(found[0].daylight);
        assert_eq!(
            found[0].onset,
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(2, 0, 0).unwrap()
        );
        assert_eq!((found[0].offset_from, found[0].offset_to), (-5 * 3600, -4 * 3600));

        assert!(!found[1].daylight);
        assert_eq!(
            found[1].onset,
            NaiveDate::from_ymd_opt(2024, 11, 3).unwrap().and_hms_opt(2, 0, 0).unwrap()
        );
    }

    #[test]
    fn fixed_zones_have_single_standard() {
        assert!(transitions(Tz::Asia__Tokyo, 2024).is_empty());

        let ics = render_str(&[event(Tz::Asia__Tokyo, 2024, 4, 1, "Orientation")]);
        assert!(ics.contains("BEGIN:STANDARD\r\nDTSTART:19700101T000000\r\nTZOFFSETFROM:+0900\r\nTZOFFSETTO:+0900\r\n"));
    }

    #[test]
    fn offsets_format() {
        assert_eq!(format_offset(-5 * 3600), "-0500");
        assert_eq!(format_offset(5 * 3600 + 1800), "+0530");
        assert_eq!(format_offset(0), "+0000");
    }
}
