#![cfg(feature = "ics")]

use std::io::BufReader;

use chrono::NaiveDate;
use ical::parser::ical::component::{IcalCalendar, IcalEvent};
use syllabus_parser::{build_events, parse_syllabus, render, CalendarEvent, Config};

const SYLLABUS: &str = "\
Jan 15, 2024 - Syllabus Overview
Every Tuesday - Lab Session
Week 3 - Functions
March 12 at 4pm - Midterm exam
";

fn config() -> Config {
    Config::for_date(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap())
        .with_semester_start(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
}

fn assembled(timezone: &str) -> Vec<CalendarEvent> {
    let extraction = parse_syllabus(SYLLABUS, &config()).unwrap();
    build_events(&extraction.events, None, timezone, &config()).unwrap()
}

fn reparse(events: &[CalendarEvent]) -> IcalCalendar {
    let bytes = render(events);
    let mut calendars = ical::IcalParser::new(BufReader::new(bytes.as_slice()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(calendars.len(), 1);
    calendars.remove(0)
}

fn property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    event
        .properties
        .iter()
        .find(|property| property.name == name)
        .and_then(|property| property.value.as_deref())
}

fn tzid(event: &IcalEvent, name: &str) -> Option<String> {
    event
        .properties
        .iter()
        .find(|property| property.name == name)
        .and_then(|property| property.params.as_ref())
        .and_then(|params| params.iter().find(|(key, _)| key == "TZID"))
        .and_then(|(_, values)| values.first().cloned())
}

#[test]
fn utc_round_trip() {
    let events = assembled("UTC");
    let calendar = reparse(&events);

    assert!(calendar.timezones.is_empty());
    assert_eq!(calendar.events.len(), events.len());

    for (event, parsed) in events.iter().zip(&calendar.events) {
        assert_eq!(
            property(parsed, "DTSTART"),
            Some(event.start.format("%Y%m%dT%H%M%SZ").to_string().as_str())
        );
        assert_eq!(property(parsed, "SUMMARY"), Some(event.summary.as_str()));
        assert_eq!(property(parsed, "UID"), Some(event.uid.as_str()));
        assert_eq!(
            property(parsed, "RRULE").map(str::to_string),
            event.recurrence.as_ref().map(ToString::to_string)
        );
    }
}

#[test]
fn zoned_round_trip() {
    let events = assembled("America/New_York");
    let calendar = reparse(&events);

    assert_eq!(calendar.timezones.len(), 1);
    assert_eq!(calendar.events.len(), events.len());

    for (event, parsed) in events.iter().zip(&calendar.events) {
        assert_eq!(
            property(parsed, "DTSTART"),
            Some(event.start.format("%Y%m%dT%H%M%S").to_string().as_str())
        );
        assert_eq!(tzid(parsed, "DTSTART").as_deref(), Some("America/New_York"));
        assert_eq!(tzid(parsed, "DTEND").as_deref(), Some("America/New_York"));
        assert_eq!(property(parsed, "SUMMARY"), Some(event.summary.as_str()));
    }

    let weekly = calendar
        .events
        .iter()
        .find(|parsed| property(parsed, "RRULE").is_some())
        .unwrap();
    assert_eq!(property(weekly, "DTSTART"), Some("20240109T090000"));
    assert_eq!(
        property(weekly, "RRULE"),
        Some("FREQ=WEEKLY;BYDAY=TU;UNTIL=20250101T045959Z")
    );

    let exam = calendar
        .events
        .iter()
        .find(|parsed| property(parsed, "SUMMARY") == Some("Midterm exam"))
        .unwrap();
    assert_eq!(property(exam, "DTSTART"), Some("20240312T160000"));
    assert_eq!(property(exam, "DTEND"), Some("20240312T170000"));
}

#[test]
fn rendering_is_deterministic() {
    assert_eq!(render(&assembled("Europe/Berlin")), render(&assembled("Europe/Berlin")));
}
