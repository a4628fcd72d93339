use std::collections::HashSet;

use crate::SyllabusEvent;

/// Drops repeated (date, description) pairs, keeping the first, then orders the
/// rest by date. Descriptions compare case- and whitespace-insensitively.
#[must_use]
pub fn dedup_and_sort(events: Vec<SyllabusEvent>) -> Vec<SyllabusEvent> {
    let mut seen = HashSet::new();

    let mut events = events
        .into_iter()
        .filter(|event| seen.insert((event.date, normalize(&event.description))))
        .collect::<Vec<_>>();

    events.sort_by_key(|event| event.date.sort_key());
    events
}

fn normalize(description: &str) -> String {
    description
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
