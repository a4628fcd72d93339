use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Config;

fn lab_entry() -> &'static regex::Regex {
    regex!(r"(?i)\blab\s+(\d+):[^\n]*?(?:due date|deadline)?\s*\b(\d{1,2})/(\d{1,2})\b")
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assignment {
    pub name: String,
    pub due_date: NaiveDate,
    /// Negative once the due date has passed.
    pub days_until_due: i64,
    pub details: String,
}

/// Finds `Lab N: ... MM/DD` entries, one per line, ordered by due date.
///
/// Due dates fall in `config.default_year` and are counted against
/// `config.today`. Entries whose date does not exist are skipped.
#[must_use]
pub fn extract_assignments(text: &str, config: &Config) -> Vec<Assignment> {
    let mut assignments = lab_entry()
        .captures_iter(text)
        .filter_map(|caps| {
            let month = caps[2].parse().ok()?;
            let day = caps[3].parse().ok()?;

            let Some(due_date) = NaiveDate::from_ymd_opt(config.default_year, month, day) else {
                tracing::debug!(entry = &caps[0], "skipping assignment with invalid due date");
                return None;
            };

            let days_until_due = (due_date - config.today).num_days();

            Some(Assignment {
                name: format!("Lab {}", &caps[1]),
                due_date,
                days_until_due,
                details: details(days_until_due),
            })
        })
        .collect::<Vec<_>>();

    assignments.sort_by_key(|assignment| assignment.due_date);
    assignments
}

fn details(days_until_due: i64) -> String {
    match days_until_due {
        1 => "Due in 1 day".to_string(),
        0 => "Due today".to_string(),
        days if days > 0 => format!("Due in {days} days"),
        _ => "Overdue".to_string(),
    }
}
