//! Human-readable dates for task cards.

use chrono::{DateTime, NaiveDate, Utc};

/// `Jan 5, 2025`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Distance between `at` and `now` in the coarsest unit under a week
/// (`just now`, `5m ago`, `in 3h`, `2d ago`), else the calendar date.
#[must_use]
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds();
    if seconds.abs() < 60 {
        return if seconds >= 0 {
            "just now".to_string()
        } else {
            "in a few seconds".to_string()
        };
    }

    // Floor division so that e.g. -90s counts as -2m like the positive side.
    let minutes = seconds.div_euclid(60);
    if minutes.abs() < 60 {
        return ago_or_in(minutes, "m");
    }
    let hours = minutes.div_euclid(60);
    if hours.abs() < 24 {
        return ago_or_in(hours, "h");
    }
    let days = hours.div_euclid(24);
    if days.abs() < 7 {
        return ago_or_in(days, "d");
    }
    format_date(at.date_naive())
}

fn ago_or_in(n: i64, unit: &str) -> String {
    if n >= 0 {
        format!("{n}{unit} ago")
    } else {
        format!("in {}{unit}", n.unsigned_abs())
    }
}

/// Due date relative to `today`: `Yesterday`, `Today`, `Tomorrow`, `in Nd`
/// within two weeks, `Nd ago` within a month, else the calendar date.
#[must_use]
pub fn format_due(due: NaiveDate, today: NaiveDate) -> String {
    match (due - today).num_days() {
        -1 => "Yesterday".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        d @ -30..=-2 => format!("{}d ago", d.unsigned_abs()),
        d @ 2..=13 => format!("in {d}d"),
        _ => format_date(due),
    }
}
