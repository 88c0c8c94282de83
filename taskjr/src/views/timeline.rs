//! Timeline projection: tasks ordered by due date and grouped under
//! relative date headings.

use chrono::NaiveDate;

use taskjr_proto::task::Task;

use super::format::format_date;

/// Heading for tasks without a due date.
pub const NO_DATE: &str = "No Date";

/// One heading of the timeline and the tasks under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineGroup {
    /// Relative heading such as "Today" or a formatted date.
    pub label: String,
    /// Tasks under the heading, in due-date order.
    pub tasks: Vec<Task>,
}

/// Heading for a due date, relative to `today`.
#[must_use]
pub fn date_label(due: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(due) = due else {
        return NO_DATE.to_string();
    };
    match (due - today).num_days() {
        -1 => "Yesterday".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        2..=7 => "This Week".to_string(),
        8..=14 => "Next Week".to_string(),
        15..=30 => "This Month".to_string(),
        _ => format_date(due),
    }
}

/// Sorts `tasks` by due date (undated last, ties in input order) and groups
/// them by [`date_label`].
///
/// Groups come out in the order of their earliest due date, so `No Date`
/// is always last.
#[must_use]
pub fn timeline(tasks: &[Task], today: NaiveDate) -> Vec<TimelineGroup> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by_key(|t| (t.due_date.is_none(), t.due_date));

    let mut groups: Vec<TimelineGroup> = Vec::new();
    for task in sorted {
        let label = date_label(task.due_date, today);
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.tasks.push(task.clone()),
            None => groups.push(TimelineGroup {
                label,
                tasks: vec![task.clone()],
            }),
        }
    }
    groups
}
