//! Task history rows and throughput

use chrono::TimeDelta;
use serde::Serialize;
use vcloud_model::{Task, TaskStatus};

const BUCKET: TimeDelta = TimeDelta::hours(1);

/// Operation name fragments and their display text, checked in order
const OPERATIONS: &[(&str, &str)] = &[
    ("poweron", "Powering On"),
    ("poweroff", "Powering Off"),
    ("acquirescreen", "Connecting To Console"),
    ("suspend", "Suspending"),
    ("instantiate", "Creating vApp"),
    ("delete", "Deleting"),
    ("jobundeploy", "Undeploying vApp"),
    ("jobdeploy", "Deploying vApp"),
    ("vappundeploy", "Undeploying vApp"),
    ("vappdeploy", "Deploying vApp"),
    ("update", "Editing vApp"),
    ("uploadovf", "Uploading OVF"),
];

/// Display text for a task operation, or the name itself when unknown
pub fn human_readable(name: &str) -> String {
    let lower = name.to_lowercase();
    OPERATIONS
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map_or_else(|| name.to_string(), |(_, text)| text.to_string())
}

/// One row of the task history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    /// Owner name, else the submitting user
    pub owner: Option<String>,
    pub operation: String,
    pub started: Option<String>,
    pub status: TaskStatus,
    pub href: String,
}

impl HistoryRow {
    pub fn from_task(task: &Task) -> Self {
        Self {
            owner: task.owner_name.clone().or_else(|| task.user.clone()),
            operation: human_readable(task.display_name()),
            started: task.started_raw().map(str::to_string),
            status: task.status.clone(),
            href: task.href.clone(),
        }
    }
}

/// Average tasks per one-hour bucket.
///
/// Timestamps are walked newest first; a new bucket opens whenever an entry lies
/// more than an hour before the start of the current bucket.
pub fn throughput_per_hour<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> f64 {
    let mut stamps: Vec<_> = tasks.into_iter().filter_map(Task::started_at).collect();
    if stamps.is_empty() {
        return 0.0;
    }
    stamps.sort_by(|a, b| b.cmp(a));

    let mut buckets = Vec::new();
    for stamp in &stamps {
        match buckets.last() {
            Some(start) if *start - *stamp <= BUCKET => {}
            _ => buckets.push(*stamp),
        }
    }
    stamps.len() as f64 / buckets.len() as f64
}
