//! Server-side asynchronous tasks

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Task status as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Queued,
    PreRunning,
    Running,
    Success,
    Error,
    Aborted,
    Canceled,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::PreRunning => "preRunning",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
            TaskStatus::Aborted => "aborted",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Other(s) => s,
        }
    }

    /// Ended badly; the task will not make further progress
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TaskStatus::Error | TaskStatus::Aborted | TaskStatus::Canceled
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == TaskStatus::Success || self.is_failure()
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s {
            "queued" => TaskStatus::Queued,
            "preRunning" => TaskStatus::PreRunning,
            "running" => TaskStatus::Running,
            "success" => TaskStatus::Success,
            "error" => TaskStatus::Error,
            "aborted" => TaskStatus::Aborted,
            "canceled" => TaskStatus::Canceled,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        TaskStatus::from(s.as_str())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task record, keyed by `href`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub href: String,

    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    /// Human sentence the server attaches to the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// The entity the task acts upon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_href: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Cancel link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,

    /// Completion percentage, only present on multi-step operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Task {
    pub fn new(href: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            href: href.into(),
            status,
            ..Default::default()
        }
    }

    /// Store a raw wire attribute
    pub fn set_raw(&mut self, name: &str, value: &str) {
        let owned = value.to_string();
        match name {
            "href" => self.href = owned,
            "status" => self.status = TaskStatus::from(value),
            "name" => self.name = Some(owned),
            "operationName" => self.operation_name = Some(owned),
            "operation" => self.operation = Some(owned),
            "ownerHref" => self.owner_href = Some(owned),
            "ownerName" => self.owner_name = Some(owned),
            "user" => self.user = Some(owned),
            "cancel" => self.cancel = Some(owned),
            "progress" => self.progress = Some(owned),
            "startTime" => self.start_time = Some(owned),
            "startDate" => self.start_date = Some(owned),
            "endTime" => self.end_time = Some(owned),
            "error" => self.error = Some(owned),
            _ => {
                self.extra.insert(name.to_string(), owned);
            }
        }
    }

    /// Start timestamp as sent (`startDate` on records, `startTime` on documents)
    pub fn started_raw(&self) -> Option<&str> {
        self.start_date.as_deref().or(self.start_time.as_deref())
    }

    pub fn started_at(&self) -> Option<DateTime<FixedOffset>> {
        self.started_raw()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
    }

    /// Name used for display: the task name unless it is the generic "task"
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if name != "task" => name,
            _ => self
                .operation_name
                .as_deref()
                .or(self.name.as_deref())
                .unwrap_or(""),
        }
    }
}
