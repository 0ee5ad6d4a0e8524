//! Task manager: active tasks, the completed-task log and fake tasks

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use vcloud_model::{Task, TaskLog, TaskStatus};

use crate::cache::Tickets;
use crate::events::{EntityRefreshed, EventBus, Payload, TaskPayload, Topics};
use crate::tasks::history::{self, HistoryRow};
use crate::utils::href_entity_key;

/// Owner hrefs of vApps contain this (case-insensitive)
const VAPP_PATH: &str = "/vapp/vapp-";

/// What observing a task led to
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Already logged; ignored
    Duplicate,
    /// Still running; kept in the active set
    Pending,
    /// Reached a terminal status and `task.complete` was published
    Completed { task: Task, success: bool },
    /// Succeeded, but the change needs a full model refresh instead of a completion event
    RefreshRequired { task: Task },
}

#[derive(Debug, Default)]
struct TaskState {
    active: BTreeMap<String, Task>,
    log: TaskLog,
    /// Owner href to the ticket current when the fake task was added
    fake: BTreeMap<String, u64>,
}

/// Tracks server tasks from submission to a terminal status
pub struct TaskManager {
    state: Mutex<TaskState>,
    bus: EventBus,
    tickets: Arc<Tickets>,
}

impl TaskManager {
    pub fn new(bus: EventBus, tickets: Arc<Tickets>) -> Self {
        Self {
            state: Mutex::new(TaskState::default()),
            bus,
            tickets,
        }
    }

    /// Observe a task returned by an action, then announce that it started
    pub fn submit(&self, task: Task) -> TaskOutcome {
        let outcome = self.observe(task.clone());
        if outcome != TaskOutcome::Duplicate {
            self.bus.publish(
                Topics::TASK_START,
                Payload::Task(TaskPayload {
                    success: !task.status.is_failure(),
                    task,
                    message: None,
                }),
            );
        }
        outcome
    }

    /// Fold a fresh view of a task into the manager
    pub fn observe(&self, task: Task) -> TaskOutcome {
        let href = task.href.clone();
        let mut fake_owner = None;

        let outcome = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.log.contains_key(&href) {
                return TaskOutcome::Duplicate;
            }

            match task.status.clone() {
                TaskStatus::Success => {
                    state.active.remove(&href);
                    state.log.insert(href.clone(), task.clone());
                    if let Some(owner) = task.owner_href.as_deref() {
                        if owner.to_lowercase().contains(VAPP_PATH) {
                            state.fake.insert(owner.to_string(), self.tickets.current());
                            fake_owner = Some(owner.to_string());
                        }
                    }
                    if needs_full_refresh(&task) {
                        TaskOutcome::RefreshRequired { task }
                    } else {
                        TaskOutcome::Completed {
                            task,
                            success: true,
                        }
                    }
                }
                status if status.is_failure() => {
                    state.active.remove(&href);
                    state.log.insert(href.clone(), task.clone());
                    TaskOutcome::Completed {
                        task,
                        success: false,
                    }
                }
                _ => {
                    state.active.insert(href.clone(), task);
                    TaskOutcome::Pending
                }
            }
        };

        if let Some(owner) = fake_owner {
            self.publish_busy(owner);
        }
        match &outcome {
            TaskOutcome::Completed { task, success } => {
                if *success {
                    info!("Task {} completed", href);
                } else {
                    warn!(
                        "Task {} ended with {}: {}",
                        href,
                        task.status,
                        task.error.as_deref().unwrap_or("no message")
                    );
                }
                self.bus.publish(
                    Topics::TASK_COMPLETE,
                    Payload::Task(TaskPayload {
                        success: *success,
                        task: task.clone(),
                        message: task.error.clone(),
                    }),
                );
            }
            TaskOutcome::RefreshRequired { .. } => {
                debug!("Task {} completed, full refresh required", href);
            }
            _ => {}
        }
        outcome
    }

    /// Mark an entity busy before the server has issued a real task for it
    pub fn add_fake_task(&self, owner_href: &str) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .fake
                .insert(owner_href.to_string(), self.tickets.current());
        }
        self.publish_busy(owner_href.to_string());
    }

    fn publish_busy(&self, owner_href: String) {
        self.bus.publish(
            Topics::REFRESH_SINGLE,
            Payload::EntityRefreshed(EntityRefreshed {
                href: owner_href,
                id: None,
            }),
        );
    }

    /// Drop fake tasks created before a full refresh issued with `ticket`
    pub fn clear_fakes_before(&self, ticket: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.fake.retain(|_, created| *created >= ticket);
    }

    /// Drop the fake task of one owner if it predates a refresh issued with `ticket`
    pub fn clear_fake(&self, owner_href: &str, ticket: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.fake.get(owner_href).is_some_and(|created| *created < ticket) {
            state.fake.remove(owner_href);
        }
    }

    pub fn fake_task_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.fake.len()
    }

    /// Entity keys (href tail without its type prefix) with work in flight
    pub fn in_progress_owner_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .active
            .values()
            .filter_map(|t| t.owner_href.as_deref())
            .chain(state.fake.keys().map(String::as_str))
            .map(href_entity_key)
            .filter(|key| !key.is_empty())
            .collect()
    }

    /// Whether an entity id contains the key of any in-progress owner
    pub fn is_busy(&self, entity_id: &str) -> bool {
        self.in_progress_owner_ids()
            .iter()
            .any(|key| entity_id.contains(key.as_str()))
    }

    pub fn number_of_tasks(&self) -> usize {
        self.in_progress_owner_ids().len()
    }

    pub fn has_active(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        !state.active.is_empty()
    }

    pub fn active_hrefs(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.active.keys().cloned().collect()
    }

    pub fn is_logged(&self, href: &str) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.log.contains_key(href)
    }

    /// A task by href, active first
    pub fn details(&self, href: &str) -> Option<Task> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .active
            .get(href)
            .or_else(|| state.log.get(href))
            .cloned()
    }

    /// Active and logged tasks, one row per href, newest first
    pub fn history(&self) -> Vec<HistoryRow> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut combined: BTreeMap<&str, &Task> = BTreeMap::new();
        for (href, task) in state.active.iter().chain(state.log.iter()) {
            combined.insert(href.as_str(), task);
        }
        let mut tasks: Vec<&Task> = combined.into_values().collect();
        // Parsed instants first, so differing offsets order correctly; unparsable stamps trail by text
        tasks.sort_by(|a, b| (b.started_at(), b.started_raw()).cmp(&(a.started_at(), a.started_raw())));
        tasks.into_iter().map(HistoryRow::from_task).collect()
    }

    pub fn throughput_per_hour(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        history::throughput_per_hour(state.log.values())
    }

    /// Seed from recent task records: finished tasks go to the log, the rest are tracked
    pub fn load_log_records(&self, tasks: Vec<Task>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for task in tasks {
            if task.status.is_terminal() {
                state.active.remove(&task.href);
                state.log.insert(task.href.clone(), task);
            } else if !state.log.contains_key(&task.href) {
                state.active.insert(task.href.clone(), task);
            }
        }
    }

    /// Track running tasks discovered by the passive query; logged hrefs are skipped
    pub fn load_active_records(&self, tasks: Vec<Task>) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut added = 0;
        for task in tasks {
            if task.status.is_terminal() || state.log.contains_key(&task.href) {
                continue;
            }
            if state.active.insert(task.href.clone(), task).is_none() {
                added += 1;
            }
        }
        added
    }

    pub fn save_log(&self) -> TaskLog {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.log.clone()
    }

    /// Replace the log wholesale; active tasks that are now logged are dropped
    pub fn load_log(&self, log: TaskLog) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.active.retain(|href, _| !log.contains_key(href));
        state.log = log;
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = TaskState::default();
    }
}

/// Multi-step and delete operations change more than their owner
fn needs_full_refresh(task: &Task) -> bool {
    let deletes = |s: &Option<String>| {
        s.as_deref()
            .is_some_and(|s| s.to_lowercase().contains("delete"))
    };
    task.progress.is_some() || deletes(&task.name) || deletes(&task.operation_name)
}
