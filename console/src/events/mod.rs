//! Publish/subscribe event bus and the payloads carried on it

pub mod bus;
pub mod topics;

pub use bus::{handler, Event, EventBus, Handler, SubscriptionId};
pub use topics::Topics;

use serde::Serialize;
use vcloud_model::{Task, Template};

/// Result of a login or session confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginPayload {
    pub success: bool,
    pub confirm: bool,
    pub user: Option<String>,
    pub message: Option<String>,
}

/// A task reaching a terminal status, or a task being started
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPayload {
    pub success: bool,
    pub task: Task,
    pub message: Option<String>,
}

/// A single vApp (or VM) has been re-fetched and merged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRefreshed {
    pub href: String,
    pub id: Option<String>,
}

/// Remote console ticket acquired for a VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleTicket {
    pub vm_id: String,
    pub host: String,
    pub moid: String,
    pub ticket: String,
    /// Cloned host session key, when the session clone succeeded
    pub session: Option<String>,
}

/// Typed payloads; every topic carries exactly one shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    None,
    Login(LoginPayload),
    RefreshComplete { loaded: bool },
    EntityRefreshed(EntityRefreshed),
    TemplatesUpdated { page: Option<usize>, complete: bool },
    SearchResults(Vec<Template>),
    Task(TaskPayload),
    Progress(f64),
    Template(Template),
    Ticket(ConsoleTicket),
    Error(String),
}
