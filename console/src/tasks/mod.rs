//! Server task tracking

pub mod history;
pub mod manager;
pub mod parse;

pub use history::{human_readable, HistoryRow};
pub use manager::{TaskManager, TaskOutcome};
pub use parse::parse_task_document;
