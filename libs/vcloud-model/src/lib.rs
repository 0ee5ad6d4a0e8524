//! Cloud data model
//!
//! Plain data shared by the console: vApps, VMs, catalog templates, tasks
//! and the persisted cache blob.

pub mod blob;
pub mod entity;
pub mod task;
pub mod template;

pub use blob::{CacheBlob, TaskLog};
pub use entity::{Attributes, Entity, Links, VApp, VAppAttrs, Vm, VmAttrs};
pub use task::{Task, TaskStatus};
pub use template::{Template, TemplateAttrs};
