//! Persisted cache blob

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{VApp, Vm};
use crate::task::Task;
use crate::template::Template;

/// Completed tasks keyed by href
pub type TaskLog = BTreeMap<String, Task>;

/// Everything the console caches, saved and restored wholesale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheBlob {
    #[serde(default)]
    pub vapps: Vec<VApp>,

    #[serde(default)]
    pub vms: Vec<Vm>,

    #[serde(default)]
    pub catalog: Vec<Template>,

    #[serde(default)]
    pub tasks: TaskLog,
}

impl CacheBlob {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
