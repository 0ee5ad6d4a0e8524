//! Catalog templates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Template attributes (record names already shortened: `memoryAllocationMB` is `memory`, etc.)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// CPU allocation (MHz)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// Memory allocation (MB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    /// Storage (KB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<String>,

    /// Names of the VMs inside the template, once filled out
    #[serde(rename = "childNames", default, skip_serializing_if = "Option::is_none")]
    pub child_names: Option<Vec<String>>,

    /// Accumulated `key:value` pairs for free-text search
    #[serde(rename = "searchTerm", default)]
    pub search_term: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// A catalog template, persisted as `{attr}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub attr: TemplateAttrs,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn href(&self) -> Option<&str> {
        self.attr.href.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.attr.name.as_deref()
    }

    pub fn network(&self) -> Option<&str> {
        self.attr.network.as_deref()
    }

    /// Whether the detail document has been merged in
    pub fn is_filled(&self) -> bool {
        self.attr.child_names.is_some()
    }

    /// Store a (shortened) attribute
    pub fn set_raw(&mut self, name: &str, value: &str) {
        let value = value.to_string();
        match name {
            "href" => self.attr.href = Some(value),
            "name" => self.attr.name = Some(value),
            "description" => self.attr.description = Some(value),
            "owner" => self.attr.owner = Some(value),
            "catalog" => self.attr.catalog = Some(value),
            "cpu" => self.attr.cpu = Some(value),
            "memory" => self.attr.memory = Some(value),
            "storage" => self.attr.storage = Some(value),
            "network" => self.attr.network = Some(value),
            "downloads" => self.attr.downloads = Some(value),
            "searchTerm" => self.attr.search_term = value,
            _ => {
                self.attr.extra.insert(name.to_string(), value);
            }
        }
    }

    /// Look an attribute up by its wire name
    pub fn raw(&self, name: &str) -> Option<String> {
        let a = &self.attr;
        match name {
            "href" => a.href.clone(),
            "name" => a.name.clone(),
            "description" => a.description.clone(),
            "owner" => a.owner.clone(),
            "catalog" => a.catalog.clone(),
            "cpu" => a.cpu.clone(),
            "memory" => a.memory.clone(),
            "storage" => a.storage.clone(),
            "network" => a.network.clone(),
            "downloads" => a.downloads.clone(),
            "childNames" => a.child_names.as_ref().map(|names| names.join(" ")),
            "searchTerm" => Some(a.search_term.clone()),
            other => a.extra.get(other).cloned(),
        }
    }

    /// Leading integer of an attribute (`"1024"` and `"1024.5"` both give 1024)
    pub fn numeric(&self, name: &str) -> Option<i64> {
        self.raw(name).as_deref().and_then(parse_leading_int)
    }
}

/// Parse the leading integer of a string, ignoring surrounding whitespace
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
