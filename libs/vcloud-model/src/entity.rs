//! vApp and VM entities

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Blank 64x48 PNG shown until a real console screenshot is fetched.
pub const PLACEHOLDER_THUMBNAIL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAEAAAAAwCAIAAAAuKetIAAAAH0lEQVRoge3BAQEAAACCIP+vbkhAAQAAAAAAAAAALwYkMAABjuvAZwAAAABJRU5ErkJggg==";

/// Relation name to action URL.
///
/// Links only grow while an entity generation is alive; there is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(BTreeMap<String, String>);

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or overwrite) the URL for a relation
    pub fn add(&mut self, rel: impl Into<String>, href: impl Into<String>) {
        self.0.insert(rel.into(), href.into());
    }

    pub fn get(&self, rel: &str) -> Option<&str> {
        self.0.get(rel).map(String::as_str)
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.0.contains_key(rel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed attribute record shared by every entity kind
pub trait Attributes: Default + Clone {
    fn id(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
    fn href(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;

    /// Store a raw wire attribute, routing known names to typed fields
    fn set_raw(&mut self, name: &str, value: &str);
}

/// vApp attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VAppAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Raw status; records carry a word (`POWERED_ON`), detail documents a code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "creationDate", default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    #[serde(rename = "ownerName", default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    #[serde(rename = "searchTerm", default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,

    #[serde(rename = "vdcName", default, skip_serializing_if = "Option::is_none")]
    pub vdc_name: Option<String>,

    #[serde(rename = "storageKB", default, skip_serializing_if = "Option::is_none")]
    pub storage_kb: Option<String>,

    #[serde(rename = "memoryAllocationMB", default, skip_serializing_if = "Option::is_none")]
    pub memory_allocation_mb: Option<String>,

    /// Everything else the server sent
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Attributes for VAppAttrs {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn set_raw(&mut self, name: &str, value: &str) {
        let value = value.to_string();
        match name {
            "id" => self.id = Some(value),
            "name" => self.name = Some(value),
            "href" => self.href = Some(value),
            "status" => self.status = Some(value),
            "description" => self.description = Some(value),
            "creationDate" => self.creation_date = Some(value),
            "ownerName" => self.owner_name = Some(value),
            "searchTerm" => self.search_term = Some(value),
            "vdcName" => self.vdc_name = Some(value),
            "storageKB" => self.storage_kb = Some(value),
            "memoryAllocationMB" => self.memory_allocation_mb = Some(value),
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
    }
}

/// VM attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(rename = "guestOS", default, skip_serializing_if = "Option::is_none")]
    pub guest_os: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Attributes for VmAttrs {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn set_raw(&mut self, name: &str, value: &str) {
        let value = value.to_string();
        match name {
            "id" => self.id = Some(value),
            "name" => self.name = Some(value),
            "href" => self.href = Some(value),
            "status" => self.status = Some(value),
            "description" => self.description = Some(value),
            "ip" => self.ip = Some(value),
            "guestOS" => self.guest_os = Some(value),
            "network" => self.network = Some(value),
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
    }
}

/// An entity as cached and persisted: `{attr, links, children, favorite}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity<A> {
    pub attr: A,

    #[serde(default)]
    pub links: Links,

    /// Child VM ids in document order (vApps only)
    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default)]
    pub favorite: bool,
}

pub type VApp = Entity<VAppAttrs>;
pub type Vm = Entity<VmAttrs>;

impl<A: Attributes> Entity<A> {
    pub fn new() -> Self {
        Self {
            attr: A::default(),
            links: Links::new(),
            children: Vec::new(),
            favorite: false,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attr.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.attr.name()
    }

    pub fn href(&self) -> Option<&str> {
        self.attr.href()
    }

    pub fn description(&self) -> Option<&str> {
        self.attr.description()
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links.get(rel)
    }
}

impl Entity<VmAttrs> {
    /// Numeric power status code, if the server sent one
    pub fn status_code(&self) -> Option<i32> {
        self.attr.status.as_deref().and_then(|s| s.trim().parse().ok())
    }

    pub fn console_thumbnail(&self) -> &'static str {
        PLACEHOLDER_THUMBNAIL
    }
}

impl Entity<VAppAttrs> {
    pub fn number_of_vms(&self) -> usize {
        self.children.len()
    }
}
