//! Entity cache: the current generation of vApps and VMs

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tracing::{debug, warn};
use vcloud_model::{VApp, Vm};

/// Either kind of cached entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef {
    VApp(VApp),
    Vm(Vm),
}

impl EntityRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            EntityRef::VApp(v) => v.id(),
            EntityRef::Vm(v) => v.id(),
        }
    }

    pub fn href(&self) -> Option<&str> {
        match self {
            EntityRef::VApp(v) => v.href(),
            EntityRef::Vm(v) => v.href(),
        }
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        match self {
            EntityRef::VApp(v) => v.link(rel),
            EntityRef::Vm(v) => v.link(rel),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Name,
    /// Oldest first, by creation date
    Date,
}

#[derive(Debug, Default)]
struct Generation {
    vapps: Vec<VApp>,
    vms: Vec<Vm>,
    /// Ticket of the full refresh that produced this generation
    ticket: u64,
    /// vApp id to the ticket of its latest single merge
    merged: HashMap<String, u64>,
}

impl Generation {
    fn vm_index(&self, id: &str) -> Option<usize> {
        self.vms.iter().position(|vm| vm.id() == Some(id))
    }

    fn vapp_index(&self, id: &str) -> Option<usize> {
        self.vapps.iter().position(|vapp| vapp.id() == Some(id))
    }

    fn upsert_vm(&mut self, vm: Vm) {
        match vm.id().and_then(|id| self.vm_index(id)) {
            Some(i) => self.vms[i] = vm,
            None => self.vms.push(vm),
        }
    }
}

/// Owner of every cached vApp and VM. Readers get clones.
#[derive(Debug, Default)]
pub struct EntityCache {
    state: RwLock<Generation>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a whole new generation.
    ///
    /// Dropped (returns false) when a newer full refresh already committed.
    /// vApps merged individually under a newer ticket survive the swap.
    pub fn replace_generation(&self, mut vapps: Vec<VApp>, mut vms: Vec<Vm>, ticket: u64) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.ticket > ticket {
            debug!(
                "Dropping full refresh {} superseded by {}",
                ticket, state.ticket
            );
            return false;
        }

        let newer: Vec<String> = state
            .merged
            .iter()
            .filter(|(_, merged)| **merged > ticket)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &newer {
            let Some(vapp) = state.vapps.iter().find(|v| v.id() == Some(id)).cloned() else {
                continue;
            };
            let children: HashSet<&str> = vapp.children.iter().map(String::as_str).collect();
            let stale: HashSet<String> = vapps
                .iter()
                .find(|v| v.id() == Some(id))
                .map(|v| v.children.clone())
                .unwrap_or_default()
                .into_iter()
                .collect();

            vms.retain(|vm| {
                vm.id()
                    .map_or(true, |vm_id| !stale.contains(vm_id) && !children.contains(vm_id))
            });
            vms.extend(
                state
                    .vms
                    .iter()
                    .filter(|vm| vm.id().is_some_and(|vm_id| children.contains(vm_id)))
                    .cloned(),
            );
            match vapps.iter().position(|v| v.id() == Some(id)) {
                Some(i) => vapps[i] = vapp,
                None => vapps.push(vapp),
            }
        }

        state.vapps = vapps;
        state.vms = vms;
        state.ticket = ticket;
        state.merged.retain(|_, merged| *merged > ticket);
        true
    }

    /// Insert or overwrite one vApp and its VMs
    pub fn merge_one(&self, vapp: VApp, vms: Vec<Vm>, ticket: u64) -> bool {
        let Some(id) = vapp.id().map(str::to_string) else {
            warn!("Refusing to merge a vApp without an id");
            return false;
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.ticket > ticket {
            debug!("Dropping merge of {}: full refresh {} is newer", id, state.ticket);
            return false;
        }
        if state.merged.get(&id).is_some_and(|merged| *merged > ticket) {
            debug!("Dropping merge of {}: a newer merge already applied", id);
            return false;
        }

        // VMs that left the vApp go with the old copy
        if let Some(i) = state.vapp_index(&id) {
            let kept: HashSet<String> = vms.iter().filter_map(|vm| vm.id()).map(str::to_string).collect();
            let gone: HashSet<String> = state.vapps[i]
                .children
                .iter()
                .filter(|child| !kept.contains(*child))
                .cloned()
                .collect();
            state
                .vms
                .retain(|vm| vm.id().map_or(true, |vm_id| !gone.contains(vm_id)));
            state.vapps[i] = vapp;
        } else {
            state.vapps.push(vapp);
        }
        for vm in vms {
            state.upsert_vm(vm);
        }
        state.merged.insert(id, ticket);
        true
    }

    /// Insert or overwrite a single VM
    pub fn merge_vm(&self, vm: Vm, ticket: u64) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.ticket > ticket {
            return false;
        }
        state.upsert_vm(vm);
        true
    }

    /// Replace everything with restored content, regardless of tickets
    pub fn restore(&self, vapps: Vec<VApp>, vms: Vec<Vm>, ticket: u64) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.vapps = vapps;
        state.vms = vms;
        state.ticket = ticket;
        state.merged.clear();
    }

    /// Both collections, read under one lock
    pub fn snapshot(&self) -> (Vec<VApp>, Vec<Vm>) {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        (state.vapps.clone(), state.vms.clone())
    }

    pub fn vapps(&self) -> Vec<VApp> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.vapps.clone()
    }

    pub fn vms(&self) -> Vec<Vm> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.vms.clone()
    }

    pub fn vapps_sorted(&self, sort: SortBy) -> Vec<VApp> {
        let mut vapps = self.vapps();
        match sort {
            SortBy::Name => vapps.sort_by_key(|v| v.name().unwrap_or_default().to_lowercase()),
            SortBy::Date => vapps.sort_by(|a, b| a.attr.creation_date.cmp(&b.attr.creation_date)),
        }
        vapps
    }

    pub fn vapp(&self, id: &str) -> Option<VApp> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.vapps.iter().find(|v| v.id() == Some(id)).cloned()
    }

    pub fn vm(&self, id: &str) -> Option<Vm> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.vms.iter().find(|v| v.id() == Some(id)).cloned()
    }

    /// vApp or VM with this id
    pub fn entity(&self, id: &str) -> Option<EntityRef> {
        self.vapp(id)
            .map(EntityRef::VApp)
            .or_else(|| self.vm(id).map(EntityRef::Vm))
    }

    /// Exact id lookup, the form actions resolve their target with
    pub fn lookup_by_id(&self, id: &str) -> Option<EntityRef> {
        self.entity(id)
    }

    /// First entity whose href matches; a linear scan over vApps then VMs
    pub fn lookup_by_href(&self, href: &str) -> Option<EntityRef> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if let Some(vapp) = state.vapps.iter().find(|v| v.href() == Some(href)) {
            return Some(EntityRef::VApp(vapp.clone()));
        }
        state
            .vms
            .iter()
            .find(|v| v.href() == Some(href))
            .cloned()
            .map(EntityRef::Vm)
    }

    /// VMs of a vApp, in the vApp's child order
    pub fn vm_children(&self, vapp: &VApp) -> Vec<Vm> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        vapp.children
            .iter()
            .filter_map(|id| state.vms.iter().find(|vm| vm.id() == Some(id.as_str())))
            .cloned()
            .collect()
    }

    /// Set the favorite flag on a vApp or VM
    pub fn set_favorite(&self, id: &str, favorite: bool) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(i) = state.vapp_index(id) {
            state.vapps[i].favorite = favorite;
            return true;
        }
        if let Some(i) = state.vm_index(id) {
            state.vms[i].favorite = favorite;
            return true;
        }
        false
    }

    pub fn ticket(&self) -> u64 {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.ticket
    }

    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.vapps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
