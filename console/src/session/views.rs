//! Read-only views over the cache and the dashboard metrics

use serde::Serialize;
use vcloud_model::{VApp, Vm};

use crate::cache::{EntityRef, SortBy};
use crate::session::Cloud;
use crate::status::{self, PowerState};
use crate::tasks::HistoryRow;

/// Dashboard totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Storage in MB
    pub total_storage: f64,
    /// Memory in MB
    pub total_memory: i64,
    pub total_running: usize,
    pub total_stopped: usize,
    pub total_suspended: usize,
    pub total_error: usize,
    pub tasks_per_hour: f64,
}

impl Cloud {
    pub fn vapps(&self, sort: SortBy) -> Vec<VApp> {
        self.entities.vapps_sorted(sort)
    }

    pub fn vapp(&self, id: &str) -> Option<VApp> {
        self.entities.vapp(id)
    }

    pub fn vms(&self) -> Vec<Vm> {
        self.entities.vms()
    }

    pub fn vm(&self, id: &str) -> Option<Vm> {
        self.entities.vm(id)
    }

    pub fn history(&self) -> Vec<HistoryRow> {
        self.tasks.history()
    }

    pub fn vapp_status(&self, id: &str) -> Option<PowerState> {
        let vapp = self.entities.vapp(id)?;
        Some(self.state_of_vapp(&vapp))
    }

    pub fn vm_status(&self, id: &str) -> Option<PowerState> {
        let vm = self.entities.vm(id)?;
        Some(status::vm_state(&vm, self.tasks.is_busy(id)))
    }

    fn state_of_vapp(&self, vapp: &VApp) -> PowerState {
        let busy = vapp.id().map(|id| self.tasks.is_busy(id)).unwrap_or(false);
        status::vapp_state(&self.entities.vm_children(vapp), busy)
    }

    fn state_and_links(&self, id: &str) -> Option<(PowerState, EntityRef)> {
        let entity = self.entities.entity(id)?;
        let state = match &entity {
            EntityRef::VApp(vapp) => self.state_of_vapp(vapp),
            EntityRef::Vm(vm) => status::vm_state(vm, self.tasks.is_busy(id)),
        };
        Some((state, entity))
    }

    pub fn can_power_on(&self, id: &str) -> bool {
        self.state_and_links(id)
            .map(|(state, entity)| status::can_power_on(state, links_of(&entity)))
            .unwrap_or(false)
    }

    pub fn can_power_off(&self, id: &str) -> bool {
        self.state_and_links(id)
            .map(|(state, entity)| status::can_power_off(state, links_of(&entity)))
            .unwrap_or(false)
    }

    pub fn can_suspend(&self, id: &str) -> bool {
        self.state_and_links(id)
            .map(|(state, entity)| status::can_suspend(state, links_of(&entity)))
            .unwrap_or(false)
    }

    /// Only vApps can be deleted
    pub fn can_delete(&self, id: &str) -> bool {
        self.entities
            .vapp(id)
            .map(|vapp| status::can_delete(&vapp))
            .unwrap_or(false)
    }

    pub fn metrics(&self) -> Metrics {
        let mut metrics = Metrics::default();
        for vapp in self.entities.vapps() {
            if let Some(kb) = vapp.attr.storage_kb.as_deref().and_then(|s| s.trim().parse::<f64>().ok()) {
                metrics.total_storage += kb / 1000.0;
            }
            if let Some(mb) = vapp
                .attr
                .memory_allocation_mb
                .as_deref()
                .and_then(vcloud_model::template::parse_leading_int)
            {
                metrics.total_memory += mb;
            }
            match self.state_of_vapp(&vapp) {
                PowerState::Off => metrics.total_stopped += 1,
                PowerState::Suspended => metrics.total_suspended += 1,
                PowerState::Error => metrics.total_error += 1,
                _ => metrics.total_running += 1,
            }
        }
        metrics.tasks_per_hour = self.tasks.throughput_per_hour().ceil();
        metrics
    }
}

fn links_of(entity: &EntityRef) -> &vcloud_model::Links {
    match entity {
        EntityRef::VApp(vapp) => &vapp.links,
        EntityRef::Vm(vm) => &vm.links,
    }
}
