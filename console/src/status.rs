//! Power state of VMs and vApps

use serde::Serialize;
use vcloud_model::{Links, VApp, Vm};

/// Server status codes for VMs
const VM_SUSPENDED: i32 = 3;
const VM_ON: i32 = 4;
const VM_OFF: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    On,
    Off,
    Working,
    Suspended,
    Error,
    Partial,
}

impl PowerState {
    /// English label, also folded into vApp search terms
    pub fn label(&self) -> &'static str {
        match self {
            PowerState::On => "Powered On",
            PowerState::Off => "Powered Off",
            PowerState::Working => "Working...",
            PowerState::Suspended => "Suspended",
            PowerState::Error => "Error!",
            PowerState::Partial => "Partially On",
        }
    }

    pub fn from_vm_code(code: Option<i32>) -> Self {
        match code {
            Some(VM_ON) => PowerState::On,
            Some(VM_OFF) => PowerState::Off,
            Some(VM_SUSPENDED) => PowerState::Suspended,
            _ => PowerState::Error,
        }
    }
}

pub fn vm_state(vm: &Vm, busy: bool) -> PowerState {
    if busy {
        return PowerState::Working;
    }
    PowerState::from_vm_code(vm.status_code())
}

/// Aggregate a vApp's state from its VMs
pub fn vapp_state(children: &[Vm], busy: bool) -> PowerState {
    if busy {
        return PowerState::Working;
    }

    let mut on = 0;
    let mut suspended = 0;
    for vm in children {
        match vm_state(vm, false) {
            PowerState::On => on += 1,
            PowerState::Suspended => suspended += 1,
            PowerState::Error => return PowerState::Error,
            _ => {}
        }
    }

    let total = children.len();
    if on == 0 && suspended == 0 {
        PowerState::Off
    } else if on == total {
        PowerState::On
    } else if suspended == total {
        PowerState::Suspended
    } else {
        PowerState::Partial
    }
}

pub fn can_power_on(state: PowerState, links: &Links) -> bool {
    matches!(
        state,
        PowerState::Off | PowerState::Partial | PowerState::Suspended
    ) && links.contains("power:powerOn")
}

pub fn can_power_off(state: PowerState, links: &Links) -> bool {
    matches!(
        state,
        PowerState::On | PowerState::Partial | PowerState::Suspended
    ) && links.contains("power:powerOff")
}

pub fn can_suspend(state: PowerState, links: &Links) -> bool {
    state == PowerState::On && links.contains("power:suspend")
}

pub fn can_delete(vapp: &VApp) -> bool {
    vapp.links.contains("remove")
}
