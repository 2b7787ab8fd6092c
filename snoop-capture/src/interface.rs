//! Network interface enumeration and selection

use snoop_core::{Error, InterfaceAddress, InterfaceFlags, InterfaceInfo, Result};
use tracing::warn;

use crate::backend::CaptureBackend;

fn address_from_pcap(address: &pcap::Address) -> InterfaceAddress {
    InterfaceAddress {
        addr: address.addr,
        netmask: address.netmask,
        broadcast: address.broadcast_addr,
    }
}

/// Convert a pcap device descriptor
pub fn interface_from_device(device: &pcap::Device) -> InterfaceInfo {
    InterfaceInfo {
        name: device.name.clone(),
        description: device.desc.clone(),
        addresses: device.addresses.iter().map(address_from_pcap).collect(),
        flags: InterfaceFlags {
            up: device.flags.is_up(),
            running: device.flags.is_running(),
            loopback: device.flags.is_loopback(),
            wireless: device.flags.is_wireless(),
        },
    }
}

/// Restrict enumerated interfaces to an allow-list
///
/// An empty allow-list keeps every interface. Names that were not
/// enumerated are logged and skipped. Order follows the enumeration.
pub fn select_interfaces(interfaces: Vec<InterfaceInfo>, allow: &[String]) -> Vec<InterfaceInfo> {
    if allow.is_empty() {
        return interfaces;
    }

    for name in allow {
        if !interfaces.iter().any(|iface| &iface.name == name) {
            warn!(interface = %name, "Requested interface not found; skipping");
        }
    }

    interfaces
        .into_iter()
        .filter(|iface| allow.contains(&iface.name))
        .collect()
}

/// Enumerate and select the interfaces a session will capture on
pub fn resolve_interfaces(backend: &dyn CaptureBackend, allow: &[String]) -> Result<Vec<InterfaceInfo>> {
    let selected = select_interfaces(backend.interfaces()?, allow);
    if selected.is_empty() {
        return Err(Error::NoInterfacesAvailable);
    }
    Ok(selected)
}
