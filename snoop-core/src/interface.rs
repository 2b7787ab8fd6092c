//! Network interface descriptors

use std::fmt;
use std::net::IpAddr;

/// One address assigned to an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub addr: IpAddr,
    pub netmask: Option<IpAddr>,
    pub broadcast: Option<IpAddr>,
}

/// Interface status flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceFlags {
    /// Administratively up
    pub up: bool,
    /// Operationally running
    pub running: bool,
    /// Loopback device
    pub loopback: bool,
    /// Wireless device
    pub wireless: bool,
}

impl fmt::Display for InterfaceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.up, "UP"),
            (self.running, "RUNNING"),
            (self.loopback, "LOOPBACK"),
            (self.wireless, "WIRELESS"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();

        write!(f, "<{}>", names.join(","))
    }
}

/// A capture-capable network device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Interface name (e.g., "eth0", "wlan0")
    pub name: String,
    /// Human-readable description, when the platform provides one
    pub description: Option<String>,
    /// Assigned addresses
    pub addresses: Vec<InterfaceAddress>,
    /// Status flags
    pub flags: InterfaceFlags,
}

impl InterfaceInfo {
    /// Create a descriptor with no addresses and default flags
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            description: None,
            addresses: Vec::new(),
            flags: InterfaceFlags::default(),
        }
    }

    /// Get the primary IPv4 address if available
    pub fn primary_ipv4(&self) -> Option<IpAddr> {
        self.addresses
            .iter()
            .map(|a| a.addr)
            .find(|ip| ip.is_ipv4())
    }

    /// Get the primary IPv6 address if available
    pub fn primary_ipv6(&self) -> Option<IpAddr> {
        self.addresses
            .iter()
            .map(|a| a.addr)
            .find(|ip| ip.is_ipv6())
    }
}

impl fmt::Display for InterfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.flags)?;
        if let Some(description) = &self.description {
            write!(f, " ({})", description)?;
        }
        for address in &self.addresses {
            write!(f, " {}", address.addr)?;
        }
        Ok(())
    }
}
