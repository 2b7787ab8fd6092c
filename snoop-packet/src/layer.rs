//! Decoded layer stack
//!
//! A frame decodes into an ordered list of [`Layer`]s, outermost first. The
//! set of variants is closed; each variant answers the classification
//! capabilities ([`Layer::addresses`], [`Layer::ports`]) itself, so supporting
//! a new protocol means adding a variant and its extraction arm.

use crate::ethernet::{EtherType, MacAddress};
use crate::ip::IpProtocol;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Layer type, independent of the decoded field values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Ethernet,
    Dot1Q,
    LinuxSll,
    Loopback,
    Arp,
    Llc,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Sctp,
    Icmpv4,
    Icmpv6,
    Payload,
    DecodeFailure,
}

impl LayerKind {
    /// Conventional type name, as shown in protocol labels
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Ethernet => "Ethernet",
            LayerKind::Dot1Q => "Dot1Q",
            LayerKind::LinuxSll => "LinuxSLL",
            LayerKind::Loopback => "Loopback",
            LayerKind::Arp => "ARP",
            LayerKind::Llc => "LLC",
            LayerKind::Ipv4 => "IPv4",
            LayerKind::Ipv6 => "IPv6",
            LayerKind::Tcp => "TCP",
            LayerKind::Udp => "UDP",
            LayerKind::Sctp => "SCTP",
            LayerKind::Icmpv4 => "ICMPv4",
            LayerKind::Icmpv6 => "ICMPv6",
            LayerKind::Payload => "Payload",
            LayerKind::DecodeFailure => "DecodeFailure",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded protocol layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Ethernet {
        source: MacAddress,
        destination: MacAddress,
        ethertype: EtherType,
    },
    Dot1Q {
        vlan_id: u16,
    },
    LinuxSll {
        packet_type: u16,
    },
    Loopback,
    Arp,
    Llc,
    Ipv4 {
        source: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: IpProtocol,
    },
    Ipv6 {
        source: Ipv6Addr,
        destination: Ipv6Addr,
        next_header: IpProtocol,
    },
    Tcp {
        source_port: u16,
        destination_port: u16,
    },
    Udp {
        source_port: u16,
        destination_port: u16,
    },
    Sctp {
        source_port: u16,
        destination_port: u16,
    },
    Icmpv4 {
        icmp_type: u8,
        code: u8,
    },
    Icmpv6 {
        icmp_type: u8,
        code: u8,
    },
    Payload {
        len: usize,
    },
    /// The remaining bytes could not be decoded as the expected layer
    DecodeFailure {
        expected: LayerKind,
        remaining: usize,
    },
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Ethernet { .. } => LayerKind::Ethernet,
            Layer::Dot1Q { .. } => LayerKind::Dot1Q,
            Layer::LinuxSll { .. } => LayerKind::LinuxSll,
            Layer::Loopback => LayerKind::Loopback,
            Layer::Arp => LayerKind::Arp,
            Layer::Llc => LayerKind::Llc,
            Layer::Ipv4 { .. } => LayerKind::Ipv4,
            Layer::Ipv6 { .. } => LayerKind::Ipv6,
            Layer::Tcp { .. } => LayerKind::Tcp,
            Layer::Udp { .. } => LayerKind::Udp,
            Layer::Sctp { .. } => LayerKind::Sctp,
            Layer::Icmpv4 { .. } => LayerKind::Icmpv4,
            Layer::Icmpv6 { .. } => LayerKind::Icmpv6,
            Layer::Payload { .. } => LayerKind::Payload,
            Layer::DecodeFailure { .. } => LayerKind::DecodeFailure,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Network-layer source and destination, for IP layers
    pub fn addresses(&self) -> Option<(IpAddr, IpAddr)> {
        match *self {
            Layer::Ipv4 {
                source,
                destination,
                ..
            } => Some((IpAddr::V4(source), IpAddr::V4(destination))),
            Layer::Ipv6 {
                source,
                destination,
                ..
            } => Some((IpAddr::V6(source), IpAddr::V6(destination))),
            _ => None,
        }
    }

    /// Transport source and destination ports, for port-bearing layers
    pub fn ports(&self) -> Option<(u16, u16)> {
        match *self {
            Layer::Tcp {
                source_port,
                destination_port,
            }
            | Layer::Udp {
                source_port,
                destination_port,
            }
            | Layer::Sctp {
                source_port,
                destination_port,
            } => Some((source_port, destination_port)),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered sequence of decoded layers, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(Layer::kind).collect()
    }

    pub fn contains(&self, kind: LayerKind) -> bool {
        self.layers.iter().any(|layer| layer.kind() == kind)
    }

    /// First (outermost) layer of the given kind
    pub fn find(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.kind() == kind)
    }

    /// Addresses of the outermost IP layer
    pub fn addresses(&self) -> Option<(IpAddr, IpAddr)> {
        self.layers.iter().find_map(Layer::addresses)
    }

    /// Ports of the outermost port-bearing layer
    pub fn ports(&self) -> Option<(u16, u16)> {
        self.layers.iter().find_map(Layer::ports)
    }
}

impl FromIterator<Layer> for LayerStack {
    fn from_iter<I: IntoIterator<Item = Layer>>(iter: I) -> Self {
        Self {
            layers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}
