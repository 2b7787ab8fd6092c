//! Frame decoding into a [`LayerStack`]
//!
//! Decoding never fails as a whole: when a header is too short or malformed
//! the decoder appends a `DecodeFailure` layer and stops, keeping every layer
//! decoded so far.

use crate::ethernet::{EtherType, EthernetHeader, LinuxSllHeader, LoopbackFamily, VlanTag};
use crate::ip::{skip_ipv6_extension, IpProtocol, Ipv4Header, Ipv6Header};
use crate::layer::{Layer, LayerKind, LayerStack};
use crate::transport::{IcmpHeader, SctpHeader, TcpHeader, UdpHeader};

/// Maximum stacked VLAN tags before the rest is treated as payload
const MAX_VLAN_TAGS: usize = 2;

/// Maximum IPv6 extension headers walked before giving up
const MAX_IPV6_EXTENSIONS: usize = 8;

/// Maximum IP-in-IP nesting
const MAX_IP_DEPTH: usize = 3;

/// Data link type of a capture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// DLT_EN10MB
    Ethernet,
    /// DLT_NULL (BSD loopback, host byte order family)
    Null,
    /// DLT_LOOP (OpenBSD loopback, network byte order family)
    Loop,
    /// DLT_RAW: bare IPv4 or IPv6
    Raw,
    /// LINKTYPE_IPV4
    Ipv4,
    /// LINKTYPE_IPV6
    Ipv6,
    /// DLT_LINUX_SLL
    LinuxSll,
    /// Anything else
    Unknown(i32),
}

impl LinkType {
    /// Map a libpcap DLT value
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            0 => LinkType::Null,
            1 => LinkType::Ethernet,
            // DLT_RAW is 12 on most platforms, 14 on OpenBSD and 101 as a LINKTYPE
            12 | 14 | 101 => LinkType::Raw,
            108 => LinkType::Loop,
            113 => LinkType::LinuxSll,
            228 => LinkType::Ipv4,
            229 => LinkType::Ipv6,
            other => LinkType::Unknown(other),
        }
    }
}

/// Decode a captured frame of the given link type
pub fn decode(link_type: LinkType, data: &[u8]) -> LayerStack {
    let mut decoder = Decoder {
        stack: LayerStack::new(),
        ip_depth: 0,
    };
    decoder.link(link_type, data);
    decoder.stack
}

struct Decoder {
    stack: LayerStack,
    ip_depth: usize,
}

impl Decoder {
    fn fail(&mut self, expected: LayerKind, data: &[u8]) {
        self.stack.push(Layer::DecodeFailure {
            expected,
            remaining: data.len(),
        });
    }

    fn payload(&mut self, data: &[u8]) {
        if !data.is_empty() {
            self.stack.push(Layer::Payload { len: data.len() });
        }
    }

    fn link(&mut self, link_type: LinkType, data: &[u8]) {
        match link_type {
            LinkType::Ethernet => self.ethernet(data),
            LinkType::LinuxSll => match LinuxSllHeader::parse(data) {
                Some((header, rest)) => {
                    self.stack.push(Layer::LinuxSll {
                        packet_type: header.packet_type,
                    });
                    self.ethertype(header.ethertype, rest, 0);
                }
                None => self.fail(LayerKind::LinuxSll, data),
            },
            LinkType::Null | LinkType::Loop => match LoopbackFamily::parse(data) {
                Some((family, rest)) => {
                    self.stack.push(Layer::Loopback);
                    match family {
                        LoopbackFamily::Inet => self.ipv4(rest),
                        LoopbackFamily::Inet6 => self.ipv6(rest),
                        LoopbackFamily::Other(_) => self.payload(rest),
                    }
                }
                None => self.fail(LayerKind::Loopback, data),
            },
            LinkType::Raw => match data.first().map(|b| b >> 4) {
                Some(4) => self.ipv4(data),
                Some(6) => self.ipv6(data),
                _ => self.fail(LayerKind::Ipv4, data),
            },
            LinkType::Ipv4 => self.ipv4(data),
            LinkType::Ipv6 => self.ipv6(data),
            LinkType::Unknown(_) => self.fail(LayerKind::Ethernet, data),
        }
    }

    fn ethernet(&mut self, data: &[u8]) {
        let Some((header, rest)) = EthernetHeader::parse(data) else {
            return self.fail(LayerKind::Ethernet, data);
        };
        self.stack.push(Layer::Ethernet {
            source: header.source,
            destination: header.destination,
            ethertype: header.ethertype,
        });
        self.ethertype(header.ethertype, rest, 0);
    }

    fn ethertype(&mut self, ethertype: EtherType, data: &[u8], vlan_depth: usize) {
        match ethertype {
            EtherType::IPv4 => self.ipv4(data),
            EtherType::IPv6 => self.ipv6(data),
            EtherType::ARP => {
                // Opcode and addresses are not surfaced; a minimal header is 8 bytes
                if data.len() < 8 {
                    return self.fail(LayerKind::Arp, data);
                }
                self.stack.push(Layer::Arp);
            }
            EtherType::VLAN | EtherType::QinQ if vlan_depth < MAX_VLAN_TAGS => {
                match VlanTag::parse(data) {
                    Some((tag, rest)) => {
                        self.stack.push(Layer::Dot1Q {
                            vlan_id: tag.vlan_id,
                        });
                        self.ethertype(tag.ethertype, rest, vlan_depth + 1);
                    }
                    None => self.fail(LayerKind::Dot1Q, data),
                }
            }
            EtherType::LLC => {
                self.stack.push(Layer::Llc);
                // DSAP, SSAP, control
                self.payload(data.get(3..).unwrap_or_default());
            }
            _ => self.payload(data),
        }
    }

    fn ipv4(&mut self, data: &[u8]) {
        let Some((header, rest)) = Ipv4Header::parse(data) else {
            return self.fail(LayerKind::Ipv4, data);
        };
        self.stack.push(Layer::Ipv4 {
            source: header.source,
            destination: header.destination,
            protocol: header.protocol,
        });
        if header.fragment_offset != 0 {
            // Only the first fragment carries the upper-layer header
            return self.payload(rest);
        }
        self.ip_payload(header.protocol, rest);
    }

    fn ipv6(&mut self, data: &[u8]) {
        let Some((header, mut rest)) = Ipv6Header::parse(data) else {
            return self.fail(LayerKind::Ipv6, data);
        };
        self.stack.push(Layer::Ipv6 {
            source: header.source,
            destination: header.destination,
            next_header: header.next_header,
        });

        let mut next = header.next_header;
        for _ in 0..MAX_IPV6_EXTENSIONS {
            if !next.is_ipv6_extension() {
                break;
            }
            let fragment_offset = match next {
                IpProtocol::Fragment if rest.len() >= 4 => {
                    u16::from_be_bytes([rest[2], rest[3]]) >> 3
                }
                _ => 0,
            };
            match skip_ipv6_extension(next, rest) {
                Some((following, remainder)) if fragment_offset == 0 => {
                    next = following;
                    rest = remainder;
                }
                Some((_, remainder)) => return self.payload(remainder),
                None => return self.payload(rest),
            }
        }
        self.ip_payload(next, rest);
    }

    fn ip_payload(&mut self, protocol: IpProtocol, data: &[u8]) {
        match protocol {
            IpProtocol::TCP => match TcpHeader::parse(data) {
                Some((header, rest)) => {
                    self.stack.push(Layer::Tcp {
                        source_port: header.source_port,
                        destination_port: header.destination_port,
                    });
                    self.payload(rest);
                }
                None => self.fail(LayerKind::Tcp, data),
            },
            IpProtocol::UDP => match UdpHeader::parse(data) {
                Some((header, rest)) => {
                    self.stack.push(Layer::Udp {
                        source_port: header.source_port,
                        destination_port: header.destination_port,
                    });
                    self.payload(rest);
                }
                None => self.fail(LayerKind::Udp, data),
            },
            IpProtocol::SCTP => match SctpHeader::parse(data) {
                Some((header, rest)) => {
                    self.stack.push(Layer::Sctp {
                        source_port: header.source_port,
                        destination_port: header.destination_port,
                    });
                    self.payload(rest);
                }
                None => self.fail(LayerKind::Sctp, data),
            },
            IpProtocol::ICMP => match IcmpHeader::parse(data, IcmpHeader::V4_HEADER_SIZE) {
                Some((header, rest)) => {
                    self.stack.push(Layer::Icmpv4 {
                        icmp_type: header.icmp_type,
                        code: header.code,
                    });
                    self.payload(rest);
                }
                None => self.fail(LayerKind::Icmpv4, data),
            },
            IpProtocol::ICMPv6 => match IcmpHeader::parse(data, IcmpHeader::V6_HEADER_SIZE) {
                Some((header, rest)) => {
                    self.stack.push(Layer::Icmpv6 {
                        icmp_type: header.icmp_type,
                        code: header.code,
                    });
                    self.payload(rest);
                }
                None => self.fail(LayerKind::Icmpv6, data),
            },
            IpProtocol::IPv4 | IpProtocol::IPv6 if self.ip_depth < MAX_IP_DEPTH => {
                self.ip_depth += 1;
                if protocol == IpProtocol::IPv4 {
                    self.ipv4(data);
                } else {
                    self.ipv6(data);
                }
            }
            IpProtocol::NoNextHeader => {}
            _ => self.payload(data),
        }
    }
}
