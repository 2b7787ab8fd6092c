//! Synthetic frame construction
//!
//! [`FrameBuilder`] assembles Ethernet frames with consistent length fields
//! and checksums, for feeding known traffic through decoders and pipelines.
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use snoop_packet::{FrameBuilder, MacAddress};
//!
//! let frame = FrameBuilder::ethernet(MacAddress([0x02, 0, 0, 0, 0, 1]), MacAddress::BROADCAST)
//!     .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
//!     .tcp(40000, 443)
//!     .payload(b"hello, world".to_vec())
//!     .build();
//! assert_eq!(frame.len(), 14 + 20 + 20 + 12);
//! ```

use crate::checksum::{internet_checksum, transport_checksum, transport_checksum_v6};
use crate::ethernet::{EtherType, MacAddress};
use crate::ip::IpProtocol;
use bytes::{BufMut, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Minimum Ethernet frame size (without FCS)
const MIN_FRAME_SIZE: usize = 60;

#[derive(Debug, Clone)]
enum Network {
    Ipv4 { src: Ipv4Addr, dst: Ipv4Addr, ttl: u8 },
    Ipv6 { src: Ipv6Addr, dst: Ipv6Addr, hop_limit: u8 },
    Arp { sender: Ipv4Addr, target: Ipv4Addr },
}

#[derive(Debug, Clone)]
enum Transport {
    Tcp { src_port: u16, dst_port: u16, seq: u32 },
    Udp { src_port: u16, dst_port: u16 },
    Icmpv4Echo { id: u16, seq: u16 },
    Icmpv6Echo { id: u16, seq: u16 },
}

impl Transport {
    fn protocol(&self) -> IpProtocol {
        match self {
            Transport::Tcp { .. } => IpProtocol::TCP,
            Transport::Udp { .. } => IpProtocol::UDP,
            Transport::Icmpv4Echo { .. } => IpProtocol::ICMP,
            Transport::Icmpv6Echo { .. } => IpProtocol::ICMPv6,
        }
    }

    /// Header followed by payload, checksum field left zero
    fn encode(&self, payload: &[u8]) -> BytesMut {
        let mut buffer = BytesMut::with_capacity(20 + payload.len());
        match *self {
            Transport::Tcp {
                src_port,
                dst_port,
                seq,
            } => {
                buffer.put_u16(src_port);
                buffer.put_u16(dst_port);
                buffer.put_u32(seq);
                buffer.put_u32(0); // ack
                buffer.put_u8(5 << 4); // data offset, no options
                buffer.put_u8(0x18); // PSH | ACK
                buffer.put_u16(65535); // window
                buffer.put_u16(0); // checksum
                buffer.put_u16(0); // urgent pointer
            }
            Transport::Udp { src_port, dst_port } => {
                buffer.put_u16(src_port);
                buffer.put_u16(dst_port);
                buffer.put_u16((8 + payload.len()) as u16);
                buffer.put_u16(0);
            }
            Transport::Icmpv4Echo { id, seq } => {
                buffer.put_u8(8); // echo request
                buffer.put_u8(0);
                buffer.put_u16(0);
                buffer.put_u16(id);
                buffer.put_u16(seq);
            }
            Transport::Icmpv6Echo { id, seq } => {
                buffer.put_u8(128); // echo request
                buffer.put_u8(0);
                buffer.put_u16(0);
                buffer.put_u16(id);
                buffer.put_u16(seq);
            }
        }
        buffer.put_slice(payload);
        buffer
    }

    fn checksum_offset(&self) -> usize {
        match self {
            Transport::Tcp { .. } => 16,
            Transport::Udp { .. } => 6,
            Transport::Icmpv4Echo { .. } | Transport::Icmpv6Echo { .. } => 2,
        }
    }
}

/// Fluent builder for Ethernet frames
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    src: MacAddress,
    dst: MacAddress,
    network: Option<Network>,
    transport: Option<Transport>,
    payload: Vec<u8>,
}

impl FrameBuilder {
    /// Start an Ethernet II frame
    pub fn ethernet(src: MacAddress, dst: MacAddress) -> Self {
        FrameBuilder {
            src,
            dst,
            network: None,
            transport: None,
            payload: Vec::new(),
        }
    }

    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.network = Some(Network::Ipv4 { src, dst, ttl: 64 });
        self
    }

    pub fn ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.network = Some(Network::Ipv6 {
            src,
            dst,
            hop_limit: 64,
        });
        self
    }

    /// ARP who-has request; any transport or payload is ignored
    pub fn arp_request(mut self, sender: Ipv4Addr, target: Ipv4Addr) -> Self {
        self.network = Some(Network::Arp { sender, target });
        self
    }

    /// Set the TTL / hop limit of the IP layer
    ///
    /// Must be called after `ipv4()` or `ipv6()`.
    pub fn ttl(mut self, value: u8) -> Self {
        match self.network {
            Some(Network::Ipv4 { ref mut ttl, .. }) => *ttl = value,
            Some(Network::Ipv6 {
                ref mut hop_limit, ..
            }) => *hop_limit = value,
            _ => {}
        }
        self
    }

    pub fn tcp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.transport = Some(Transport::Tcp {
            src_port,
            dst_port,
            seq: 1,
        });
        self
    }

    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.transport = Some(Transport::Udp { src_port, dst_port });
        self
    }

    pub fn icmpv4_echo(mut self, id: u16, seq: u16) -> Self {
        self.transport = Some(Transport::Icmpv4Echo { id, seq });
        self
    }

    pub fn icmpv6_echo(mut self, id: u16, seq: u16) -> Self {
        self.transport = Some(Transport::Icmpv6Echo { id, seq });
        self
    }

    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Assemble the frame, padded to the Ethernet minimum
    pub fn build(self) -> Vec<u8> {
        let (ethertype, body) = match &self.network {
            Some(Network::Ipv4 { src, dst, ttl }) => {
                (EtherType::IPv4, self.ipv4_packet(*src, *dst, *ttl))
            }
            Some(Network::Ipv6 {
                src,
                dst,
                hop_limit,
            }) => (EtherType::IPv6, self.ipv6_packet(*src, *dst, *hop_limit)),
            Some(Network::Arp { sender, target }) => {
                (EtherType::ARP, self.arp_packet(*sender, *target))
            }
            None => (EtherType::Custom(0x88B5), BytesMut::from(&self.payload[..])),
        };

        let mut frame = BytesMut::with_capacity(MIN_FRAME_SIZE.max(14 + body.len()));
        frame.put_slice(self.dst.as_bytes());
        frame.put_slice(self.src.as_bytes());
        frame.put_u16(ethertype.to_u16());
        frame.put_slice(&body);

        let mut frame = frame.to_vec();
        if frame.len() < MIN_FRAME_SIZE {
            frame.resize(MIN_FRAME_SIZE, 0);
        }
        frame
    }

    fn segment(&self) -> (IpProtocol, BytesMut, Option<usize>) {
        match &self.transport {
            Some(transport) => (
                transport.protocol(),
                transport.encode(&self.payload),
                Some(transport.checksum_offset()),
            ),
            None => (
                IpProtocol::Custom(253),
                BytesMut::from(&self.payload[..]),
                None,
            ),
        }
    }

    fn ipv4_packet(&self, src: Ipv4Addr, dst: Ipv4Addr, ttl: u8) -> BytesMut {
        let (protocol, mut segment, checksum_at) = self.segment();
        if let Some(offset) = checksum_at {
            let checksum = match protocol {
                IpProtocol::ICMP => internet_checksum(&segment),
                _ => transport_checksum(&src.octets(), &dst.octets(), protocol.to_u8(), &segment),
            };
            segment[offset..offset + 2].copy_from_slice(&checksum.to_be_bytes());
        }

        let mut header = BytesMut::with_capacity(20 + segment.len());
        header.put_u8(0x45);
        header.put_u8(0);
        header.put_u16((20 + segment.len()) as u16);
        header.put_u16(0); // identification
        header.put_u16(0x4000); // don't fragment
        header.put_u8(ttl);
        header.put_u8(protocol.to_u8());
        header.put_u16(0);
        header.put_slice(&src.octets());
        header.put_slice(&dst.octets());
        let checksum = internet_checksum(&header[..20]);
        header[10..12].copy_from_slice(&checksum.to_be_bytes());

        header.put_slice(&segment);
        header
    }

    fn ipv6_packet(&self, src: Ipv6Addr, dst: Ipv6Addr, hop_limit: u8) -> BytesMut {
        let (protocol, mut segment, checksum_at) = self.segment();
        if let Some(offset) = checksum_at {
            let checksum =
                transport_checksum_v6(&src.octets(), &dst.octets(), protocol.to_u8(), &segment);
            segment[offset..offset + 2].copy_from_slice(&checksum.to_be_bytes());
        }

        let mut packet = BytesMut::with_capacity(40 + segment.len());
        packet.put_u32(6 << 28);
        packet.put_u16(segment.len() as u16);
        packet.put_u8(protocol.to_u8());
        packet.put_u8(hop_limit);
        packet.put_slice(&src.octets());
        packet.put_slice(&dst.octets());
        packet.put_slice(&segment);
        packet
    }

    fn arp_packet(&self, sender: Ipv4Addr, target: Ipv4Addr) -> BytesMut {
        let mut packet = BytesMut::with_capacity(28);
        packet.put_u16(1); // Ethernet
        packet.put_u16(EtherType::IPv4.to_u16());
        packet.put_u8(6);
        packet.put_u8(4);
        packet.put_u16(1); // request
        packet.put_slice(self.src.as_bytes());
        packet.put_slice(&sender.octets());
        packet.put_slice(&[0; 6]);
        packet.put_slice(&target.octets());
        packet
    }
}
