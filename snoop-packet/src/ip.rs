//! IPv4 and IPv6 header parsing

use std::net::{Ipv4Addr, Ipv6Addr};

/// IP protocol / IPv6 next-header numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// IPv6 Hop-by-Hop options (0)
    HopByHop,
    /// ICMP (1)
    ICMP,
    /// IPv4-in-IP encapsulation (4)
    IPv4,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// IPv6 encapsulation (41)
    IPv6,
    /// IPv6 routing header (43)
    Routing,
    /// IPv6 fragment header (44)
    Fragment,
    /// ICMPv6 (58)
    ICMPv6,
    /// IPv6 no next header (59)
    NoNextHeader,
    /// IPv6 destination options (60)
    DestinationOptions,
    /// SCTP (132)
    SCTP,
    /// Custom protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::HopByHop => 0,
            IpProtocol::ICMP => 1,
            IpProtocol::IPv4 => 4,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::IPv6 => 41,
            IpProtocol::Routing => 43,
            IpProtocol::Fragment => 44,
            IpProtocol::ICMPv6 => 58,
            IpProtocol::NoNextHeader => 59,
            IpProtocol::DestinationOptions => 60,
            IpProtocol::SCTP => 132,
            IpProtocol::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => IpProtocol::HopByHop,
            1 => IpProtocol::ICMP,
            4 => IpProtocol::IPv4,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            41 => IpProtocol::IPv6,
            43 => IpProtocol::Routing,
            44 => IpProtocol::Fragment,
            58 => IpProtocol::ICMPv6,
            59 => IpProtocol::NoNextHeader,
            60 => IpProtocol::DestinationOptions,
            132 => IpProtocol::SCTP,
            val => IpProtocol::Custom(val),
        }
    }

    /// IPv6 extension headers that are skipped while looking for the upper layer
    pub fn is_ipv6_extension(self) -> bool {
        matches!(
            self,
            IpProtocol::HopByHop
                | IpProtocol::Routing
                | IpProtocol::Fragment
                | IpProtocol::DestinationOptions
        )
    }
}

/// Parsed IPv4 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub ihl: u8,
    pub total_length: u16,
    pub fragment_offset: u16,
    pub more_fragments: bool,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Minimum IPv4 header size (no options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Parse an IPv4 header, returning it with its payload
    ///
    /// The payload is bounded by the total length field so link-layer padding
    /// is not mistaken for upper-layer data.
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }

        let version = data[0] >> 4;
        let ihl = data[0] & 0x0F;
        if version != 4 {
            return None;
        }

        let header_len = (ihl as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE || data.len() < header_len {
            return None;
        }

        let total_length = u16::from_be_bytes([data[2], data[3]]);
        let flags_and_offset = u16::from_be_bytes([data[6], data[7]]);

        let end = (total_length as usize).clamp(header_len, data.len());
        let header = Ipv4Header {
            ihl,
            total_length,
            fragment_offset: flags_and_offset & 0x1FFF,
            more_fragments: flags_and_offset & 0x2000 != 0,
            ttl: data[8],
            protocol: IpProtocol::from_u8(data[9]),
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
        };
        Some((header, &data[header_len..end]))
    }

    /// Get the header size in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }
}

/// Parsed IPv6 fixed header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    pub payload_length: u16,
    pub next_header: IpProtocol,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
}

impl Ipv6Header {
    pub const HEADER_SIZE: usize = 40;

    /// Parse the fixed header, returning it with its payload
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::HEADER_SIZE || data[0] >> 4 != 6 {
            return None;
        }

        let payload_length = u16::from_be_bytes([data[4], data[5]]);
        let source: [u8; 16] = data[8..24].try_into().ok()?;
        let destination: [u8; 16] = data[24..40].try_into().ok()?;

        let rest = &data[Self::HEADER_SIZE..];
        // Jumbograms carry a zero payload length; keep the whole remainder then
        let rest = match payload_length as usize {
            0 => rest,
            len => &rest[..len.min(rest.len())],
        };

        Some((
            Ipv6Header {
                payload_length,
                next_header: IpProtocol::from_u8(data[6]),
                hop_limit: data[7],
                source: Ipv6Addr::from(source),
                destination: Ipv6Addr::from(destination),
            },
            rest,
        ))
    }
}

/// Skip one IPv6 extension header, returning the next header and the remainder
pub fn skip_ipv6_extension(kind: IpProtocol, data: &[u8]) -> Option<(IpProtocol, &[u8])> {
    if data.len() < 8 {
        return None;
    }
    let next = IpProtocol::from_u8(data[0]);
    let len = match kind {
        IpProtocol::Fragment => 8,
        _ => (data[1] as usize + 1) * 8,
    };
    data.get(len..).map(|rest| (next, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_header(total_length: u16, protocol: u8) -> Vec<u8> {
        let mut header = vec![
            0x45, 0x00, 0x00, 0x00, 0x12, 0x34, 0x40, 0x00, 64, protocol, 0x00, 0x00, 192, 168, 1,
            1, 192, 168, 1, 2,
        ];
        header[2..4].copy_from_slice(&total_length.to_be_bytes());
        header
    }

    #[test]
    fn test_protocol_conversion() {
        for value in [0u8, 1, 4, 6, 17, 41, 43, 44, 58, 59, 60, 132, 200] {
            assert_eq!(IpProtocol::from_u8(value).to_u8(), value);
        }
        assert!(IpProtocol::Routing.is_ipv6_extension());
        assert!(!IpProtocol::TCP.is_ipv6_extension());
    }

    #[test]
    fn test_ipv4_parse_trims_padding() {
        let mut data = ipv4_header(24, 17);
        data.extend_from_slice(&[1, 2, 3, 4, 0, 0, 0, 0]);

        let (header, payload) = Ipv4Header::parse(&data).unwrap();
        assert_eq!(header.protocol, IpProtocol::UDP);
        assert_eq!(header.source, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(header.destination, Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(header.header_len(), 20);
        assert_eq!(payload, &[1, 2, 3, 4]);
    }

    #[test]
    fn test_ipv4_rejects_bad_version_and_short_input() {
        let mut data = ipv4_header(20, 6);
        data[0] = 0x65;
        assert!(Ipv4Header::parse(&data).is_none());
        assert!(Ipv4Header::parse(&[0x45; 10]).is_none());
    }

    #[test]
    fn test_ipv6_parse() {
        let mut data = vec![0x60, 0, 0, 0, 0x00, 0x02, 6, 64];
        data.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        data.extend_from_slice(&Ipv6Addr::UNSPECIFIED.octets());
        data.extend_from_slice(&[0xaa, 0xbb, 0xcc]);

        let (header, payload) = Ipv6Header::parse(&data).unwrap();
        assert_eq!(header.next_header, IpProtocol::TCP);
        assert_eq!(header.source, Ipv6Addr::LOCALHOST);
        assert_eq!(payload, &[0xaa, 0xbb]);
    }

    #[test]
    fn test_skip_extension() {
        let ext = [6u8, 0, 0, 0, 0, 0, 0, 0, 0xde, 0xad];
        let (next, rest) = skip_ipv6_extension(IpProtocol::HopByHop, &ext).unwrap();
        assert_eq!(next, IpProtocol::TCP);
        assert_eq!(rest, &[0xde, 0xad]);
        assert!(skip_ipv6_extension(IpProtocol::Routing, &ext[..4]).is_none());
    }
}
