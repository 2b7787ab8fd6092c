//! Transport and control headers: TCP, UDP, SCTP, ICMPv4 and ICMPv6
//!
//! Only the fields needed for classification are read; options, chunks and
//! message bodies are left to the payload.

/// Parsed TCP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgment: u32,
    pub data_offset: u8,
    pub flags: u8,
}

impl TcpHeader {
    pub const MIN_HEADER_SIZE: usize = 20;

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }
        let data_offset = data[12] >> 4;
        let header_len = (data_offset as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE || data.len() < header_len {
            return None;
        }

        Some((
            TcpHeader {
                source_port: u16::from_be_bytes([data[0], data[1]]),
                destination_port: u16::from_be_bytes([data[2], data[3]]),
                sequence: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
                acknowledgment: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
                data_offset,
                flags: data[13],
            },
            &data[header_len..],
        ))
    }
}

/// Parsed UDP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
}

impl UdpHeader {
    pub const HEADER_SIZE: usize = 8;

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }
        let length = u16::from_be_bytes([data[4], data[5]]);
        let end = (length as usize).clamp(Self::HEADER_SIZE, data.len());
        Some((
            UdpHeader {
                source_port: u16::from_be_bytes([data[0], data[1]]),
                destination_port: u16::from_be_bytes([data[2], data[3]]),
                length,
            },
            &data[Self::HEADER_SIZE..end],
        ))
    }
}

/// SCTP common header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SctpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub verification_tag: u32,
}

impl SctpHeader {
    pub const HEADER_SIZE: usize = 12;

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }
        Some((
            SctpHeader {
                source_port: u16::from_be_bytes([data[0], data[1]]),
                destination_port: u16::from_be_bytes([data[2], data[3]]),
                verification_tag: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            },
            &data[Self::HEADER_SIZE..],
        ))
    }
}

/// ICMPv4/ICMPv6 type and code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
}

impl IcmpHeader {
    /// ICMPv4 header including the 4-byte rest-of-header field
    pub const V4_HEADER_SIZE: usize = 8;
    /// ICMPv6 header; the message body is left to the payload
    pub const V6_HEADER_SIZE: usize = 4;

    pub fn parse(data: &[u8], header_size: usize) -> Option<(Self, &[u8])> {
        if data.len() < header_size {
            return None;
        }
        Some((
            IcmpHeader {
                icmp_type: data[0],
                code: data[1],
            },
            &data[header_size..],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_parse_with_options() {
        let mut segment = vec![
            0x1f, 0x90, 0x00, 0x50, 0, 0, 0, 1, 0, 0, 0, 0, 0x60, 0x02, 0xff, 0xff, 0, 0, 0, 0,
        ];
        segment.extend_from_slice(&[2, 4, 5, 0xb4]);
        segment.extend_from_slice(b"GET");

        let (header, payload) = TcpHeader::parse(&segment).unwrap();
        assert_eq!(header.source_port, 8080);
        assert_eq!(header.destination_port, 80);
        assert_eq!(header.sequence, 1);
        assert_eq!(header.data_offset, 6);
        assert_eq!(header.flags, 0x02);
        assert_eq!(payload, b"GET");
    }

    #[test]
    fn test_tcp_rejects_bad_offset() {
        let mut segment = vec![0u8; 20];
        segment[12] = 0x40;
        assert!(TcpHeader::parse(&segment).is_none());
        segment[12] = 0xf0;
        assert!(TcpHeader::parse(&segment).is_none());
    }

    #[test]
    fn test_udp_parse() {
        let datagram = [0x00, 0x35, 0xc0, 0x00, 0x00, 0x0a, 0, 0, 0xab, 0xcd, 0xee];
        let (header, payload) = UdpHeader::parse(&datagram).unwrap();
        assert_eq!(header.source_port, 53);
        assert_eq!(header.destination_port, 49152);
        assert_eq!(payload, &[0xab, 0xcd]);
        assert!(UdpHeader::parse(&datagram[..6]).is_none());
    }

    #[test]
    fn test_sctp_and_icmp_parse() {
        let sctp = [0x0b, 0x59, 0x0b, 0x59, 0, 0, 0, 7, 0, 0, 0, 0, 1];
        let (header, rest) = SctpHeader::parse(&sctp).unwrap();
        assert_eq!(header.source_port, 2905);
        assert_eq!(header.verification_tag, 7);
        assert_eq!(rest, &[1]);

        let icmp = [8, 0, 0, 0, 0, 1, 0, 1, 0x61];
        let (header, rest) = IcmpHeader::parse(&icmp, IcmpHeader::V4_HEADER_SIZE).unwrap();
        assert_eq!(header.icmp_type, 8);
        assert_eq!(rest, &[0x61]);
        assert!(IcmpHeader::parse(&icmp[..3], IcmpHeader::V6_HEADER_SIZE).is_none());
    }
}
