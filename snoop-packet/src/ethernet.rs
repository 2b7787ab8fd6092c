//! Link-layer headers: Ethernet II, 802.1Q tags, Linux cooked capture and BSD loopback

use std::fmt;

/// EtherType values the decoder dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// VLAN-tagged frame (0x8100)
    VLAN,
    /// IPv6 (0x86DD)
    IPv6,
    /// Q-in-Q/802.1ad (0x88A8)
    QinQ,
    /// 802.3 length field (<= 1500), LLC follows
    LLC,
    /// Custom EtherType
    Custom(u16),
}

impl EtherType {
    /// Convert EtherType to u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => 0x0800,
            EtherType::ARP => 0x0806,
            EtherType::VLAN => 0x8100,
            EtherType::IPv6 => 0x86DD,
            EtherType::QinQ => 0x88A8,
            EtherType::LLC => 0,
            EtherType::Custom(val) => val,
        }
    }

    /// Create EtherType from the type/length field
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0800 => EtherType::IPv4,
            0x0806 => EtherType::ARP,
            0x8100 => EtherType::VLAN,
            0x86DD => EtherType::IPv6,
            0x88A8 => EtherType::QinQ,
            // Values <= 1500 indicate length (LLC), values >= 1536 indicate EtherType
            len if len <= 1500 => EtherType::LLC,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::VLAN => write!(f, "VLAN"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::QinQ => write!(f, "Q-in-Q"),
            EtherType::LLC => write!(f, "LLC"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Broadcast MAC address (FF:FF:FF:FF:FF:FF)
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.get(..6)?.try_into().ok()?;
        Some(MacAddress(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

/// Ethernet II header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ethertype: EtherType,
}

impl EthernetHeader {
    /// Ethernet header size (dst + src + type/length)
    pub const SIZE: usize = 14;

    /// Parse the header, returning it with the remaining bytes
    ///
    /// For 802.3 frames the remainder is cut to the length field.
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::SIZE {
            return None;
        }

        let destination = MacAddress::from_slice(&data[0..6])?;
        let source = MacAddress::from_slice(&data[6..12])?;
        let raw_type = u16::from_be_bytes([data[12], data[13]]);
        let ethertype = EtherType::from_u16(raw_type);

        let rest = &data[Self::SIZE..];
        let rest = if ethertype == EtherType::LLC {
            &rest[..rest.len().min(raw_type as usize)]
        } else {
            rest
        };

        Some((
            EthernetHeader {
                destination,
                source,
                ethertype,
            },
            rest,
        ))
    }
}

/// 802.1Q / 802.1ad VLAN tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    pub priority: u8,
    pub vlan_id: u16,
    pub ethertype: EtherType,
}

impl VlanTag {
    pub const SIZE: usize = 4;

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::SIZE {
            return None;
        }
        let tci = u16::from_be_bytes([data[0], data[1]]);
        let ethertype = EtherType::from_u16(u16::from_be_bytes([data[2], data[3]]));
        Some((
            VlanTag {
                priority: (tci >> 13) as u8,
                vlan_id: tci & 0x0FFF,
                ethertype,
            },
            &data[Self::SIZE..],
        ))
    }
}

/// Linux "cooked" capture header (DLT_LINUX_SLL), used by the `any` device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinuxSllHeader {
    pub packet_type: u16,
    pub ethertype: EtherType,
}

impl LinuxSllHeader {
    pub const SIZE: usize = 16;

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < Self::SIZE {
            return None;
        }
        Some((
            LinuxSllHeader {
                packet_type: u16::from_be_bytes([data[0], data[1]]),
                ethertype: EtherType::from_u16(u16::from_be_bytes([data[14], data[15]])),
            },
            &data[Self::SIZE..],
        ))
    }
}

/// Address family carried by a BSD loopback header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackFamily {
    Inet,
    Inet6,
    Other(u32),
}

impl LoopbackFamily {
    pub const HEADER_SIZE: usize = 4;

    /// Decode the 4-byte family field. DLT_NULL stores it in host order, so
    /// both byte orders are tried.
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        let raw: [u8; 4] = data.get(..Self::HEADER_SIZE)?.try_into().ok()?;
        let family = [u32::from_le_bytes(raw), u32::from_be_bytes(raw)]
            .into_iter()
            .find_map(|value| match value {
                2 => Some(LoopbackFamily::Inet),
                // AF_INET6 differs between Linux, the BSDs and macOS
                10 | 24 | 28 | 30 => Some(LoopbackFamily::Inet6),
                _ => None,
            })
            .unwrap_or(LoopbackFamily::Other(u32::from_ne_bytes(raw)));
        Some((family, &data[Self::HEADER_SIZE..]))
    }
}
