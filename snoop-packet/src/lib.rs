//! Frame decoding library for snoop
//!
//! This crate turns captured link-layer frames into an ordered stack of
//! protocol layers and renders raw bytes for display. It includes support for:
//!
//! - **Ethernet II / 802.3** frames, with 802.1Q tags
//! - **Linux cooked (SLL)**, BSD loopback and raw IP link types
//! - **IPv4 / IPv6** with extension-header skipping
//! - **TCP / UDP / SCTP / ICMPv4 / ICMPv6**
//!
//! # Architecture
//!
//! - [`decode`] - Link-type dispatch and the layer decoder
//! - [`layer`] - The closed set of decoded [`Layer`]s and the [`LayerStack`]
//! - [`ethernet`], [`ip`], [`transport`] - Header parsers
//! - [`hexdump`] - Canonical hex dump rendering
//! - [`builder`] - Synthetic frame construction, used by tests
//! - [`checksum`] - Internet checksum calculation utilities
//!
//! # Quick Start
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use snoop_packet::{decode, FrameBuilder, LayerKind, LinkType, MacAddress};
//!
//! let frame = FrameBuilder::ethernet(MacAddress([2, 0, 0, 0, 0, 1]), MacAddress::BROADCAST)
//!     .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
//!     .udp(5353, 53)
//!     .payload(b"query".to_vec())
//!     .build();
//!
//! let stack = decode(LinkType::Ethernet, &frame);
//! assert_eq!(
//!     stack.kinds(),
//!     vec![LayerKind::Ethernet, LayerKind::Ipv4, LayerKind::Udp, LayerKind::Payload]
//! );
//! assert_eq!(stack.ports(), Some((5353, 53)));
//! ```

pub mod builder;
pub mod checksum;
pub mod decode;
pub mod ethernet;
pub mod hexdump;
pub mod ip;
pub mod layer;
pub mod transport;

// Re-export commonly used types for convenience
pub use builder::FrameBuilder;
pub use checksum::{internet_checksum, transport_checksum, transport_checksum_v6};
pub use decode::{decode, LinkType};
pub use ethernet::{EtherType, EthernetHeader, MacAddress};
pub use hexdump::hex_dump;
pub use ip::IpProtocol;
pub use layer::{Layer, LayerKind, LayerStack};
