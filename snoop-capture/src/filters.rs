//! Protocol selection compiled into a BPF (Berkeley Packet Filter) expression

use snoop_core::{Error, Result};
use snoop_packet::{LayerKind, LayerStack};
use std::fmt;

/// A protocol that can be selected for capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterProtocol {
    Tcp,
    Udp,
    Sctp,
    Icmp,
    Icmp6,
    Ip,
    Ip6,
    Arp,
}

impl FilterProtocol {
    /// Parse one selection token, case-insensitively
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "tcp" => Some(FilterProtocol::Tcp),
            "udp" => Some(FilterProtocol::Udp),
            "sctp" => Some(FilterProtocol::Sctp),
            "icmp" | "icmp4" | "icmpv4" => Some(FilterProtocol::Icmp),
            "icmp6" | "icmpv6" => Some(FilterProtocol::Icmp6),
            "ip" | "ipv4" => Some(FilterProtocol::Ip),
            "ip6" | "ipv6" => Some(FilterProtocol::Ip6),
            "arp" => Some(FilterProtocol::Arp),
            _ => None,
        }
    }

    /// BPF primitive for this protocol
    pub fn primitive(self) -> &'static str {
        match self {
            FilterProtocol::Tcp => "tcp",
            FilterProtocol::Udp => "udp",
            FilterProtocol::Sctp => "sctp",
            FilterProtocol::Icmp => "icmp",
            FilterProtocol::Icmp6 => "icmp6",
            FilterProtocol::Ip => "ip",
            FilterProtocol::Ip6 => "ip6",
            FilterProtocol::Arp => "arp",
        }
    }

    /// Decoded layer this primitive selects
    fn layer(self) -> LayerKind {
        match self {
            FilterProtocol::Tcp => LayerKind::Tcp,
            FilterProtocol::Udp => LayerKind::Udp,
            FilterProtocol::Sctp => LayerKind::Sctp,
            FilterProtocol::Icmp => LayerKind::Icmpv4,
            FilterProtocol::Icmp6 => LayerKind::Icmpv6,
            FilterProtocol::Ip => LayerKind::Ipv4,
            FilterProtocol::Ip6 => LayerKind::Ipv6,
            FilterProtocol::Arp => LayerKind::Arp,
        }
    }
}

impl fmt::Display for FilterProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primitive())
    }
}

/// Selection keywords that disable filtering
fn is_unfiltered_keyword(token: &str) -> bool {
    token.eq_ignore_ascii_case("all") || token.eq_ignore_ascii_case("none")
}

/// A compiled protocol selection, shared read-only by every worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureFilter {
    protocols: Vec<FilterProtocol>,
}

impl CaptureFilter {
    /// Filter that accepts every frame
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Compile a protocol selection
    ///
    /// Each entry may itself hold several names separated by whitespace,
    /// commas or the connective `or`. `all` or `none` anywhere in the
    /// selection, or an empty selection, yields an unfiltered capture.
    pub fn compile<S: AsRef<str>>(selection: &[S]) -> Result<Self> {
        let mut protocols = Vec::new();
        let mut unfiltered = false;

        let tokens = selection
            .iter()
            .flat_map(|entry| entry.as_ref().split(|c: char| c.is_whitespace() || c == ','))
            .filter(|token| !token.is_empty() && !token.eq_ignore_ascii_case("or"));

        for token in tokens {
            if is_unfiltered_keyword(token) {
                unfiltered = true;
                continue;
            }

            let protocol = FilterProtocol::parse(token)
                .ok_or_else(|| Error::InvalidFilterSpec(token.to_string()))?;
            if !protocols.contains(&protocol) {
                protocols.push(protocol);
            }
        }

        if unfiltered {
            protocols.clear();
        }

        Ok(Self { protocols })
    }

    /// Selected protocols in first-seen order
    pub fn protocols(&self) -> &[FilterProtocol] {
        &self.protocols
    }

    pub fn is_unfiltered(&self) -> bool {
        self.protocols.is_empty()
    }

    /// BPF expression, or `None` when every frame is accepted
    pub fn expression(&self) -> Option<String> {
        if self.is_unfiltered() {
            return None;
        }

        Some(
            self.protocols
                .iter()
                .map(|p| p.primitive())
                .collect::<Vec<_>>()
                .join(" or "),
        )
    }

    /// Evaluate the selection against a decoded frame
    pub fn matches(&self, stack: &LayerStack) -> bool {
        self.is_unfiltered() || self.protocols.iter().any(|p| stack.contains(p.layer()))
    }
}

impl fmt::Display for CaptureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expression() {
            Some(expression) => f.write_str(&expression),
            None => f.write_str("<none>"),
        }
    }
}
