//! Address and subnet specifications.

use ipnet::IpNet;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::ParseError;

/// Address family of an [`AddressSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    /// IPv4 (32-bit addresses)
    V4,
    /// IPv6 (128-bit addresses)
    V6,
}

impl Family {
    /// Width of an address of this family, in bits.
    pub fn max_prefix_len(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reserved {
    Private,
    Loopback,
    LinkLocal,
}

static RESERVED_RANGES: Lazy<Vec<(IpNet, Reserved)>> = Lazy::new(|| {
    [
        ("10.0.0.0/8", Reserved::Private),
        ("172.16.0.0/12", Reserved::Private),
        ("192.168.0.0/16", Reserved::Private),
        ("fc00::/7", Reserved::Private),
        ("127.0.0.0/8", Reserved::Loopback),
        ("::1/128", Reserved::Loopback),
        ("169.254.0.0/16", Reserved::LinkLocal),
        ("fe80::/10", Reserved::LinkLocal),
    ]
    .into_iter()
    .filter_map(|(cidr, kind)| cidr.parse::<IpNet>().ok().map(|net| (net, kind)))
    .collect()
});

/// A normalized IPv4/IPv6 address or subnet.
///
/// The base address never has bits set beyond the prefix length; every
/// constructor truncates host bits, so `203.0.113.5/24` is stored as
/// `203.0.113.0/24`.
///
/// # Examples
/// ```
/// use ipban::AddressSpec;
///
/// let net = AddressSpec::parse("203.0.113.0/24").unwrap();
/// let host = AddressSpec::parse("203.0.113.5").unwrap();
/// assert!(net.contains(&host));
/// assert_eq!(host.to_string(), "203.0.113.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressSpec {
    net: IpNet,
}

impl AddressSpec {
    /// Parse a bare address (implicit full-length prefix) or `addr/prefix`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let (addr_part, prefix_part) = match text.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (text, None),
        };

        let addr: IpAddr = addr_part
            .parse()
            .map_err(|_| ParseError::InvalidAddress(addr_part.to_string()))?;
        let max = Family::of(&addr).max_prefix_len();

        let prefix = match prefix_part {
            None => max,
            Some(p) => parse_prefix(p, max)?,
        };

        let net = IpNet::new(addr, prefix)
            .map_err(|_| ParseError::PrefixOutOfRange { prefix, max })?;
        Ok(Self { net: net.trunc() })
    }

    /// Zero the host bits beyond the prefix. Idempotent.
    pub fn normalize(&self) -> Self {
        Self {
            net: self.net.trunc(),
        }
    }

    /// Address family.
    pub fn family(&self) -> Family {
        Family::of(&self.net.addr())
    }

    /// Network (base) address.
    pub fn network(&self) -> IpAddr {
        self.net.network()
    }

    /// Prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    /// Whether this spec covers more than a single host.
    pub fn has_subnet(&self) -> bool {
        self.net.prefix_len() < self.net.max_prefix_len()
    }

    /// The underlying network value.
    pub fn as_net(&self) -> &IpNet {
        &self.net
    }

    /// True iff `other`'s address space is a subset of this one's.
    pub fn contains(&self, other: &AddressSpec) -> bool {
        self.family() == other.family()
            && other.prefix_len() >= self.prefix_len()
            && IpNet::new(other.network(), self.prefix_len())
                .map(|masked| masked.trunc() == self.net)
                .unwrap_or(false)
    }

    /// True iff this spec contains the given address.
    pub fn contains_addr(&self, addr: IpAddr) -> bool {
        self.contains(&AddressSpec::from(addr))
    }

    /// True iff either spec contains the other.
    pub fn overlaps(&self, other: &AddressSpec) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// Overlaps a private range (RFC 1918, unique-local IPv6).
    pub fn is_private(&self) -> bool {
        self.touches(Reserved::Private)
    }

    /// Overlaps a loopback range.
    pub fn is_loopback(&self) -> bool {
        self.touches(Reserved::Loopback)
    }

    /// Overlaps a link-local range.
    pub fn is_link_local(&self) -> bool {
        self.touches(Reserved::LinkLocal)
    }

    /// Any of private, loopback or link-local.
    pub fn is_reserved(&self) -> bool {
        self.is_private() || self.is_loopback() || self.is_link_local()
    }

    fn touches(&self, kind: Reserved) -> bool {
        let subject = self.ipv4_mapped().unwrap_or(*self);
        RESERVED_RANGES
            .iter()
            .filter(|(_, k)| *k == kind)
            .any(|(range, _)| subject.overlaps(&AddressSpec { net: *range }))
    }

    /// The embedded IPv4 block of an IPv4-mapped IPv6 spec (`::ffff:a.b.c.d`).
    fn ipv4_mapped(&self) -> Option<AddressSpec> {
        let IpAddr::V6(v6) = self.network() else {
            return None;
        };
        if self.prefix_len() < 96 {
            return None;
        }
        let v4 = v6.to_ipv4_mapped()?;
        IpNet::new(IpAddr::V4(v4), self.prefix_len() - 96)
            .ok()
            .map(|net| AddressSpec { net: net.trunc() })
    }
}

fn parse_prefix(text: &str, max: u8) -> Result<u8, ParseError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidPrefix(text.to_string()));
    }
    let value: u32 = text
        .parse()
        .map_err(|_| ParseError::InvalidPrefix(text.to_string()))?;
    match u8::try_from(value) {
        Ok(prefix) if prefix <= max => Ok(prefix),
        _ => Err(ParseError::PrefixOutOfRange {
            prefix: u8::try_from(value).unwrap_or(u8::MAX),
            max,
        }),
    }
}

impl From<IpAddr> for AddressSpec {
    fn from(addr: IpAddr) -> Self {
        Self {
            net: IpNet::from(addr),
        }
    }
}

impl From<IpNet> for AddressSpec {
    fn from(net: IpNet) -> Self {
        Self { net: net.trunc() }
    }
}

impl FromStr for AddressSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_subnet() {
            write!(f, "{}/{}", self.net.network(), self.net.prefix_len())
        } else {
            write!(f, "{}", self.net.network())
        }
    }
}

impl Serialize for AddressSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AddressSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        AddressSpec::parse(&text).map_err(serde::de::Error::custom)
    }
}
