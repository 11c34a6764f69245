//! Switch, port, MAC and zone identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ZoneflowError;

/// Datapath identifier of a switch connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwitchId(pub u64);

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dpid:{}", self.0)
    }
}

/// Physical switch port number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortNo(pub u32);

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port:{}", self.0)
    }
}

/// Egress selection for an outbound packet or installed flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Egress {
    /// Send out a specific physical port
    Port(PortNo),
    /// Replicate out all ports except the ingress
    Flood,
}

impl fmt::Display for Egress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Egress::Port(p) => write!(f, "{p}"),
            Egress::Flood => write!(f, "flood"),
        }
    }
}

/// 48-bit Ethernet address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// The all-ones broadcast address
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// Whether this is the broadcast address
    #[inline(always)]
    pub const fn is_broadcast(&self) -> bool {
        matches!(self.0, [0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Whether the group bit is set (multicast or broadcast)
    #[inline(always)]
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = ZoneflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| ZoneflowError::InvalidMac(s.to_string()))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| ZoneflowError::InvalidMac(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ZoneflowError::InvalidMac(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

/// Administrative security zone label
///
/// Labels are opaque configuration data. Addresses that match no configured
/// range classify into the reserved `unknown` zone, which participates in
/// policy evaluation like any other label and may be named by rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneName(String);

impl ZoneName {
    /// Reserved label for addresses outside every configured range
    pub const UNKNOWN: &'static str = "unknown";

    /// Create a zone label
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The reserved `unknown` zone
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// Whether this is the reserved `unknown` zone
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    /// Label as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
