//! Closed IPv4 address intervals
//!
//! Both CIDR prefixes and explicit `[start, end]` declarations reduce to the
//! same representation: a closed `u32` interval.

use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::Ipv4Addr;

use zoneflow_common::{ZoneflowError, ZoneflowResult};

/// A closed IPv4 address interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrRange {
    start: u32,
    end: u32,
}

impl AddrRange {
    /// Create from explicit bounds; rejects inverted spans
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> ZoneflowResult<Self> {
        let (s, e) = (u32::from(start), u32::from(end));
        if s > e {
            return Err(ZoneflowError::InvertedRange { start, end });
        }
        Ok(Self { start: s, end: e })
    }

    /// Create from a CIDR prefix
    pub fn from_cidr(net: Ipv4Network) -> Self {
        Self {
            start: u32::from(net.network()),
            end: u32::from(net.broadcast()),
        }
    }

    /// Parse a CIDR prefix in text form
    pub fn parse_cidr(text: &str) -> ZoneflowResult<Self> {
        let net: Ipv4Network = text
            .parse()
            .map_err(|_| ZoneflowError::InvalidCidr(text.to_string()))?;
        Ok(Self::from_cidr(net))
    }

    /// Interval membership
    #[inline(always)]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let a = u32::from(addr);
        self.start <= a && a <= self.end
    }

    /// Whether two intervals share any address
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// First address of the interval
    pub fn start(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.start)
    }

    /// Last address of the interval
    pub fn end(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.end)
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start(), self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cidr_reduces_to_interval() {
        let range = AddrRange::parse_cidr("192.168.10.0/27").unwrap();
        assert_eq!(range.start(), Ipv4Addr::new(192, 168, 10, 0));
        assert_eq!(range.end(), Ipv4Addr::new(192, 168, 10, 31));
        assert!(range.contains(Ipv4Addr::new(192, 168, 10, 17)));
        assert!(!range.contains(Ipv4Addr::new(192, 168, 10, 32)));
    }

    #[test]
    fn test_span_bounds_inclusive() {
        let range =
            AddrRange::new(Ipv4Addr::new(10, 0, 0, 100), Ipv4Addr::new(10, 0, 0, 110)).unwrap();
        assert!(range.contains(Ipv4Addr::new(10, 0, 0, 100)));
        assert!(range.contains(Ipv4Addr::new(10, 0, 0, 110)));
        assert!(!range.contains(Ipv4Addr::new(10, 0, 0, 111)));
        assert!(!range.contains(Ipv4Addr::new(10, 0, 0, 99)));
    }

    #[test]
    fn test_inverted_span_rejected() {
        let err = AddrRange::new(Ipv4Addr::new(10, 0, 0, 110), Ipv4Addr::new(10, 0, 0, 100));
        assert!(matches!(err, Err(ZoneflowError::InvertedRange { .. })));
    }

    #[test]
    fn test_bad_cidr_rejected() {
        assert!(AddrRange::parse_cidr("192.168.10.0/33").is_err());
        assert!(AddrRange::parse_cidr("not-a-prefix").is_err());
    }

    #[test]
    fn test_overlap_detection() {
        let a = AddrRange::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 31)).unwrap();
        let b = AddrRange::new(Ipv4Addr::new(10, 0, 0, 31), Ipv4Addr::new(10, 0, 0, 63)).unwrap();
        let c = AddrRange::new(Ipv4Addr::new(10, 0, 0, 64), Ipv4Addr::new(10, 0, 0, 95)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    proptest! {
        #[test]
        fn prop_contains_matches_bounds(start in 0u32..u32::MAX / 2, len in 0u32..1024, probe: u32) {
            let range = AddrRange::new(Ipv4Addr::from(start), Ipv4Addr::from(start + len)).unwrap();
            let inside = probe >= start && probe <= start + len;
            prop_assert_eq!(range.contains(Ipv4Addr::from(probe)), inside);
        }

        #[test]
        fn prop_overlap_symmetric(a in 0u32..1 << 20, b in 0u32..1 << 20, la in 0u32..4096, lb in 0u32..4096) {
            let ra = AddrRange::new(Ipv4Addr::from(a), Ipv4Addr::from(a + la)).unwrap();
            let rb = AddrRange::new(Ipv4Addr::from(b), Ipv4Addr::from(b + lb)).unwrap();
            prop_assert_eq!(ra.overlaps(&rb), rb.overlaps(&ra));
        }
    }
}
