//! Ordered first-match classification

use std::net::Ipv4Addr;
use tracing::warn;

use crate::range::AddrRange;
use crate::{RangeDecl, ZoneDecl};
use zoneflow_common::{ZoneName, ZoneflowResult};

/// Immutable address→zone classifier
///
/// Built once at startup and shared across concurrent evaluations; no
/// interior mutability, no I/O.
#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    entries: Vec<(AddrRange, ZoneName)>,
}

impl ZoneClassifier {
    /// Build a classifier from resolved entries, preserving order
    pub fn new(entries: Vec<(AddrRange, ZoneName)>) -> Self {
        warn_on_overlaps(&entries);
        Self { entries }
    }

    /// Build a classifier from zone declarations, preserving declaration order
    pub fn from_decls(decls: &[ZoneDecl]) -> ZoneflowResult<Self> {
        let mut entries = Vec::new();
        for decl in decls {
            for range in &decl.ranges {
                let resolved = match range {
                    RangeDecl::Cidr(text) => AddrRange::parse_cidr(text)?,
                    RangeDecl::Span { start, end } => AddrRange::new(*start, *end)?,
                };
                entries.push((resolved, decl.name.clone()));
            }
        }
        Ok(Self::new(entries))
    }

    /// Classify one address: first matching range wins, `unknown` on miss
    #[inline]
    pub fn classify(&self, addr: Ipv4Addr) -> ZoneName {
        for (range, zone) in &self.entries {
            if range.contains(addr) {
                return zone.clone();
            }
        }
        ZoneName::unknown()
    }

    /// Whether a zone label is declared anywhere in this classifier
    pub fn declares(&self, zone: &ZoneName) -> bool {
        zone.is_unknown() || self.entries.iter().any(|(_, z)| z == zone)
    }

    /// Number of resolved range entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the classifier has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Overlaps are legal (first match wins) but usually a configuration mistake.
fn warn_on_overlaps(entries: &[(AddrRange, ZoneName)]) {
    for (i, (range_a, zone_a)) in entries.iter().enumerate() {
        for (range_b, zone_b) in entries.iter().skip(i + 1) {
            if range_a.overlaps(range_b) {
                warn!(
                    first = %range_a,
                    first_zone = zone_a.as_str(),
                    second = %range_b,
                    second_zone = zone_b.as_str(),
                    "overlapping zone ranges; first declaration wins"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn campus() -> ZoneClassifier {
        ZoneClassifier::from_decls(&[
            ZoneDecl {
                name: ZoneName::new("student"),
                ranges: vec![RangeDecl::Span {
                    start: Ipv4Addr::new(10, 0, 0, 100),
                    end: Ipv4Addr::new(10, 0, 0, 110),
                }],
            },
            ZoneDecl {
                name: ZoneName::new("finance"),
                ranges: vec![RangeDecl::Span {
                    start: Ipv4Addr::new(10, 0, 0, 10),
                    end: Ipv4Addr::new(10, 0, 0, 14),
                }],
            },
            ZoneDecl {
                name: ZoneName::new("dean"),
                ranges: vec![RangeDecl::Span {
                    start: Ipv4Addr::new(10, 0, 0, 20),
                    end: Ipv4Addr::new(10, 0, 0, 21),
                }],
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_first_match_in_declaration_order() {
        let classifier = ZoneClassifier::from_decls(&[
            ZoneDecl {
                name: ZoneName::new("narrow"),
                ranges: vec![RangeDecl::Cidr("192.168.10.0/28".to_string())],
            },
            ZoneDecl {
                name: ZoneName::new("wide"),
                ranges: vec![RangeDecl::Cidr("192.168.10.0/24".to_string())],
            },
        ])
        .unwrap();

        // Both ranges contain .5; the earlier declaration wins.
        assert_eq!(
            classifier.classify(Ipv4Addr::new(192, 168, 10, 5)).as_str(),
            "narrow"
        );
        assert_eq!(
            classifier.classify(Ipv4Addr::new(192, 168, 10, 40)).as_str(),
            "wide"
        );
    }

    #[test]
    fn test_miss_classifies_unknown() {
        let classifier = campus();
        assert!(classifier.classify(Ipv4Addr::new(192, 0, 2, 5)).is_unknown());
    }

    #[test]
    fn test_campus_scenario_labels() {
        let classifier = campus();
        assert_eq!(
            classifier.classify(Ipv4Addr::new(10, 0, 0, 101)).as_str(),
            "student"
        );
        assert_eq!(
            classifier.classify(Ipv4Addr::new(10, 0, 0, 11)).as_str(),
            "finance"
        );
        assert_eq!(
            classifier.classify(Ipv4Addr::new(10, 0, 0, 21)).as_str(),
            "dean"
        );
    }

    #[test]
    fn test_declares() {
        let classifier = campus();
        assert!(classifier.declares(&ZoneName::new("finance")));
        assert!(classifier.declares(&ZoneName::unknown()));
        assert!(!classifier.declares(&ZoneName::new("lab")));
    }

    proptest! {
        // Classification is a pure function of the range table: repeated
        // calls with the same address always agree.
        #[test]
        fn prop_classification_deterministic(addr: u32) {
            let classifier = campus();
            let first = classifier.classify(Ipv4Addr::from(addr));
            for _ in 0..3 {
                prop_assert_eq!(&first, &classifier.classify(Ipv4Addr::from(addr)));
            }
        }
    }
}
