//! Zone Classifier
//!
//! Pure address→label mapping. A classifier is an ordered list of
//! `(range, zone)` entries built once at startup; classification is interval
//! membership returning the first match, `unknown` on miss. Ranges may
//! overlap across declarations — first match in declaration order wins, and
//! the builder warns on every overlapping pair it detects.

#![warn(missing_docs)]

pub mod classifier;
pub mod range;

pub use classifier::ZoneClassifier;
pub use range::AddrRange;

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use zoneflow_common::ZoneName;

/// One declared address range, CIDR or explicit span
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeDecl {
    /// CIDR prefix, e.g. `"192.168.10.0/27"`
    Cidr(String),
    /// Explicit closed span
    Span {
        /// First address in the range
        start: Ipv4Addr,
        /// Last address in the range
        end: Ipv4Addr,
    },
}

/// One zone declaration: a label and its ordered ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDecl {
    /// Zone label
    pub name: ZoneName,
    /// Ordered address ranges belonging to the zone
    pub ranges: Vec<RangeDecl>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_decl_deserializes_both_shapes() {
        let decls: Vec<ZoneDecl> = serde_json::from_str(
            r#"[
                {"name": "student", "ranges": ["192.168.10.0/27", {"start": "10.0.0.100", "end": "10.0.0.110"}]},
                {"name": "finance", "ranges": [{"start": "10.0.0.10", "end": "10.0.0.14"}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name.as_str(), "student");
        assert_eq!(decls[0].ranges.len(), 2);
    }
}
