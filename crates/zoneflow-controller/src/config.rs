//! Controller configuration
//!
//! Zone boundaries, policy declarations and switch bounds are configuration
//! data loaded once at startup; the built snapshot is immutable and shared
//! across concurrent evaluations.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::mac_table::MacTableConfig;
use crate::planner::PlannerConfig;
use zoneflow_common::{PortNo, SwitchId, ZoneName, ZoneflowError, ZoneflowResult};
use zoneflow_policy::{PolicyConfig, PolicyRule};
use zoneflow_zones::{ZoneClassifier, ZoneDecl};

/// Static zone assignment for a switch port
///
/// Applied only when an address classifies `unknown`; the port the host is
/// attached to then decides its zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortZoneAssignment {
    /// Switch the port belongs to
    pub switch: SwitchId,
    /// The port
    pub port: PortNo,
    /// Zone assigned to hosts behind the port
    pub zone: ZoneName,
}

/// Complete controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Ordered zone declarations
    pub zones: Vec<ZoneDecl>,
    /// Policy declarations
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Optional static port→zone assignments
    #[serde(default)]
    pub port_zones: Vec<PortZoneAssignment>,
    /// MAC learning bounds
    #[serde(default)]
    pub mac_table: MacTableConfig,
    /// Flow-cache timeouts
    #[serde(default)]
    pub flow_cache: PlannerConfig,
}

impl ControllerConfig {
    /// Parse configuration from JSON text
    pub fn from_json(text: &str) -> ZoneflowResult<Self> {
        serde_json::from_str(text).map_err(|e| ZoneflowError::Config(e.to_string()))
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> ZoneflowResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Build the immutable classifier snapshot.
    ///
    /// Warns on zone labels the policy or port assignments reference without
    /// a matching declaration: such labels are legal (a port-assigned zone
    /// may have no address range) but usually a typo.
    pub fn build_classifier(&self) -> ZoneflowResult<ZoneClassifier> {
        let classifier = ZoneClassifier::from_decls(&self.zones)?;

        let port_assigned: Vec<&ZoneName> = self.port_zones.iter().map(|a| &a.zone).collect();
        for zone in self.policy.referenced_zones() {
            if !classifier.declares(&zone) && !port_assigned.contains(&&zone) {
                warn!(zone = zone.as_str(), "policy references undeclared zone");
            }
        }
        Ok(classifier)
    }

    /// Lower the policy declarations into the ordered rule list
    pub fn build_rules(&self) -> Vec<PolicyRule> {
        self.policy.build_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPUS: &str = r#"{
        "zones": [
            {"name": "student", "ranges": [{"start": "10.0.0.100", "end": "10.0.0.110"}]},
            {"name": "finance", "ranges": [{"start": "10.0.0.10", "end": "10.0.0.14"}]},
            {"name": "dean", "ranges": [{"start": "10.0.0.20", "end": "10.0.0.21"}]}
        ],
        "policy": {
            "allow_exceptions": [{"src": "finance", "dst": "dean"}],
            "protected_zones": [{"zone": "finance", "allow_from": ["dean"]}],
            "isolation_rules": [{"src": "student", "dst": "finance"}]
        },
        "port_zones": [{"switch": 1, "port": 4, "zone": "lab"}],
        "flow_cache": {"idle_timeout_secs": 60, "hard_timeout_secs": 300}
    }"#;

    #[test]
    fn test_parse_and_build() {
        let config = ControllerConfig::from_json(CAMPUS).unwrap();
        let classifier = config.build_classifier().unwrap();
        assert_eq!(classifier.len(), 3);

        let rules = config.build_rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(config.flow_cache.idle_timeout_secs, 60);
        assert_eq!(config.port_zones.len(), 1);
    }

    #[test]
    fn test_defaults_applied() {
        let config = ControllerConfig::from_json(
            r#"{"zones": [{"name": "a", "ranges": ["10.0.0.0/24"]}]}"#,
        )
        .unwrap();
        assert_eq!(config.mac_table.capacity, 4096);
        assert_eq!(config.flow_cache.hard_timeout_secs, 300);
        assert!(config.build_rules().is_empty());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = ControllerConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ZoneflowError::Config(_)));
    }

    #[test]
    fn test_bad_range_is_typed_error() {
        let err = ControllerConfig::from_json(
            r#"{"zones": [{"name": "a", "ranges": ["10.0.0.0/40"]}]}"#,
        )
        .unwrap()
        .build_classifier()
        .unwrap_err();
        assert!(matches!(err, ZoneflowError::InvalidCidr(_)));
    }
}
