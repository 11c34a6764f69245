//! Declarative policy configuration
//!
//! Operators declare intent (exceptions, protected zones, isolation pairs);
//! the loader lowers the declarations into one precedence-ordered rule list.
//! Precedence bands keep the lowering auditable: exceptions scan before
//! protected-zone denies, which scan before isolation denies, which scan
//! before any hand-written extra rules.

use serde::{Deserialize, Serialize};

use crate::{priority, Action, PolicyRule, ZonePredicate};
use zoneflow_common::ZoneName;

const BAND_EXCEPTION: u16 = 100;
const BAND_PROTECTED: u16 = 200;
const BAND_ISOLATION: u16 = 300;

/// A directed zone pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonePair {
    /// Source zone
    pub src: ZoneName,
    /// Destination zone
    pub dst: ZoneName,
}

/// A sensitive destination zone and the sources permitted to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedZone {
    /// The protected zone
    pub zone: ZoneName,
    /// Sources allowed in; the zone itself is always implicitly allowed
    #[serde(default)]
    pub allow_from: Vec<ZoneName>,
}

/// Declarative policy configuration, loaded once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Named whitelist overrides; scan before every deny
    #[serde(default)]
    pub allow_exceptions: Vec<ZonePair>,
    /// Sensitive destinations with explicit allow-lists
    #[serde(default)]
    pub protected_zones: Vec<ProtectedZone>,
    /// Source zones barred from controlled destinations
    #[serde(default)]
    pub isolation_rules: Vec<ZonePair>,
    /// Hand-written extra rules, scanned after the lowered bands
    #[serde(default)]
    pub extra_rules: Vec<PolicyRule>,
}

impl PolicyConfig {
    /// Lower the declarations into one precedence-ordered rule list
    pub fn build_rules(&self) -> Vec<PolicyRule> {
        let mut rules = Vec::new();

        for (i, pair) in self.allow_exceptions.iter().enumerate() {
            rules.push(PolicyRule {
                precedence: BAND_EXCEPTION + i as u16,
                src: ZonePredicate::Is(pair.src.clone()),
                dst: ZonePredicate::Is(pair.dst.clone()),
                protocol: None,
                action: Action::Allow,
                cacheable: true,
                reason: format!("allow-exception {}->{}", pair.src, pair.dst),
                priority: priority::EXCEPTION,
            });
        }

        for (i, protected) in self.protected_zones.iter().enumerate() {
            let mut allowed = protected.allow_from.clone();
            if !allowed.contains(&protected.zone) {
                allowed.push(protected.zone.clone());
            }
            rules.push(PolicyRule {
                precedence: BAND_PROTECTED + i as u16,
                src: ZonePredicate::NotIn(allowed),
                dst: ZonePredicate::Is(protected.zone.clone()),
                protocol: None,
                action: Action::Deny,
                cacheable: false,
                reason: format!("protected-zone {}", protected.zone),
                priority: priority::DENY,
            });
        }

        for (i, pair) in self.isolation_rules.iter().enumerate() {
            rules.push(PolicyRule {
                precedence: BAND_ISOLATION + i as u16,
                src: ZonePredicate::Is(pair.src.clone()),
                dst: ZonePredicate::Is(pair.dst.clone()),
                protocol: None,
                action: Action::Deny,
                cacheable: false,
                reason: format!("isolation {}->{}", pair.src, pair.dst),
                priority: priority::DENY,
            });
        }

        rules.extend(self.extra_rules.iter().cloned());
        rules
    }

    /// Every zone label the configuration names, for declaration checks
    pub fn referenced_zones(&self) -> Vec<ZoneName> {
        let mut zones = Vec::new();
        let mut push = |z: &ZoneName| {
            if !zones.contains(z) {
                zones.push(z.clone());
            }
        };

        for pair in self.allow_exceptions.iter().chain(&self.isolation_rules) {
            push(&pair.src);
            push(&pair.dst);
        }
        for protected in &self.protected_zones {
            push(&protected.zone);
            protected.allow_from.iter().for_each(&mut push);
        }
        for rule in &self.extra_rules {
            for predicate in [&rule.src, &rule.dst] {
                match predicate {
                    ZonePredicate::Is(z) => push(z),
                    ZonePredicate::AnyOf(list) | ZonePredicate::NotIn(list) => {
                        list.iter().for_each(&mut push)
                    }
                    ZonePredicate::Any => {}
                }
            }
        }
        zones
    }
}
