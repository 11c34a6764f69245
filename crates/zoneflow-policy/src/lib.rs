//! Policy Evaluator
//!
//! One explicit ordered list of rules evaluated by a single loop. Rules are
//! scanned in ascending precedence; the first match terminates evaluation;
//! no match falls through to the built-in tail (return-traffic exception,
//! same-zone allow, default allow). The outcome is a pure function of
//! `(src_zone, dst_zone, metadata, rule table)` — precedence is data, never
//! branch order.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod store;

pub use config::PolicyConfig;
pub use engine::{EngineStats, PolicyEngine};
pub use store::RuleStore;

use serde::{Deserialize, Serialize};

use zoneflow_common::ZoneName;

/// Switch-priority bands for installed flows.
///
/// Whitelist/exception rules outrank general deny rules, which outrank
/// learned forwarding, which outranks the table-miss rule.
pub mod priority {
    /// Table-miss rule: match everything, send to the controller
    pub const TABLE_MISS: u16 = 0;
    /// Learned forwarding entries
    pub const FORWARD: u16 = 100;
    /// General deny rules
    pub const DENY: u16 = 300;
    /// Explicit allow-exceptions
    pub const EXCEPTION: u16 = 400;
}

/// Policy action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Permit the flow
    Allow,
    /// Silently discard the flow
    Deny,
}

/// Zone predicate of one rule side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZonePredicate {
    /// Matches every zone
    Any,
    /// Matches exactly one zone
    Is(ZoneName),
    /// Matches any of the listed zones
    AnyOf(Vec<ZoneName>),
    /// Matches every zone except the listed ones
    NotIn(Vec<ZoneName>),
}

impl ZonePredicate {
    /// Whether the predicate matches a zone
    #[inline]
    pub fn matches(&self, zone: &ZoneName) -> bool {
        match self {
            Self::Any => true,
            Self::Is(z) => z == zone,
            Self::AnyOf(zones) => zones.contains(zone),
            Self::NotIn(zones) => !zones.contains(zone),
        }
    }
}

/// Per-flow metadata consumed by rule predicates and the built-in tail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowMetadata {
    /// IP protocol number, when the frame carried one
    pub protocol: Option<u8>,
    /// Reply-direction signal (TCP ACK, ICMP echo reply)
    pub is_return_traffic: bool,
}

/// One precedence-ordered policy rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Scan position; lower runs first, declaration order breaks ties
    pub precedence: u16,
    /// Source-zone predicate
    pub src: ZonePredicate,
    /// Destination-zone predicate
    pub dst: ZonePredicate,
    /// Optional IP-protocol predicate
    #[serde(default)]
    pub protocol: Option<u8>,
    /// Action on match
    pub action: Action,
    /// Whether a matching Allow may be pushed into the switch flow table
    pub cacheable: bool,
    /// Label carried into decision records
    pub reason: String,
    /// Switch priority band for installed flows
    pub priority: u16,
}

impl PolicyRule {
    /// Whether the rule matches a classified flow
    #[inline]
    pub fn matches(&self, src: &ZoneName, dst: &ZoneName, meta: &FlowMetadata) -> bool {
        if !self.src.matches(src) || !self.dst.matches(dst) {
            return false;
        }
        match (self.protocol, meta.protocol) {
            (Some(want), Some(have)) => want == have,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Outcome of one policy evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Allow or Deny
    pub action: Action,
    /// Whether the decision may be cached in the switch flow table.
    /// Deny is never cacheable.
    pub cacheable: bool,
    /// Why the decision was reached
    pub reason: String,
    /// Switch priority band for an installed flow
    pub priority: u16,
}

impl Verdict {
    /// Whether the flow is permitted
    #[inline]
    pub fn is_allow(&self) -> bool {
        self.action == Action::Allow
    }

    fn from_rule(rule: &PolicyRule) -> Self {
        Self {
            action: rule.action,
            cacheable: rule.action == Action::Allow && rule.cacheable,
            reason: rule.reason.clone(),
            priority: rule.priority,
        }
    }

    fn allow(cacheable: bool, reason: &str) -> Self {
        Self {
            action: Action::Allow,
            cacheable,
            reason: reason.to_string(),
            priority: priority::FORWARD,
        }
    }
}
