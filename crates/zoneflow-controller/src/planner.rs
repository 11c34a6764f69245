//! Flow Cache Planner
//!
//! Decides, per allowed packet, between installing a switch-resident rule
//! (later packets of the flow bypass the controller) and a one-shot action.
//! Invariants:
//!
//! - A rule is installed only for a `cacheable` Allow verdict with a resolved
//!   egress port.
//! - Deny is never installed; a denied packet produces no plan at all.
//! - Flood (unknown destination MAC) is provisional, pending learning, and is
//!   never cached.

use serde::{Deserialize, Serialize};

use crate::channel::{FlowAction, InstallFlow, MatchKey};
use zoneflow_common::{Egress, PortNo, SwitchId};
use zoneflow_policy::Verdict;

const DEFAULT_IDLE_TIMEOUT_SECS: u16 = 60;
const DEFAULT_HARD_TIMEOUT_SECS: u16 = 300;

/// Timeouts for installed flow rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Idle timeout for installed rules
    #[serde(default = "default_idle")]
    pub idle_timeout_secs: u16,
    /// Hard timeout for installed rules
    #[serde(default = "default_hard")]
    pub hard_timeout_secs: u16,
}

fn default_idle() -> u16 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_hard() -> u16 {
    DEFAULT_HARD_TIMEOUT_SECS
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            hard_timeout_secs: DEFAULT_HARD_TIMEOUT_SECS,
        }
    }
}

/// Plan for one allowed packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePlan {
    /// Install a flow rule, then deliver this packet out the same port
    Install {
        /// The rule to push
        flow: InstallFlow,
        /// Egress for the triggering packet
        egress: Egress,
    },
    /// Deliver only this packet; later packets return to the controller
    OneShot {
        /// Egress for the packet
        egress: Egress,
    },
    /// Deliver nothing (denied flow)
    Discard,
}

/// Flow cache planner
#[derive(Debug, Clone, Default)]
pub struct FlowCachePlanner {
    config: PlannerConfig,
}

impl FlowCachePlanner {
    /// Create a planner with explicit timeouts
    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Plan handling of one evaluated packet
    pub fn plan(
        &self,
        switch: SwitchId,
        verdict: &Verdict,
        match_key: MatchKey,
        resolved_port: Option<PortNo>,
        buffer_id: Option<u32>,
    ) -> CachePlan {
        if !verdict.is_allow() {
            return CachePlan::Discard;
        }

        let port = match resolved_port {
            Some(port) => port,
            // Destination not learned yet: flood, never cache.
            None => return CachePlan::OneShot { egress: Egress::Flood },
        };

        if !verdict.cacheable {
            return CachePlan::OneShot {
                egress: Egress::Port(port),
            };
        }

        CachePlan::Install {
            flow: InstallFlow {
                switch,
                match_key,
                action: FlowAction::Forward(port),
                idle_timeout_secs: self.config.idle_timeout_secs,
                hard_timeout_secs: self.config.hard_timeout_secs,
                priority: verdict.priority,
                buffer_id,
            },
            egress: Egress::Port(port),
        }
    }
}
