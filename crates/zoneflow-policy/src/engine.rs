//! The ordered evaluation pass

use std::sync::Arc;

use crate::store::RuleStore;
use crate::{FlowMetadata, PolicyRule, Verdict};
use zoneflow_common::{AtomicCounter, ZoneName};

/// Policy engine
///
/// Evaluation order, first match terminating:
///
/// 1.–3. The explicit rule list in ascending precedence (allow-exceptions,
///    protected-destination denies, source-isolation denies, any extras).
/// 4. Return-traffic exception: the flow is marked reply-direction and no
///    rule matched the pair — Allow, but never cached, so it is re-checked
///    on every packet.
/// 5. Same-zone traffic: Allow, cacheable.
/// 6. Default: Allow, cacheable.
pub struct PolicyEngine {
    store: Arc<RuleStore>,

    evaluations: AtomicCounter,
    allows: AtomicCounter,
    denies: AtomicCounter,
}

impl PolicyEngine {
    /// Create an engine over an empty rule store
    pub fn new() -> Self {
        Self::with_store(Arc::new(RuleStore::new()))
    }

    /// Create an engine with an initial rule list
    pub fn with_rules(rules: Vec<PolicyRule>) -> Self {
        Self::with_store(Arc::new(RuleStore::with_rules(rules)))
    }

    /// Create an engine over a shared store
    pub fn with_store(store: Arc<RuleStore>) -> Self {
        Self {
            store,
            evaluations: AtomicCounter::new(0),
            allows: AtomicCounter::new(0),
            denies: AtomicCounter::new(0),
        }
    }

    /// Evaluate one classified flow
    #[inline]
    pub fn evaluate(&self, src: &ZoneName, dst: &ZoneName, meta: &FlowMetadata) -> Verdict {
        self.evaluations.inc();
        let verdict = self.evaluate_inner(src, dst, meta);
        if verdict.is_allow() {
            self.allows.inc();
        } else {
            self.denies.inc();
        }
        verdict
    }

    fn evaluate_inner(&self, src: &ZoneName, dst: &ZoneName, meta: &FlowMetadata) -> Verdict {
        let rules = self.store.snapshot();
        if let Some(rule) = rules.iter().find(|r| r.matches(src, dst, meta)) {
            return Verdict::from_rule(rule);
        }

        if meta.is_return_traffic {
            return Verdict::allow(false, "return-traffic");
        }

        if src == dst && !src.is_unknown() {
            return Verdict::allow(true, "same-zone");
        }

        Verdict::allow(true, "default-allow")
    }

    /// Rule store backing this engine
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Counter snapshot
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            evaluations: self.evaluations.get(),
            allows: self.allows.get(),
            denies: self.denies.get(),
            rules_loaded: self.store.len(),
            version: self.store.version(),
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStats {
    /// Total evaluations
    pub evaluations: u64,
    /// Allow verdicts
    pub allows: u64,
    /// Deny verdicts
    pub denies: u64,
    /// Rules in the current snapshot
    pub rules_loaded: usize,
    /// Snapshot version
    pub version: u64,
}
