//! Lock-free rule store with hot-swapping

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::PolicyRule;

/// Rule snapshot store with atomic updates
///
/// Evaluations load an immutable snapshot and never lock; updates swap the
/// whole rule list. Rules are sorted by ascending precedence on update, with
/// declaration order breaking ties (stable sort).
pub struct RuleStore {
    rules: ArcSwap<Vec<PolicyRule>>,
    version: AtomicU64,
}

impl RuleStore {
    /// Create empty store
    pub fn new() -> Self {
        Self {
            rules: ArcSwap::from_pointee(Vec::new()),
            version: AtomicU64::new(0),
        }
    }

    /// Create with initial rules
    pub fn with_rules(rules: Vec<PolicyRule>) -> Self {
        let store = Self::new();
        store.update(rules);
        store
    }

    /// Get current version
    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Load the current snapshot
    #[inline(always)]
    pub fn snapshot(&self) -> Arc<Vec<PolicyRule>> {
        self.rules.load_full()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.rules.load().is_empty()
    }

    /// Atomically replace the rule list
    pub fn update(&self, mut rules: Vec<PolicyRule>) {
        rules.sort_by_key(|r| r.precedence);
        debug!(rules = rules.len(), "swapping policy rule snapshot");
        self.rules.store(Arc::new(rules));
        self.version.fetch_add(1, Ordering::Release);
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}
