//! Per-switch MAC learning
//!
//! One partition per switch: concurrent packet-in handling for different
//! switches never contends, and mutation inside one partition is serialized
//! behind its lock. Every observed frame unconditionally overwrites the port
//! for its source MAC, so hosts that move ports are re-learned immediately.
//!
//! Entries are bounded: a per-partition capacity evicts the stalest entry on
//! overflow, and entries older than the TTL are invisible to `lookup`, which
//! degrades to flood-and-relearn.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use zoneflow_common::{MacAddr, PortNo, SwitchId};

const DEFAULT_CAPACITY: usize = 4096;
const DEFAULT_TTL_SECS: u64 = 300;

/// Bounds for one switch partition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacTableConfig {
    /// Maximum entries per switch before stalest-entry eviction
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Seconds after which an unrefreshed entry is treated as unlearned
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

impl Default for MacTableConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl MacTableConfig {
    fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Copy)]
struct MacEntry {
    port: PortNo,
    last_updated: Instant,
}

/// MAC→port learning store partitioned by switch
pub struct MacLearningStore {
    partitions: DashMap<SwitchId, RwLock<HashMap<MacAddr, MacEntry>>>,
    config: MacTableConfig,
}

impl MacLearningStore {
    /// Create a store with default bounds
    pub fn new() -> Self {
        Self::with_config(MacTableConfig::default())
    }

    /// Create a store with explicit bounds
    pub fn with_config(config: MacTableConfig) -> Self {
        Self {
            partitions: DashMap::new(),
            config,
        }
    }

    /// Unconditional upsert of the port for a source MAC
    pub fn learn(&self, switch: SwitchId, mac: MacAddr, port: PortNo) {
        let partition = self
            .partitions
            .entry(switch)
            .or_insert_with(|| RwLock::new(HashMap::new()));
        let mut table = partition.write();

        let now = Instant::now();
        if table.len() >= self.config.capacity && !table.contains_key(&mac) {
            evict_stalest(&mut table);
        }
        table.insert(
            mac,
            MacEntry {
                port,
                last_updated: now,
            },
        );
    }

    /// Port a MAC was last seen on, if learned and fresh
    pub fn lookup(&self, switch: SwitchId, mac: MacAddr) -> Option<PortNo> {
        let partition = self.partitions.get(&switch)?;
        let table = partition.read();
        let entry = table.get(&mac)?;
        if entry.last_updated.elapsed() > self.config.ttl() {
            return None;
        }
        Some(entry.port)
    }

    /// Number of entries learned for one switch
    pub fn len(&self, switch: SwitchId) -> usize {
        self.partitions
            .get(&switch)
            .map(|p| p.read().len())
            .unwrap_or(0)
    }

    /// Whether nothing was learned for one switch
    pub fn is_empty(&self, switch: SwitchId) -> bool {
        self.len(switch) == 0
    }

    /// Drop a switch partition entirely (switch disconnect)
    pub fn forget_switch(&self, switch: SwitchId) {
        self.partitions.remove(&switch);
    }
}

impl Default for MacLearningStore {
    fn default() -> Self {
        Self::new()
    }
}

fn evict_stalest(table: &mut HashMap<MacAddr, MacEntry>) {
    if let Some(stalest) = table
        .iter()
        .min_by_key(|(_, e)| e.last_updated)
        .map(|(mac, _)| *mac)
    {
        table.remove(&stalest);
    }
}
