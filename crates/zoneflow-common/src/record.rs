//! Terminal decision records
//!
//! The orchestrator emits exactly one record per terminal packet outcome.
//! Unparseable frames produce no record.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::net::Ipv4Addr;
use tracing::info;

use crate::types::{SwitchId, ZoneName};

/// Terminal outcome of one packet-in event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Emitted out a resolved port
    Forwarded,
    /// Replicated out all ports
    Flooded,
    /// Silently discarded
    Dropped,
}

/// One structured record per terminal decision
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    /// When the decision was taken
    pub timestamp: DateTime<Utc>,
    /// Switch the packet-in arrived from
    pub switch: SwitchId,
    /// Source address, when the frame carried one
    pub src_addr: Option<Ipv4Addr>,
    /// Destination address, when the frame carried one
    pub dst_addr: Option<Ipv4Addr>,
    /// Source zone, when classification ran
    pub src_zone: Option<ZoneName>,
    /// Destination zone, when classification ran
    pub dst_zone: Option<ZoneName>,
    /// Terminal outcome
    pub decision: Decision,
    /// Why the outcome was reached
    pub reason: String,
    /// Whether a flow-cache entry was installed for this decision
    pub cached: bool,
}

/// Receiver for terminal decision records
pub trait DecisionSink: Send + Sync {
    /// Consume one record
    fn record(&self, record: DecisionRecord);
}

/// Default sink: structured `tracing` output
#[derive(Debug, Default)]
pub struct TracingSink;

impl DecisionSink for TracingSink {
    fn record(&self, r: DecisionRecord) {
        info!(
            switch = %r.switch,
            src = ?r.src_addr,
            dst = ?r.dst_addr,
            src_zone = r.src_zone.as_ref().map(ZoneName::as_str),
            dst_zone = r.dst_zone.as_ref().map(ZoneName::as_str),
            decision = ?r.decision,
            reason = %r.reason,
            cached = r.cached,
            "terminal decision"
        );
    }
}

/// Sink retaining records in memory, for tests and offline replay
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DecisionRecord>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record seen so far
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().clone()
    }

    /// Number of records seen
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records were seen
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DecisionSink for MemorySink {
    fn record(&self, record: DecisionRecord) {
        self.records.lock().push(record);
    }
}
