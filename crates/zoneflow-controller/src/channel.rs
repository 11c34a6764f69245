//! Control-channel port
//!
//! The wire encoding of switch control messages belongs to an external
//! protocol library; the core only speaks through this trait. Sends are
//! fire-and-forget: the orchestrator never waits for switch acknowledgment,
//! and a failed send degrades the flow to the uncached path instead of
//! failing the pipeline.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use zoneflow_common::{Egress, MacAddr, PortNo, SwitchId, ZoneflowError, ZoneflowResult};

/// Match fields for a switch-resident flow rule
///
/// `MatchKey::any()` (all wildcards) is the table-miss match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchKey {
    /// Ingress port, if matched
    pub in_port: Option<PortNo>,
    /// Source MAC, if matched
    pub eth_src: Option<MacAddr>,
    /// Destination MAC, if matched
    pub eth_dst: Option<MacAddr>,
}

impl MatchKey {
    /// Wildcard match
    pub fn any() -> Self {
        Self::default()
    }

    /// The coarse L2 key cached for a decided flow
    pub fn l2(in_port: PortNo, eth_src: MacAddr, eth_dst: MacAddr) -> Self {
        Self {
            in_port: Some(in_port),
            eth_src: Some(eth_src),
            eth_dst: Some(eth_dst),
        }
    }
}

/// Action of an installed flow rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    /// Forward matching packets out a port
    Forward(PortNo),
    /// Punt matching packets to the controller (table-miss)
    ToController,
}

/// Install a rule into a switch flow table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFlow {
    /// Target switch
    pub switch: SwitchId,
    /// Match fields
    pub match_key: MatchKey,
    /// Action on match
    pub action: FlowAction,
    /// Remove after this many seconds of inactivity (0 = never)
    pub idle_timeout_secs: u16,
    /// Remove unconditionally after this many seconds (0 = never)
    pub hard_timeout_secs: u16,
    /// Rule priority; higher wins
    pub priority: u16,
    /// Switch buffer holding the triggering packet, applied on install
    pub buffer_id: Option<u32>,
}

/// Outbound packet payload: a switch-side buffer or the raw frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketPayload {
    /// Packet already buffered on the switch
    Buffered(u32),
    /// Raw frame bytes
    Frame(Bytes),
}

/// Emit one packet out of a switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitPacket {
    /// Target switch
    pub switch: SwitchId,
    /// Port the packet arrived on (excluded from flood)
    pub ingress: PortNo,
    /// Where to send it
    pub egress: Egress,
    /// What to send
    pub payload: PacketPayload,
}

/// Port to the switch control channel
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Push a flow rule to a switch
    async fn install_flow(&self, flow: InstallFlow) -> ZoneflowResult<()>;

    /// Emit a packet out of a switch
    async fn emit_packet(&self, packet: EmitPacket) -> ZoneflowResult<()>;
}

/// In-memory channel retaining every command, for tests and offline replay
#[derive(Debug, Default)]
pub struct RecordingChannel {
    installs: Mutex<Vec<InstallFlow>>,
    emits: Mutex<Vec<EmitPacket>>,
    fail_installs: AtomicBool,
}

impl RecordingChannel {
    /// Create an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `install_flow` calls fail, to exercise degradation
    pub fn set_fail_installs(&self, fail: bool) {
        self.fail_installs.store(fail, Ordering::SeqCst);
    }

    /// Flow rules pushed so far
    pub fn installs(&self) -> Vec<InstallFlow> {
        self.installs.lock().clone()
    }

    /// Packets emitted so far
    pub fn emits(&self) -> Vec<EmitPacket> {
        self.emits.lock().clone()
    }
}

#[async_trait]
impl ControlChannel for RecordingChannel {
    async fn install_flow(&self, flow: InstallFlow) -> ZoneflowResult<()> {
        if self.fail_installs.load(Ordering::SeqCst) {
            return Err(ZoneflowError::Channel("switch rejected flow mod".to_string()));
        }
        self.installs.lock().push(flow);
        Ok(())
    }

    async fn emit_packet(&self, packet: EmitPacket) -> ZoneflowResult<()> {
        self.emits.lock().push(packet);
        Ok(())
    }
}
