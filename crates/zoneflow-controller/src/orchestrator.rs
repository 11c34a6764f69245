//! Packet-In Orchestrator
//!
//! One packet-in event in, one terminal outcome out: `Flooded`, `Forwarded`
//! or `Dropped`. LLDP and unparseable frames are ignored without a record.
//! The pipeline is fail-closed: a Deny verdict emits nothing and installs
//! nothing.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::channel::{ControlChannel, EmitPacket, FlowAction, InstallFlow, MatchKey, PacketPayload};
use crate::config::ControllerConfig;
use crate::mac_table::MacLearningStore;
use crate::planner::{CachePlan, FlowCachePlanner};
use zoneflow_common::{
    AtomicCounter, Decision, DecisionRecord, DecisionSink, Egress, FramePayload, Ipv4Meta,
    MacAddr, ParsedFrame, PortNo, SwitchId, ZoneName, ZoneflowResult,
};
use zoneflow_policy::{priority, FlowMetadata, PolicyEngine};
use zoneflow_zones::ZoneClassifier;

/// Inbound first-packet-of-flow event
#[derive(Debug, Clone)]
pub struct PacketIn {
    /// Switch the packet arrived from
    pub switch: SwitchId,
    /// Port the packet arrived on
    pub ingress: PortNo,
    /// Raw frame bytes
    pub frame: Bytes,
    /// Switch-side buffer holding the packet, when buffered
    pub buffer_id: Option<u32>,
}

/// Packet-in orchestrator
///
/// Owns every piece of controller state: the immutable zone/policy
/// snapshots, the per-switch MAC learning store and the flow-cache planner.
pub struct Controller {
    classifier: Arc<ZoneClassifier>,
    policy: Arc<PolicyEngine>,
    macs: MacLearningStore,
    planner: FlowCachePlanner,
    port_zones: HashMap<(SwitchId, PortNo), ZoneName>,
    channel: Arc<dyn ControlChannel>,
    sink: Arc<dyn DecisionSink>,
    counters: Counters,
}

#[derive(Default)]
struct Counters {
    packets_in: AtomicCounter,
    forwarded: AtomicCounter,
    flooded: AtomicCounter,
    dropped: AtomicCounter,
    ignored: AtomicCounter,
    flows_installed: AtomicCounter,
}

/// Counter snapshot for one controller instance
#[derive(Debug, Clone, serde::Serialize)]
pub struct ControllerStats {
    /// Packet-in events seen
    pub packets_in: u64,
    /// Packets sent out a resolved port
    pub forwarded: u64,
    /// Packets replicated to all ports
    pub flooded: u64,
    /// Packets silently discarded by policy
    pub dropped: u64,
    /// Frames ignored without a record (LLDP, unparseable)
    pub ignored: u64,
    /// Flow rules pushed to switches
    pub flows_installed: u64,
}

impl Controller {
    /// Build a controller from loaded configuration
    pub fn from_config(
        config: &ControllerConfig,
        channel: Arc<dyn ControlChannel>,
        sink: Arc<dyn DecisionSink>,
    ) -> ZoneflowResult<Self> {
        let classifier = Arc::new(config.build_classifier()?);
        let policy = Arc::new(PolicyEngine::with_rules(config.build_rules()));
        let port_zones = config
            .port_zones
            .iter()
            .map(|a| ((a.switch, a.port), a.zone.clone()))
            .collect();

        Ok(Self {
            classifier,
            policy,
            macs: MacLearningStore::with_config(config.mac_table),
            planner: FlowCachePlanner::with_config(config.flow_cache),
            port_zones,
            channel,
            sink,
            counters: Counters::default(),
        })
    }

    /// Install the table-miss rule on a newly connected switch
    pub async fn on_switch_connected(&self, switch: SwitchId) {
        let table_miss = InstallFlow {
            switch,
            match_key: MatchKey::any(),
            action: FlowAction::ToController,
            idle_timeout_secs: 0,
            hard_timeout_secs: 0,
            priority: priority::TABLE_MISS,
            buffer_id: None,
        };
        match self.channel.install_flow(table_miss).await {
            Ok(()) => {
                self.counters.flows_installed.inc();
            }
            Err(e) => warn!(%switch, error = %e, "table-miss install failed"),
        }
    }

    /// Drop learned state for a disconnected switch
    pub fn on_switch_disconnected(&self, switch: SwitchId) {
        self.macs.forget_switch(switch);
    }

    /// Handle one packet-in event to its terminal outcome.
    ///
    /// Returns `None` for frames handled without a terminal decision
    /// (unparseable, LLDP).
    pub async fn handle_packet_in(&self, pkt: PacketIn) -> Option<Decision> {
        self.counters.packets_in.inc();

        let frame = match ParsedFrame::parse(&pkt.frame) {
            Some(frame) => frame,
            None => {
                self.counters.ignored.inc();
                return None;
            }
        };
        if frame.payload == FramePayload::Lldp {
            self.counters.ignored.inc();
            return None;
        }

        self.macs.learn(pkt.switch, frame.eth.src, pkt.ingress);

        match frame.payload {
            FramePayload::Arp(arp) => {
                debug!(
                    switch = %pkt.switch,
                    sender = %arp.sender,
                    target = %arp.target,
                    opcode = arp.opcode,
                    "flooding ARP"
                );
                self.emit(&pkt, Egress::Flood).await;
                self.record(
                    &pkt,
                    Some(arp.sender),
                    Some(arp.target),
                    Some(self.classifier.classify(arp.sender)),
                    Some(self.classifier.classify(arp.target)),
                    Decision::Flooded,
                    "arp-flood",
                    false,
                );
                Some(Decision::Flooded)
            }
            FramePayload::Other => {
                let egress = match self.resolve_port(pkt.switch, frame.eth.dst) {
                    Some(port) => Egress::Port(port),
                    None => Egress::Flood,
                };
                self.emit(&pkt, egress).await;
                let decision = decision_for(egress);
                self.record(&pkt, None, None, None, None, decision, "l2-only", false);
                Some(decision)
            }
            FramePayload::Ipv4(ip) => self.handle_ipv4(&pkt, &frame, &ip).await,
            FramePayload::Lldp => None,
        }
    }

    async fn handle_ipv4(
        &self,
        pkt: &PacketIn,
        frame: &ParsedFrame,
        ip: &Ipv4Meta,
    ) -> Option<Decision> {
        let resolved_port = self.resolve_port(pkt.switch, frame.eth.dst);
        let src_zone = self.zone_of(pkt.switch, ip.src, Some(pkt.ingress));
        let dst_zone = self.zone_of(pkt.switch, ip.dst, resolved_port);
        let meta = FlowMetadata {
            protocol: Some(ip.protocol),
            is_return_traffic: ip.is_return_traffic,
        };

        let verdict = self.policy.evaluate(&src_zone, &dst_zone, &meta);
        if !verdict.is_allow() {
            // Fail-closed: nothing emitted, nothing installed.
            self.record(
                pkt,
                Some(ip.src),
                Some(ip.dst),
                Some(src_zone),
                Some(dst_zone),
                Decision::Dropped,
                &verdict.reason,
                false,
            );
            return Some(Decision::Dropped);
        }

        let match_key = MatchKey::l2(pkt.ingress, frame.eth.src, frame.eth.dst);
        let plan = self
            .planner
            .plan(pkt.switch, &verdict, match_key, resolved_port, pkt.buffer_id);

        let (decision, cached) = match plan {
            CachePlan::Install { flow, egress } => {
                let buffered = flow.buffer_id.is_some();
                let cached = match self.channel.install_flow(flow).await {
                    Ok(()) => {
                        self.counters.flows_installed.inc();
                        true
                    }
                    Err(e) => {
                        warn!(
                            switch = %pkt.switch,
                            error = %e,
                            "flow install failed; flow stays on the controller path"
                        );
                        false
                    }
                };
                // An installed rule applies the buffered packet itself;
                // everything else still needs an explicit send.
                if !(cached && buffered) {
                    self.emit(pkt, egress).await;
                }
                (decision_for(egress), cached)
            }
            CachePlan::OneShot { egress } => {
                self.emit(pkt, egress).await;
                (decision_for(egress), false)
            }
            CachePlan::Discard => (Decision::Dropped, false),
        };

        self.record(
            pkt,
            Some(ip.src),
            Some(ip.dst),
            Some(src_zone),
            Some(dst_zone),
            decision,
            &verdict.reason,
            cached,
        );
        Some(decision)
    }

    /// Resolved egress port for a destination MAC, if learned and unicast
    fn resolve_port(&self, switch: SwitchId, dst: MacAddr) -> Option<PortNo> {
        if dst.is_multicast() {
            return None;
        }
        self.macs.lookup(switch, dst)
    }

    /// Classify an address, with the static port assignment as fallback for
    /// addresses outside every configured range
    fn zone_of(&self, switch: SwitchId, addr: Ipv4Addr, port_hint: Option<PortNo>) -> ZoneName {
        let zone = self.classifier.classify(addr);
        if zone.is_unknown() {
            if let Some(port) = port_hint {
                if let Some(assigned) = self.port_zones.get(&(switch, port)) {
                    return assigned.clone();
                }
            }
        }
        zone
    }

    async fn emit(&self, pkt: &PacketIn, egress: Egress) {
        let payload = match pkt.buffer_id {
            Some(id) => PacketPayload::Buffered(id),
            None => PacketPayload::Frame(pkt.frame.clone()),
        };
        let out = EmitPacket {
            switch: pkt.switch,
            ingress: pkt.ingress,
            egress,
            payload,
        };
        if let Err(e) = self.channel.emit_packet(out).await {
            warn!(switch = %pkt.switch, error = %e, "packet emit failed");
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        pkt: &PacketIn,
        src_addr: Option<Ipv4Addr>,
        dst_addr: Option<Ipv4Addr>,
        src_zone: Option<ZoneName>,
        dst_zone: Option<ZoneName>,
        decision: Decision,
        reason: &str,
        cached: bool,
    ) {
        match decision {
            Decision::Forwarded => self.counters.forwarded.inc(),
            Decision::Flooded => self.counters.flooded.inc(),
            Decision::Dropped => self.counters.dropped.inc(),
        };
        self.sink.record(DecisionRecord {
            timestamp: Utc::now(),
            switch: pkt.switch,
            src_addr,
            dst_addr,
            src_zone,
            dst_zone,
            decision,
            reason: reason.to_string(),
            cached,
        });
    }

    /// The policy engine backing this controller
    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// The MAC learning store backing this controller
    pub fn mac_store(&self) -> &MacLearningStore {
        &self.macs
    }

    /// Counter snapshot
    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            packets_in: self.counters.packets_in.get(),
            forwarded: self.counters.forwarded.get(),
            flooded: self.counters.flooded.get(),
            dropped: self.counters.dropped.get(),
            ignored: self.counters.ignored.get(),
            flows_installed: self.counters.flows_installed.get(),
        }
    }
}

#[inline]
fn decision_for(egress: Egress) -> Decision {
    match egress {
        Egress::Port(_) => Decision::Forwarded,
        Egress::Flood => Decision::Flooded,
    }
}
