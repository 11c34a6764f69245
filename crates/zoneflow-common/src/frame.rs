//! Ethernet/ARP/IPv4 frame parsing for packet-in events
//!
//! Only the fields the decision core consumes are extracted: L2 addresses and
//! ethertype, ARP opcode and sender/target addresses, IPv4 addresses and
//! protocol, and the reply-direction signal (TCP ACK, ICMP echo reply).

use std::net::Ipv4Addr;

use crate::types::MacAddr;

/// IPv4 ethertype
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// ARP ethertype
pub const ETHERTYPE_ARP: u16 = 0x0806;
/// LLDP ethertype (topology discovery, ignored by the core)
pub const ETHERTYPE_LLDP: u16 = 0x88cc;

/// ICMP protocol number
pub const IPPROTO_ICMP: u8 = 1;
/// TCP protocol number
pub const IPPROTO_TCP: u8 = 6;
/// UDP protocol number
pub const IPPROTO_UDP: u8 = 17;

/// ARP request opcode
pub const ARP_OP_REQUEST: u16 = 1;
/// ARP reply opcode
pub const ARP_OP_REPLY: u16 = 2;

const ETH_HDR_LEN: usize = 14;
const ARP_BODY_LEN: usize = 28;
const IPV4_MIN_HDR_LEN: usize = 20;

/// Parsed Ethernet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination MAC
    pub dst: MacAddr,
    /// Source MAC
    pub src: MacAddr,
    /// Ethertype
    pub ethertype: u16,
}

/// ARP fields consumed by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpMeta {
    /// Operation (request or reply)
    pub opcode: u16,
    /// Sender protocol address
    pub sender: Ipv4Addr,
    /// Target protocol address
    pub target: Ipv4Addr,
}

/// IPv4 fields consumed by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Meta {
    /// Source address
    pub src: Ipv4Addr,
    /// Destination address
    pub dst: Ipv4Addr,
    /// IP protocol number
    pub protocol: u8,
    /// Reply-direction signal: TCP ACK flag or ICMP echo reply
    pub is_return_traffic: bool,
}

/// Frame payload after the Ethernet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePayload {
    /// ARP frame
    Arp(ArpMeta),
    /// IPv4 frame
    Ipv4(Ipv4Meta),
    /// LLDP frame (topology discovery)
    Lldp,
    /// Any other ethertype, forwarded by L2 learning alone
    Other,
}

/// A parsed packet-in frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame {
    /// Ethernet header
    pub eth: EthernetHeader,
    /// Payload classification
    pub payload: FramePayload,
}

impl ParsedFrame {
    /// Parse a raw frame.
    ///
    /// Returns `None` for frames without a complete Ethernet header, and for
    /// frames whose ethertype advertises ARP or IPv4 but whose body is too
    /// short to carry it. Callers drop such frames silently.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < ETH_HDR_LEN {
            return None;
        }

        let dst = MacAddr(data[0..6].try_into().ok()?);
        let src = MacAddr(data[6..12].try_into().ok()?);
        let ethertype = u16::from_be_bytes([data[12], data[13]]);
        let eth = EthernetHeader { dst, src, ethertype };
        let body = &data[ETH_HDR_LEN..];

        let payload = match ethertype {
            ETHERTYPE_ARP => FramePayload::Arp(parse_arp(body)?),
            ETHERTYPE_IPV4 => FramePayload::Ipv4(parse_ipv4(body)?),
            ETHERTYPE_LLDP => FramePayload::Lldp,
            _ => FramePayload::Other,
        };

        Some(Self { eth, payload })
    }
}

#[inline]
fn parse_arp(body: &[u8]) -> Option<ArpMeta> {
    if body.len() < ARP_BODY_LEN {
        return None;
    }

    let opcode = u16::from_be_bytes([body[6], body[7]]);
    let sender = Ipv4Addr::new(body[14], body[15], body[16], body[17]);
    let target = Ipv4Addr::new(body[24], body[25], body[26], body[27]);

    Some(ArpMeta {
        opcode,
        sender,
        target,
    })
}

#[inline]
fn parse_ipv4(body: &[u8]) -> Option<Ipv4Meta> {
    if body.len() < IPV4_MIN_HDR_LEN {
        return None;
    }

    let ihl = ((body[0] & 0x0f) as usize) * 4;
    if ihl < IPV4_MIN_HDR_LEN || body.len() < ihl {
        return None;
    }

    let protocol = body[9];
    let src = Ipv4Addr::new(body[12], body[13], body[14], body[15]);
    let dst = Ipv4Addr::new(body[16], body[17], body[18], body[19]);
    let l4 = &body[ihl..];

    let is_return_traffic = match protocol {
        // TCP ACK flag
        IPPROTO_TCP => l4.len() >= 14 && l4[13] & 0x10 != 0,
        // ICMP echo reply
        IPPROTO_ICMP => l4.first() == Some(&0),
        _ => false,
    };

    Some(Ipv4Meta {
        src,
        dst,
        protocol,
        is_return_traffic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_frame(ethertype: u16, body: &[u8]) -> Vec<u8> {
        let mut pkt = vec![
            0x00, 0x00, 0x5e, 0x00, 0x53, 0x01, // dst mac
            0x00, 0x00, 0x5e, 0x00, 0x53, 0x02, // src mac
        ];
        pkt.extend_from_slice(&ethertype.to_be_bytes());
        pkt.extend_from_slice(body);
        pkt
    }

    fn ipv4_body(protocol: u8, src: [u8; 4], dst: [u8; 4], l4: &[u8]) -> Vec<u8> {
        let mut body = vec![
            0x45, 0x00, 0x00, 0x28, // version/ihl, tos, total length
            0x00, 0x00, 0x00, 0x00, // id, flags, frag
            0x40, protocol, 0x00, 0x00, // ttl, protocol, checksum
        ];
        body.extend_from_slice(&src);
        body.extend_from_slice(&dst);
        body.extend_from_slice(l4);
        body
    }

    #[test]
    fn test_parse_arp_request() {
        let mut arp = vec![
            0x00, 0x01, 0x08, 0x00, 0x06, 0x04, // hw/proto types, sizes
            0x00, 0x01, // opcode: request
        ];
        arp.extend_from_slice(&[0x00, 0x00, 0x5e, 0x00, 0x53, 0x02]); // sender mac
        arp.extend_from_slice(&[10, 0, 0, 101]); // sender ip
        arp.extend_from_slice(&[0x00; 6]); // target mac
        arp.extend_from_slice(&[10, 0, 0, 21]); // target ip

        let frame = ParsedFrame::parse(&eth_frame(ETHERTYPE_ARP, &arp)).unwrap();
        match frame.payload {
            FramePayload::Arp(meta) => {
                assert_eq!(meta.opcode, ARP_OP_REQUEST);
                assert_eq!(meta.sender, Ipv4Addr::new(10, 0, 0, 101));
                assert_eq!(meta.target, Ipv4Addr::new(10, 0, 0, 21));
            }
            other => panic!("expected ARP, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tcp_ack_is_return_traffic() {
        // TCP header with ACK flag set
        let mut l4 = vec![0u8; 20];
        l4[13] = 0x10;
        let body = ipv4_body(IPPROTO_TCP, [10, 0, 0, 11], [10, 0, 0, 101], &l4);

        let frame = ParsedFrame::parse(&eth_frame(ETHERTYPE_IPV4, &body)).unwrap();
        match frame.payload {
            FramePayload::Ipv4(meta) => {
                assert_eq!(meta.protocol, IPPROTO_TCP);
                assert!(meta.is_return_traffic);
            }
            other => panic!("expected IPv4, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tcp_syn_is_not_return_traffic() {
        let mut l4 = vec![0u8; 20];
        l4[13] = 0x02; // SYN only
        let body = ipv4_body(IPPROTO_TCP, [10, 0, 0, 101], [10, 0, 0, 11], &l4);

        let frame = ParsedFrame::parse(&eth_frame(ETHERTYPE_IPV4, &body)).unwrap();
        match frame.payload {
            FramePayload::Ipv4(meta) => assert!(!meta.is_return_traffic),
            other => panic!("expected IPv4, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_icmp_echo_reply() {
        let reply = ipv4_body(IPPROTO_ICMP, [10, 0, 0, 11], [10, 0, 0, 101], &[0, 0, 0, 0]);
        let request = ipv4_body(IPPROTO_ICMP, [10, 0, 0, 101], [10, 0, 0, 11], &[8, 0, 0, 0]);

        let parse = |body: &[u8]| match ParsedFrame::parse(&eth_frame(ETHERTYPE_IPV4, body)) {
            Some(ParsedFrame {
                payload: FramePayload::Ipv4(meta),
                ..
            }) => meta,
            other => panic!("expected IPv4, got {other:?}"),
        };

        assert!(parse(&reply).is_return_traffic);
        assert!(!parse(&request).is_return_traffic);
    }

    #[test]
    fn test_truncated_frames_unparseable() {
        // No Ethernet header at all
        assert!(ParsedFrame::parse(&[0x00; 8]).is_none());
        // Advertises IPv4 but carries half a header
        assert!(ParsedFrame::parse(&eth_frame(ETHERTYPE_IPV4, &[0x45; 10])).is_none());
        // Advertises ARP but body too short
        assert!(ParsedFrame::parse(&eth_frame(ETHERTYPE_ARP, &[0x00; 12])).is_none());
    }

    #[test]
    fn test_lldp_and_other_ethertypes() {
        let lldp = ParsedFrame::parse(&eth_frame(ETHERTYPE_LLDP, &[])).unwrap();
        assert_eq!(lldp.payload, FramePayload::Lldp);

        let ipv6 = ParsedFrame::parse(&eth_frame(0x86dd, &[0x60; 40])).unwrap();
        assert_eq!(ipv6.payload, FramePayload::Other);
    }
}
