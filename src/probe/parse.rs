//! Decoding of raw IPv4 datagrams returned by a raw ICMP socket.
//!
//! Received buffers start with the IPv4 header. Only the fixed 20-byte header
//! is understood; IP options are not supported.

use serde::Serialize;
use std::net::Ipv4Addr;
use tracing::debug;

use crate::probe::icmp::{ICMP_HEADER_SIZE, TIMESTAMP_SIZE};

/// Fixed IPv4 header size (no options)
pub const IP_HEADER_SIZE: usize = 20;

/// ICMP Echo Reply type
pub const ICMP_ECHO_REPLY: u8 = 0;
/// ICMP Time Exceeded type
pub const ICMP_TIME_EXCEEDED: u8 = 11;

/// Decoded IPv4 header (`BBHHHBBHII`, network byte order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IpHeader {
    pub version_ihl: u8,
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags_fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub header_checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl IpHeader {
    pub fn version(&self) -> u8 {
        self.version_ihl >> 4
    }
}

/// Decoded ICMP header (`BBHHH`, network byte order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence_number: u16,
}

impl IcmpHeader {
    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type == ICMP_ECHO_REPLY
    }
}

fn be16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn addr(data: &[u8], at: usize) -> Ipv4Addr {
    Ipv4Addr::new(data[at], data[at + 1], data[at + 2], data[at + 3])
}

/// Decode the first 20 bytes as an IPv4 header
///
/// Returns None if the buffer is shorter than a header.
pub fn parse_ip_header(data: &[u8]) -> Option<IpHeader> {
    let ip = data.get(..IP_HEADER_SIZE)?;

    let header = IpHeader {
        version_ihl: ip[0],
        type_of_service: ip[1],
        total_length: be16(ip, 2),
        identification: be16(ip, 4),
        flags_fragment_offset: be16(ip, 6),
        ttl: ip[8],
        protocol: ip[9],
        header_checksum: be16(ip, 10),
        source: addr(ip, 12),
        destination: addr(ip, 16),
    };
    debug!(?header, "unpacked IP header");
    Some(header)
}

/// Decode the ICMP header that follows the IPv4 header (bytes 20..28)
pub fn parse_icmp_header(data: &[u8]) -> Option<IcmpHeader> {
    let icmp = data.get(IP_HEADER_SIZE..IP_HEADER_SIZE + ICMP_HEADER_SIZE)?;

    let header = IcmpHeader {
        icmp_type: icmp[0],
        code: icmp[1],
        checksum: be16(icmp, 2),
        identifier: be16(icmp, 4),
        sequence_number: be16(icmp, 6),
    };
    debug!(?header, "unpacked ICMP header");
    Some(header)
}

/// Offset of the embedded send timestamp for a reply of the given ICMP type
///
/// An Echo Reply carries our payload right after its own headers. A Time
/// Exceeded message quotes the original IP and ICMP headers first.
fn timestamp_offset(icmp_type: u8) -> Option<usize> {
    const HEADERS: usize = IP_HEADER_SIZE + ICMP_HEADER_SIZE;
    match icmp_type {
        ICMP_ECHO_REPLY => Some(HEADERS),
        ICMP_TIME_EXCEEDED => Some(HEADERS * 2),
        _ => None,
    }
}

/// Extract the send timestamp we embedded in the probe payload
///
/// Returns None for unrecognized ICMP types and for replies truncated before
/// the end of the timestamp.
pub fn parse_timestamp(data: &[u8], icmp_type: u8) -> Option<f64> {
    let offset = timestamp_offset(icmp_type)?;
    let bytes = data.get(offset..offset + TIMESTAMP_SIZE)?;
    Some(f64::from_be_bytes(bytes.try_into().ok()?))
}
