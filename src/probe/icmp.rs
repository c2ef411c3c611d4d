use pnet::packet::MutablePacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{TraceError, TraceResult};
use crate::probe::checksum::internet_checksum;

/// ICMP header size (fixed)
pub const ICMP_HEADER_SIZE: usize = 8;
/// Size of the big-endian f64 send timestamp at the start of the payload
pub const TIMESTAMP_SIZE: usize = 8;
/// Default payload size (timestamp + 30 filler bytes)
pub const DEFAULT_PACKET_SIZE: usize = 38;
/// First filler byte value ('A')
const FILLER_BASE: usize = 65;

/// Get process identifier for ICMP identification field
pub fn get_identifier() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}

/// Current wall-clock time as seconds since the Unix epoch
pub fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Build an ICMP Echo Request stamped with the current time
///
/// `packet_size` is the payload length; the returned datagram is
/// `ICMP_HEADER_SIZE + packet_size` bytes.
pub fn build_echo_request(
    identifier: u16,
    sequence: u16,
    packet_size: usize,
) -> TraceResult<Vec<u8>> {
    build_echo_request_at(identifier, sequence, packet_size, unix_time())
}

/// Build an ICMP Echo Request carrying an explicit send timestamp
///
/// Payload layout:
/// - Bytes 0-7: send time, seconds since epoch, big-endian f64
/// - Bytes 8+: filler, byte `i` is `(65 + i) mod 256`
pub fn build_echo_request_at(
    identifier: u16,
    sequence: u16,
    packet_size: usize,
    timestamp: f64,
) -> TraceResult<Vec<u8>> {
    if packet_size < TIMESTAMP_SIZE {
        return Err(TraceError::Configuration(format!(
            "packet size {} is smaller than the {}-byte timestamp",
            packet_size, TIMESTAMP_SIZE
        )));
    }

    let mut buffer = vec![0u8; ICMP_HEADER_SIZE + packet_size];
    {
        let mut packet = MutableEchoRequestPacket::new(&mut buffer).ok_or_else(|| {
            TraceError::Configuration("echo request buffer too small".to_string())
        })?;

        packet.set_icmp_type(IcmpTypes::EchoRequest);
        packet.set_icmp_code(IcmpCode::new(0));
        packet.set_checksum(0);
        packet.set_identifier(identifier);
        packet.set_sequence_number(sequence);

        let payload = packet.payload_mut();
        payload[..TIMESTAMP_SIZE].copy_from_slice(&timestamp.to_be_bytes());
        for (i, byte) in payload[TIMESTAMP_SIZE..].iter_mut().enumerate() {
            *byte = ((FILLER_BASE + i) & 0xFF) as u8;
        }
    }

    let cksum = internet_checksum(&buffer);
    buffer[2..4].copy_from_slice(&cksum.to_be_bytes());

    Ok(buffer)
}
