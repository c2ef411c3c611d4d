use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::TraceResult;
use crate::probe::{
    IcmpHeader, IpHeader, MAX_DATAGRAM_SIZE, build_echo_request, create_raw_icmp_socket,
    get_identifier, parse_icmp_header, parse_ip_header, parse_timestamp, recv_icmp, send_icmp,
    set_ttl, unix_time, wait_readable,
};

/// What a single probe observed
///
/// All fields are None when the probe timed out or the reply carried no
/// usable timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeOutcome {
    pub rtt_ms: Option<f64>,
    pub ip_header: Option<IpHeader>,
    pub icmp_header: Option<IcmpHeader>,
}

impl ProbeOutcome {
    /// True if the destination itself answered
    pub fn is_echo_reply(&self) -> bool {
        self.rtt_ms.is_some() && self.icmp_header.is_some_and(|h| h.is_echo_reply())
    }

    /// Source address of the reply, if any
    pub fn responder(&self) -> Option<Ipv4Addr> {
        self.ip_header.map(|h| h.source)
    }
}

/// Sends one probe at a given TTL and reports what came back
pub trait Prober {
    fn send_and_measure(&mut self, ttl: u32, sequence_number: u16) -> TraceResult<ProbeOutcome>;
}

/// Decode a received datagram and compute RTT against its embedded timestamp
///
/// `received_at` is seconds since the Unix epoch.
pub fn measure(reply: &[u8], received_at: f64) -> ProbeOutcome {
    let Some(icmp_header) = parse_icmp_header(reply) else {
        debug!(len = reply.len(), "reply too short for ICMP header");
        return ProbeOutcome::default();
    };
    let ip_header = parse_ip_header(reply);

    let Some(sent_at) = parse_timestamp(reply, icmp_header.icmp_type) else {
        debug!(
            icmp_type = icmp_header.icmp_type,
            len = reply.len(),
            "reply carries no usable timestamp"
        );
        return ProbeOutcome::default();
    };

    let rtt_ms = (received_at - sent_at) * 1000.0;
    if rtt_ms < 0.0 {
        warn!(rtt_ms, "negative round-trip time, system clock moved backwards");
    }

    ProbeOutcome {
        rtt_ms: Some(rtt_ms),
        ip_header,
        icmp_header: Some(icmp_header),
    }
}

/// Sends ICMP Echo Requests over a fresh raw socket per probe
pub struct ProbeEngine {
    target: Ipv4Addr,
    identifier: u16,
    packet_size: usize,
    timeout: Duration,
}

impl ProbeEngine {
    pub fn new(target: Ipv4Addr, config: &Config) -> Self {
        Self {
            target,
            identifier: get_identifier(),
            packet_size: config.packet_size,
            timeout: config.timeout,
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }
}

impl Prober for ProbeEngine {
    fn send_and_measure(&mut self, ttl: u32, sequence_number: u16) -> TraceResult<ProbeOutcome> {
        // Closed on drop, on every return path below
        let socket = create_raw_icmp_socket()?;
        set_ttl(&socket, ttl)?;

        // Send time is the timestamp embedded at build time
        let packet = build_echo_request(self.identifier, sequence_number, self.packet_size)?;
        send_icmp(&socket, &packet, self.target)?;
        debug!(ttl, seq = sequence_number, target = %self.target, "sent echo request");

        if !wait_readable(&socket, self.timeout)? {
            debug!(ttl, seq = sequence_number, "probe timed out");
            return Ok(ProbeOutcome::default());
        }

        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
        let len = recv_icmp(&socket, &mut buffer)?;
        let outcome = measure(&buffer[..len], unix_time());

        // Replies are not matched against the probe identity; only flag it
        if let Some(icmp) = outcome.icmp_header
            && icmp.is_echo_reply()
            && icmp.identifier != self.identifier
        {
            debug!(
                expected = self.identifier,
                got = icmp.identifier,
                "echo reply identifier does not match this run"
            );
        }

        Ok(outcome)
    }
}
