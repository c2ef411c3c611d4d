//! Integration tests for the probe -> parse -> controller pipeline
//!
//! Replies are synthesized as raw IPv4 datagrams and decoded through the same
//! path the live engine uses, so no network access or privilege is needed.

use std::net::Ipv4Addr;

use icmptrace::TraceError;
use icmptrace::config::Config;
use icmptrace::probe::{
    ICMP_ECHO_REPLY, ICMP_HEADER_SIZE, ICMP_TIME_EXCEEDED, IP_HEADER_SIZE, build_echo_request,
    build_echo_request_at, parse_icmp_header, parse_timestamp, verify_checksum,
};
use icmptrace::state::{HopReport, TraceOutcome};
use icmptrace::trace::{ProbeOutcome, Prober, TraceController, measure};
use tokio_util::sync::CancellationToken;

const SENT_AT: f64 = 1_700_000_000.0;
const DEST: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

fn ip_header(src: Ipv4Addr, dst: Ipv4Addr) -> Vec<u8> {
    let mut ip = vec![0x45, 0, 0, 0, 0, 0, 0x40, 0, 64, 1, 0, 0];
    ip.extend_from_slice(&src.octets());
    ip.extend_from_slice(&dst.octets());
    ip
}

/// Raw datagram a router or the destination would send back for a probe
fn reply_datagram(from: Ipv4Addr, icmp_type: u8, seq: u16) -> Vec<u8> {
    let probe = build_echo_request_at(0x1234, seq, 38, SENT_AT).unwrap();
    let me = Ipv4Addr::new(192, 168, 1, 10);
    let mut data = ip_header(from, me);
    if icmp_type == ICMP_ECHO_REPLY {
        let mut echoed = probe;
        echoed[0] = ICMP_ECHO_REPLY;
        data.extend_from_slice(&echoed);
    } else {
        data.extend_from_slice(&[icmp_type, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&ip_header(me, DEST));
        data.extend_from_slice(&probe);
    }
    data
}

fn router(ttl: u32) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, ttl as u8)
}

/// Prober driven by a closure, recording every probe it was asked for
struct Scripted<F> {
    respond: F,
    sent: Vec<(u32, u16)>,
}

impl<F> Scripted<F>
where
    F: FnMut(u32, u16) -> Result<ProbeOutcome, TraceError>,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            sent: Vec::new(),
        }
    }
}

impl<F> Prober for Scripted<F>
where
    F: FnMut(u32, u16) -> Result<ProbeOutcome, TraceError>,
{
    fn send_and_measure(&mut self, ttl: u32, seq: u16) -> Result<ProbeOutcome, TraceError> {
        self.sent.push((ttl, seq));
        (self.respond)(ttl, seq)
    }
}

fn answer(from: Ipv4Addr, icmp_type: u8, seq: u16, rtt_secs: f64) -> ProbeOutcome {
    measure(&reply_datagram(from, icmp_type, seq), SENT_AT + rtt_secs)
}

fn config(count: usize, max_hops: u32) -> Config {
    Config {
        count,
        max_hops,
        ..Config::default()
    }
}

#[test]
fn test_packet_length_is_header_plus_payload() {
    for size in [8, 9, 38, 64, 1472] {
        let packet = build_echo_request(1, 1, size).unwrap();
        assert_eq!(packet.len(), size + ICMP_HEADER_SIZE);
        assert!(verify_checksum(&packet));
    }
}

#[test]
fn test_small_packet_size_rejected_before_build() {
    let config = Config {
        packet_size: 4,
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(TraceError::Configuration(_))));
    assert!(matches!(
        build_echo_request(1, 1, 4),
        Err(TraceError::Configuration(_))
    ));
}

#[test]
fn test_echo_reply_timestamp_roundtrip() {
    let packet = build_echo_request_at(7, 8, 38, 1_234_567_890.5).unwrap();
    let mut datagram = ip_header(DEST, Ipv4Addr::new(192, 168, 1, 10));
    datagram.extend_from_slice(&packet);
    datagram[IP_HEADER_SIZE] = ICMP_ECHO_REPLY;

    let icmp = parse_icmp_header(&datagram).unwrap();
    let stamp = parse_timestamp(&datagram, icmp.icmp_type).unwrap();
    assert!((stamp - 1_234_567_890.5).abs() < f64::EPSILON);
}

#[test]
fn test_time_exceeded_timestamp_and_truncation() {
    let datagram = reply_datagram(router(1), ICMP_TIME_EXCEEDED, 1);
    assert_eq!(parse_timestamp(&datagram, ICMP_TIME_EXCEEDED), Some(SENT_AT));

    // Shorter than offset 56 + 8 bytes: absent, never a panic
    for len in 0..64 {
        assert_eq!(parse_timestamp(&datagram[..len], ICMP_TIME_EXCEEDED), None);
    }
}

#[test]
fn test_stops_at_destination() {
    let prober = Scripted::new(|ttl, seq| {
        Ok(if ttl < 4 {
            answer(router(ttl), ICMP_TIME_EXCEEDED, seq, 0.001 * ttl as f64)
        } else {
            answer(DEST, ICMP_ECHO_REPLY, seq, 0.020)
        })
    });
    let mut controller = TraceController::new(prober, &config(3, 30), CancellationToken::new());
    let mut reports = Vec::new();

    let outcome = controller.run(&mut reports).unwrap();

    assert_eq!(outcome, TraceOutcome::Reached { hops: 4 });
    assert_eq!(reports.len(), 4);
    assert!(reports[..3].iter().all(|r| !r.is_terminal()));

    let HopReport::Replied(last) = &reports[3] else {
        panic!("destination hop should have replies");
    };
    assert!(last.terminal);
    assert_eq!(last.responder, Some(DEST));
    assert_eq!(last.rtts.len(), 3);
    assert!(last.rtts.iter().all(|r| (r.unwrap() - 20.0).abs() < 1e-3));

    let HopReport::Replied(second) = &reports[1] else {
        panic!("router hop should have replies");
    };
    assert_eq!(second.responder, Some(router(2)));
    assert!((second.rtts[0].unwrap() - 2.0).abs() < 1e-3);
}

#[test]
fn test_silent_hop_reported_and_loop_continues() {
    let prober = Scripted::new(|ttl, seq| {
        Ok(match ttl {
            2 => ProbeOutcome::default(),
            3 => answer(DEST, ICMP_ECHO_REPLY, seq, 0.005),
            _ => answer(router(ttl), ICMP_TIME_EXCEEDED, seq, 0.001),
        })
    });
    let mut controller = TraceController::new(prober, &config(3, 30), CancellationToken::new());
    let mut reports = Vec::new();

    let outcome = controller.run(&mut reports).unwrap();

    assert_eq!(outcome, TraceOutcome::Reached { hops: 3 });
    assert_eq!(reports[1], HopReport::TimedOut { ttl: 2, probes: 3 });
    assert_eq!(reports[2].ttl(), 3);
}

#[test]
fn test_hop_budget_exhausted_without_error() {
    let prober = Scripted::new(|_, _| Ok(ProbeOutcome::default()));
    let mut controller = TraceController::new(prober, &config(2, 5), CancellationToken::new());
    let mut reports = Vec::new();

    let outcome = controller.run(&mut reports).unwrap();

    assert_eq!(outcome, TraceOutcome::Exhausted { hops: 5 });
    assert_eq!(
        reports.iter().map(HopReport::ttl).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert!(
        reports
            .iter()
            .all(|r| matches!(r, HopReport::TimedOut { probes: 2, .. }))
    );
}

#[test]
fn test_partial_loss_keeps_probe_order() {
    let prober = Scripted::new(|ttl, seq| {
        // Second probe of every hop is dropped
        Ok(if seq % 3 == 2 {
            ProbeOutcome::default()
        } else {
            answer(router(ttl), ICMP_TIME_EXCEEDED, seq, 0.003)
        })
    });
    let mut controller = TraceController::new(prober, &config(3, 1), CancellationToken::new());
    let mut reports = Vec::new();
    controller.run(&mut reports).unwrap();

    let HopReport::Replied(hop) = &reports[0] else {
        panic!("hop with some replies should be Replied");
    };
    assert!(hop.rtts[0].is_some());
    assert!(hop.rtts[1].is_none());
    assert!(hop.rtts[2].is_some());
    assert_eq!(hop.responder, Some(router(1)));
}

#[test]
fn test_unusable_reply_counts_as_timeout() {
    // Destination Unreachable carries no recognizable timestamp offset
    let prober = Scripted::new(|ttl, seq| Ok(answer(router(ttl), 3, seq, 0.001)));
    let mut controller = TraceController::new(prober, &config(2, 1), CancellationToken::new());
    let mut reports = Vec::new();
    controller.run(&mut reports).unwrap();

    assert_eq!(reports, vec![HopReport::TimedOut { ttl: 1, probes: 2 }]);
}

#[test]
fn test_transport_error_aborts_run() {
    let prober = Scripted::new(|ttl, seq| {
        if ttl == 2 {
            Err(TraceError::from_socket(
                "sendto",
                std::io::Error::from(std::io::ErrorKind::NetworkUnreachable),
            ))
        } else {
            Ok(answer(router(ttl), ICMP_TIME_EXCEEDED, seq, 0.001))
        }
    });
    let mut controller = TraceController::new(prober, &config(3, 10), CancellationToken::new());
    let mut reports = Vec::new();

    let err = controller.run(&mut reports).unwrap_err();
    assert!(matches!(err, TraceError::Transport { op: "sendto", .. }));
    assert_eq!(reports.len(), 1);
}

#[test]
fn test_cancel_mid_hop_drops_partial_hop() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let prober = Scripted::new(move |ttl, seq| {
        if ttl == 3 {
            trigger.cancel();
        }
        Ok(answer(router(ttl), ICMP_TIME_EXCEEDED, seq, 0.001))
    });
    let mut controller = TraceController::new(prober, &config(3, 10), cancel);
    let mut reports = Vec::new();

    let outcome = controller.run(&mut reports).unwrap();

    assert_eq!(outcome, TraceOutcome::Cancelled { hops: 2 });
    assert_eq!(reports.len(), 2);
    // The probe in flight when cancelled finishes; no further probes are sent
    assert_eq!(controller.sequence_number(), 7);
}

#[test]
fn test_sequence_numbers_never_reset() {
    let prober = Scripted::new(|_, _| Ok(ProbeOutcome::default()));
    let mut controller = TraceController::new(prober, &config(3, 4), CancellationToken::new());
    let mut reports = Vec::new();
    controller.run(&mut reports).unwrap();

    assert_eq!(controller.sequence_number(), 12);
}
