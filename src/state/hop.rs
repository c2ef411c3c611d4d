use serde::Serialize;
use std::net::Ipv4Addr;

/// Measurements for one TTL
///
/// Built once per hop by the controller, enriched with a hostname by the
/// reporter, then dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopResult {
    pub ttl: u32,
    /// One entry per probe, in send order; None for a probe with no usable reply
    pub rtts: Vec<Option<f64>>,
    /// Source of the last reply at this hop
    pub responder: Option<Ipv4Addr>,
    pub hostname: Option<String>,
    /// True if the destination answered at this hop
    pub terminal: bool,
}

impl HopResult {
    pub fn new(ttl: u32, probes: usize) -> Self {
        Self {
            ttl,
            rtts: Vec::with_capacity(probes),
            responder: None,
            hostname: None,
            terminal: false,
        }
    }

    /// True if no probe at this hop got an answer
    pub fn all_timed_out(&self) -> bool {
        self.rtts.iter().all(Option::is_none)
    }

    pub fn received(&self) -> usize {
        self.rtts.iter().flatten().count()
    }
}

/// Per-hop report handed to the output side
#[derive(Debug, Clone, PartialEq)]
pub enum HopReport {
    /// Every probe at this TTL went unanswered
    TimedOut { ttl: u32, probes: usize },
    Replied(HopResult),
}

impl HopReport {
    pub fn ttl(&self) -> u32 {
        match self {
            HopReport::TimedOut { ttl, .. } => *ttl,
            HopReport::Replied(hop) => hop.ttl,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HopReport::Replied(hop) if hop.terminal)
    }
}

impl From<HopResult> for HopReport {
    fn from(hop: HopResult) -> Self {
        if hop.all_timed_out() {
            HopReport::TimedOut {
                ttl: hop.ttl,
                probes: hop.rtts.len(),
            }
        } else {
            HopReport::Replied(hop)
        }
    }
}

/// How a trace ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceOutcome {
    /// The destination sent an Echo Reply at hop `hops`
    Reached { hops: u32 },
    /// The hop budget ran out without an Echo Reply
    Exhausted { hops: u32 },
    /// Interrupted; `hops` complete hops were reported
    Cancelled { hops: u32 },
}

impl TraceOutcome {
    pub fn hops(&self) -> u32 {
        match *self {
            TraceOutcome::Reached { hops }
            | TraceOutcome::Exhausted { hops }
            | TraceOutcome::Cancelled { hops } => hops,
        }
    }
}
