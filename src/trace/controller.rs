use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::error::TraceResult;
use crate::state::{HopReport, HopResult, TraceOutcome};
use crate::trace::engine::Prober;

/// Receives each hop as soon as it completes
pub trait HopSink {
    fn report(&mut self, report: HopReport);
}

impl HopSink for Vec<HopReport> {
    fn report(&mut self, report: HopReport) {
        self.push(report);
    }
}

impl HopSink for UnboundedSender<HopReport> {
    fn report(&mut self, report: HopReport) {
        if self.send(report).is_err() {
            debug!("report receiver closed, dropping hop");
        }
    }
}

/// Drives the TTL escalation loop
///
/// Owns the sequence counter for the run; it advances before every probe and
/// is never reset between hops.
pub struct TraceController<P> {
    prober: P,
    count: usize,
    max_hops: u32,
    sequence_number: u16,
    cancel: CancellationToken,
}

impl<P: Prober> TraceController<P> {
    pub fn new(prober: P, config: &Config, cancel: CancellationToken) -> Self {
        Self {
            prober,
            count: config.count,
            max_hops: config.max_hops,
            sequence_number: 0,
            cancel,
        }
    }

    /// Sequence number of the last probe sent
    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Probe TTL 1..=max_hops, reporting each completed hop to `sink`
    ///
    /// Stops after the hop where the destination answered, when the hop budget
    /// runs out, or when cancelled. A cancelled hop is not reported.
    pub fn run<S: HopSink>(&mut self, sink: &mut S) -> TraceResult<TraceOutcome> {
        let mut completed = 0;

        for ttl in 1..=self.max_hops {
            let Some(hop) = self.probe_hop(ttl)? else {
                debug!(ttl, completed, "trace cancelled");
                return Ok(TraceOutcome::Cancelled { hops: completed });
            };

            let terminal = hop.terminal;
            sink.report(HopReport::from(hop));
            completed = ttl;

            if terminal {
                return Ok(TraceOutcome::Reached { hops: ttl });
            }
        }

        Ok(TraceOutcome::Exhausted {
            hops: self.max_hops,
        })
    }

    /// Send `count` probes at one TTL; None if cancelled part way
    fn probe_hop(&mut self, ttl: u32) -> TraceResult<Option<HopResult>> {
        let mut hop = HopResult::new(ttl, self.count);

        for _ in 0..self.count {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            self.sequence_number = self.sequence_number.wrapping_add(1);
            let outcome = self.prober.send_and_measure(ttl, self.sequence_number)?;

            hop.rtts.push(outcome.rtt_ms);
            if outcome.rtt_ms.is_none() {
                continue;
            }
            if let Some(responder) = outcome.responder() {
                hop.responder = Some(responder);
            }
            hop.terminal |= outcome.is_echo_reply();
        }

        Ok(Some(hop))
    }
}
