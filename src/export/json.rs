use anyhow::Result;
use std::io::Write;

use crate::state::{HopReport, HopResult};

/// Flatten a report into the hop record written as JSON
///
/// Silent hops become a record with every RTT null and no responder.
pub fn hop_record(report: &HopReport) -> HopResult {
    match report {
        HopReport::TimedOut { ttl, probes } => HopResult {
            ttl: *ttl,
            rtts: vec![None; *probes],
            responder: None,
            hostname: None,
            terminal: false,
        },
        HopReport::Replied(hop) => hop.clone(),
    }
}

/// Write one hop as a single line of JSON
pub fn export_hop_json<W: Write>(report: &HopReport, mut writer: W) -> Result<()> {
    serde_json::to_writer(&mut writer, &hop_record(report))?;
    writeln!(writer)?;
    Ok(())
}
