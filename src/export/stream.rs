use anyhow::Result;
use std::io::Write;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::export::{export_hop_json, write_hop};
use crate::lookup::DnsLookup;
use crate::state::HopReport;

/// Output layout for hop reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print hop reports as they arrive, resolving responder names on the way
///
/// Runs until the sending side is dropped. Reports are written in arrival
/// order, which is TTL order.
pub async fn run_reporter<W: Write>(
    mut reports: UnboundedReceiver<HopReport>,
    mut dns: Option<DnsLookup>,
    format: OutputFormat,
    mut writer: W,
) -> Result<()> {
    while let Some(mut report) = reports.recv().await {
        if let (Some(dns), HopReport::Replied(hop)) = (dns.as_mut(), &mut report)
            && let Some(ip) = hop.responder
        {
            hop.hostname = dns.reverse_lookup(ip).await;
        }

        match format {
            OutputFormat::Text => write_hop(&report, &mut writer)?,
            OutputFormat::Json => export_hop_json(&report, &mut writer)?,
        }
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HopResult;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_reporter_writes_in_order_until_closed() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(HopReport::TimedOut { ttl: 1, probes: 2 }).unwrap();
        tx.send(HopReport::Replied(HopResult {
            ttl: 2,
            rtts: vec![Some(3.0), Some(4.0)],
            responder: Some(Ipv4Addr::new(192, 0, 2, 1)),
            hostname: None,
            terminal: true,
        }))
        .unwrap();
        drop(tx);

        let mut out = Vec::new();
        run_reporter(rx, None, OutputFormat::Text, &mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1   * *\n2   192.0.2.1 (192.0.2.1) 3.000 ms 4.000 ms\n"
        );
    }

    #[tokio::test]
    async fn test_reporter_json_lines() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(HopReport::TimedOut { ttl: 1, probes: 1 }).unwrap();
        tx.send(HopReport::TimedOut { ttl: 2, probes: 1 }).unwrap();
        drop(tx);

        let mut out = Vec::new();
        run_reporter(rx, None, OutputFormat::Json, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| serde_json::from_str::<serde_json::Value>(l).is_ok()));
    }
}
