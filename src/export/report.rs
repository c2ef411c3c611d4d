use std::io::Write;
use std::net::Ipv4Addr;

use crate::config::Config;
use crate::state::{HopReport, HopResult};

/// First line of a trace, printed before any probe is sent
pub fn write_banner<W: Write>(
    host: &str,
    target: Ipv4Addr,
    config: &Config,
    mut writer: W,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "traceroute to {} ({}), {} hops max, {} byte packets",
        host, target, config.max_hops, config.packet_size
    )
}

/// Write one hop in classic traceroute layout
///
/// `3   core1.example.net (10.0.0.1) 1.234 ms * 1.301 ms`
pub fn write_hop<W: Write>(report: &HopReport, mut writer: W) -> std::io::Result<()> {
    match report {
        HopReport::TimedOut { ttl, probes } => {
            write!(writer, "{:<3}", ttl)?;
            for _ in 0..*probes {
                write!(writer, " *")?;
            }
            writeln!(writer)
        }
        HopReport::Replied(hop) => {
            write!(writer, "{:<3}", hop.ttl)?;
            if let Some(ip) = hop.responder {
                write!(writer, " {} ({})", display_name(hop, ip), ip)?;
            }
            for rtt in &hop.rtts {
                match rtt {
                    Some(ms) => write!(writer, " {:.3} ms", ms)?,
                    None => write!(writer, " *")?,
                }
            }
            writeln!(writer)
        }
    }
}

/// Hostname if reverse lookup found one, else the address itself
fn display_name(hop: &HopResult, ip: Ipv4Addr) -> String {
    hop.hostname.clone().unwrap_or_else(|| ip.to_string())
}

/// Render a hop to string
pub fn hop_line(report: &HopReport) -> String {
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail
    let _ = write_hop(report, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
