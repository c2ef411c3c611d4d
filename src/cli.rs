use clap::Parser;
use std::time::Duration;

/// Trace the route to a host with ICMP Echo probes of increasing TTL
#[derive(Parser, Debug, Clone)]
#[command(name = "icmptrace")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target host to trace (IPv4 address or hostname)
    pub host: String,

    /// Number of probes per hop
    #[arg(short = 'c', long = "count", default_value = "3")]
    pub count: usize,

    /// Maximum number of hops (TTL)
    #[arg(short = 'm', long = "max-hops", default_value = "64")]
    pub max_hops: u32,

    /// Probe timeout in milliseconds
    #[arg(short = 't', long = "timeout", default_value = "4000")]
    pub timeout: u64,

    /// ICMP payload size in bytes (at least 8)
    #[arg(short = 'p', long = "packet-size", default_value = "38")]
    pub packet_size: usize,

    /// Log decoded IP and ICMP headers
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Skip reverse DNS lookups of responding routers
    #[arg(long = "no-dns")]
    pub no_dns: bool,

    /// Print one JSON object per hop
    #[arg(long = "json")]
    pub json: bool,
}

impl Args {
    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}
