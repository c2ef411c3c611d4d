use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cli::Args;
use crate::error::{TraceError, TraceResult};
use crate::probe::{DEFAULT_PACKET_SIZE, TIMESTAMP_SIZE};

/// Largest hop budget; the IP TTL field is 8 bits
pub const MAX_HOPS_LIMIT: u32 = 255;

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Probes sent at each TTL
    pub count: usize,
    /// Highest TTL probed
    pub max_hops: u32,
    /// Per-probe wait for a reply
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// ICMP payload size in bytes (timestamp + filler)
    pub packet_size: usize,
    /// Reverse-resolve responding routers
    pub dns_enabled: bool,
    /// Log decoded headers
    pub debug: bool,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            count: 3,
            max_hops: 64,
            timeout: Duration::from_millis(4000),
            packet_size: DEFAULT_PACKET_SIZE,
            dns_enabled: true,
            debug: false,
            json: false,
        }
    }
}

impl Config {
    /// Reject values that cannot produce a meaningful trace
    pub fn validate(&self) -> TraceResult<()> {
        if self.packet_size < TIMESTAMP_SIZE {
            return Err(TraceError::Configuration(format!(
                "packet size must be at least {} bytes to hold the timestamp",
                TIMESTAMP_SIZE
            )));
        }
        if self.count == 0 {
            return Err(TraceError::Configuration(
                "probe count must be at least 1".into(),
            ));
        }
        if self.max_hops == 0 || self.max_hops > MAX_HOPS_LIMIT {
            return Err(TraceError::Configuration(format!(
                "max hops must be between 1 and {}",
                MAX_HOPS_LIMIT
            )));
        }
        if self.timeout.is_zero() {
            return Err(TraceError::Configuration("timeout must be positive".into()));
        }
        Ok(())
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            count: args.count,
            max_hops: args.max_hops,
            timeout: args.timeout_duration(),
            packet_size: args.packet_size,
            dns_enabled: !args.no_dns,
            debug: args.debug,
            json: args.json,
        }
    }
}

/// Serde helper for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
