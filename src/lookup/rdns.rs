use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use tracing::debug;

use crate::error::{TraceError, TraceResult};
use crate::lookup::sanitize_display;

/// Resolve the trace target to an IPv4 address
///
/// Accepts a dotted-decimal literal or a hostname; hostnames go through the
/// system resolver and the first IPv4 address wins.
pub fn resolve_target(host: &str) -> TraceResult<Ipv4Addr> {
    let unresolved = |source: io::Error| TraceError::NameResolution {
        host: host.to_string(),
        source,
    };

    if let Ok(ip) = host.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => Ok(v4),
            IpAddr::V6(_) => Err(unresolved(io::Error::new(
                io::ErrorKind::Unsupported,
                "IPv6 targets are not supported",
            ))),
        };
    }

    let addrs = (host, 0).to_socket_addrs().map_err(unresolved)?;
    addrs
        .filter_map(|addr| match addr.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| {
            unresolved(io::Error::new(
                io::ErrorKind::NotFound,
                "no IPv4 address for host",
            ))
        })
}

/// Reverse DNS for responding routers, cached for the run
pub struct DnsLookup {
    resolver: TokioAsyncResolver,
    cache: HashMap<Ipv4Addr, Option<String>>,
}

impl DnsLookup {
    pub fn new() -> Self {
        let resolver =
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    /// Lookup reverse DNS for an IP, using cache
    pub async fn reverse_lookup(&mut self, ip: Ipv4Addr) -> Option<String> {
        if let Some(hostname) = self.cache.get(&ip) {
            return hostname.clone();
        }

        let hostname = match self.resolver.reverse_lookup(IpAddr::V4(ip)).await {
            Ok(lookup) => lookup.iter().next().map(|name| {
                let s = name.to_string();
                // Remove trailing dot
                sanitize_display(s.trim_end_matches('.'))
            }),
            Err(e) => {
                debug!(%ip, error = %e, "reverse lookup failed");
                None
            }
        };

        self.cache.insert(ip, hostname.clone());
        hostname
    }
}

impl Default for DnsLookup {
    fn default() -> Self {
        Self::new()
    }
}
