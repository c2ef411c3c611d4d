//! Error taxonomy for a traceroute run.
//!
//! Every variant here aborts the run. Probe timeouts and unusable replies are
//! not errors: they surface as absent round-trip times in the hop results.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("unknown host {host}")]
    NameResolution {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "permission denied opening raw ICMP socket: {0}\n\n\
         Fix options:\n\
         \u{2022} Run with sudo: sudo icmptrace <host>\n\
         \u{2022} Add capability: sudo setcap cap_net_raw+ep <path-to-icmptrace>"
    )]
    Privilege(#[source] io::Error),

    #[error("{op} failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl TraceError {
    /// Wrap a socket failure, promoting permission errors to [`TraceError::Privilege`].
    pub fn from_socket(op: &'static str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => TraceError::Privilege(err),
            _ => TraceError::Transport { op, source: err },
        }
    }
}

pub type TraceResult<T> = Result<T, TraceError>;
