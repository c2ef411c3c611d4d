// Public API - data types, probe engine and output
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod lookup;
pub mod probe;
pub mod state;
pub mod trace;

pub use error::{TraceError, TraceResult};
