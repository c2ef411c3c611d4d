pub mod hop;

pub use hop::*;
