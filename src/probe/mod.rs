pub mod checksum;
pub mod icmp;
pub mod parse;
pub mod socket;

pub use checksum::*;
pub use icmp::*;
pub use parse::*;
pub use socket::*;
