pub mod json;
pub mod report;
pub mod stream;

pub use json::*;
pub use report::*;
pub use stream::*;
