pub mod controller;
pub mod engine;

pub use controller::*;
pub use engine::*;
