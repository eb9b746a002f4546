//! Common utilities shared across broker calls
//!
//! - Pacer enforcing a fixed minimum spacing between outbound requests

pub mod pacer;

pub use pacer::{Pacer, PacerConfig};
