//! Worker entry points for the labeling job chain.
//!
//! The binary in `main.rs` wires configuration and AWS clients together;
//! this library holds the parts that can be tested without them.

pub mod config;
pub mod step;
