//! Pure domain logic for the labeling-job chain.
//!
//! Nothing in this crate performs I/O. The cloud adapters live in
//! `labelchain-cloud` and the orchestration steps in `labelchain-pipeline`.

pub mod chain;
pub mod crop;
pub mod error;
pub mod idempotency;
pub mod job;
pub mod labeling_request;
pub mod manifest;
pub mod naming;
pub mod trigger;
pub mod types;
