//! Process-wide tracing setup and request correlation ids.

pub mod tracing;

pub use crate::tracing::{LogFormat, TracingConfig, init_with, new_request_id};

/// Initialize tracing from the environment (`RUST_LOG`, `LOG_FORMAT`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    init_with(TracingConfig::from_env());
}
