//! Tracing/logging setup shared by binaries and tests.

/// Initialize process-wide tracing/logging.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    tracing_setup::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing_setup;
