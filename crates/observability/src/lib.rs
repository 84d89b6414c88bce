//! Tracing/logging setup shared by the binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, LogOptions};

/// Initialize process-wide logging.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init(options: &LogOptions) {
    tracing::init(options);
}
