//! Public surface for horizon-overlay.
//!
//! Re-exports the overlay building blocks and provides the command-line
//! entry points used by the `horizon-overlay` binary.

pub mod cli;

/// Re-export for convenience.
pub use horizon_overlay_config as config;

/// Initialize logging using env_logger.
///
/// Binaries call this early in startup; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
