//! Tracing setup for pipeline runs.
//!
//! The orchestrator logs through `tracing` spans carrying run and stage
//! context; nothing in the core reaches for a global logger. This module
//! only offers the embedding binary a conventional subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initializes a global fmt subscriber for command-line use.
///
/// The filter honors `RUST_LOG` when set; otherwise `debug` selects
/// between debug- and info-level output. Returns false if a subscriber
/// was already installed.
pub fn init_tracing(debug: bool) -> bool {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_failure_without_panicking() {
        let _ = init_tracing(false);
        assert!(!init_tracing(true));
    }
}
