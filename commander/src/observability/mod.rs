//! Log output setup.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! left to the application, which can use [`init_tracing`] for the common
//! case.

use crate::config::CommanderSettings;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `settings.log_level`. Returns false if a global subscriber was already
/// installed.
pub fn init_tracing(settings: &CommanderSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if settings.json_logs {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let settings = CommanderSettings::default().with_log_level("debug");
        init_tracing(&settings);
        assert!(!init_tracing(&settings));
    }
}
