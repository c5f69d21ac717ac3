//! Tracing subscriber setup.

use charsheet_core::config::GeneralConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber from `[general]` settings.
///
/// `RUST_LOG` overrides `log_level`. Calling this twice is harmless; the
/// second call leaves the first subscriber in place.
pub fn init_tracing(config: &GeneralConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
