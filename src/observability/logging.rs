//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the output format from the environment
//!
//! # Design Decisions
//! - JSON for `live`, human-readable output otherwise
//! - `RUST_LOG` wins over `observability.log_level`

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Environment, ObservabilityConfig};

/// Install the global subscriber.
///
/// A second call is ignored, so tests may call it freely.
pub fn init_logging(config: &ObservabilityConfig, environment: Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "app_skeleton={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let json = environment == Environment::Live;

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_ignored() {
        let config = ObservabilityConfig::default();
        init_logging(&config, Environment::Test);
        init_logging(&config, Environment::Live);
        tracing::info!("still logging");
    }
}
