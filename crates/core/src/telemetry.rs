use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;

/// Install the process-wide JSON subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice returns an
/// error instead of panicking.
pub fn init_tracing(config: &ServiceConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!(default_locale = %config.default_locale, "Document service tracing initialised");
    Ok(())
}
