//! Logging and tracing setup

use crate::states::Data;
use tracing_subscriber::{
	fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Filter used when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "warn,society_bot=info";

/// Setup the logging layers, JSON in production, pretty and `tokio-console` otherwise
pub(crate) fn setup_logging(data: &Data) -> anyhow::Result<()> {
	let filter =
		|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

	if data.config.production {
		Registry::default()
			.with(fmt::layer().json().with_filter(filter()))
			.try_init()?;
	} else {
		Registry::default()
			.with(console_subscriber::spawn())
			.with(fmt::layer().pretty().with_filter(filter()))
			.try_init()?;
	}

	tracing::debug!(production = data.config.production, "logging initialized");

	Ok(())
}
