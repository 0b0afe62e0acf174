//! Main entry point for the tiffin fulfillment service.
//!
//! Answers webhook calls from the dialog engine of the food ordering
//! assistant: it keeps each conversation's order in a session store, commits
//! finished orders to the order store and reports the status of placed
//! orders.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tiffin_config::Config;

mod factory_registry;
mod server;

/// Command-line arguments for the fulfillment service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the fulfillment service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine from the configured backends
/// 5. Serves the webhook until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started tiffin");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let api_config = config.api.clone();
	let engine = Arc::new(factory_registry::build_engine_from_config(config)?);

	let engine_task = engine.run();
	let api_task = server::start_server(api_config, Arc::clone(&engine));

	tokio::select! {
		result = engine_task => {
			tracing::info!("Engine finished");
			result?;
		}
		result = api_task => {
			tracing::info!("API server finished");
			result?;
		}
	}

	tracing::info!("Stopped tiffin");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_defaults() {
		let args = Args::try_parse_from(["tiffin"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_overrides() {
		let args =
			Args::try_parse_from(["tiffin", "--config", "/etc/tiffin.toml", "-l", "debug"]).unwrap();
		assert_eq!(args.config, PathBuf::from("/etc/tiffin.toml"));
		assert_eq!(args.log_level, "debug");
	}
}
