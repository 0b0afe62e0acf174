//! Configuration module for the tiffin fulfillment service.
//!
//! Configuration is read from TOML files. Values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, and a file may pull in other
//! files with `include = ["persistence.toml"]` as long as every top-level
//! section is defined exactly once.

mod loader;

#[cfg(any(test, feature = "testing"))]
pub mod builders {
	pub mod config;
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the fulfillment service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// In-progress order session store.
	pub session: SessionConfig,
	/// Gateway to the relational order store.
	pub persistence: PersistenceConfig,
	/// HTTP server settings.
	#[serde(default)]
	pub api: ApiConfig,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Configuration for the session store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of session store implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds between sweeps that drop abandoned sessions.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval_seconds() -> u64 {
	60
}

/// Configuration for the persistence gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of persistence implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Upper bound in milliseconds for a single gateway call.
	#[serde(default = "default_persistence_timeout_ms")]
	pub timeout_ms: u64,
}

fn default_persistence_timeout_ms() -> u64 {
	5000
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Directory holding `index.html` and the `/static` assets.
	#[serde(default)]
	pub static_dir: Option<PathBuf>,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: default_api_port(),
			static_dir: None,
			max_request_size: default_max_request_size(),
		}
	}
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8000
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable and
/// supports defaults with `${VAR_NAME:-default_value}`.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.session.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one session implementation must be configured".into(),
			));
		}
		if !self
			.session
			.implementations
			.contains_key(&self.session.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary session store '{}' not found in implementations",
				self.session.primary
			)));
		}
		if self.session.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Session cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.session.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Session cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if self.persistence.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one persistence implementation must be configured".into(),
			));
		}
		if !self
			.persistence
			.implementations
			.contains_key(&self.persistence.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary persistence '{}' not found in implementations",
				self.persistence.primary
			)));
		}
		if self.persistence.timeout_ms == 0 || self.persistence.timeout_ms > 60_000 {
			return Err(ConfigError::Validation(
				"Persistence timeout_ms must be between 1 and 60000".into(),
			));
		}

		if self.api.max_request_size == 0 {
			return Err(ConfigError::Validation(
				"API max_request_size must be greater than 0".into(),
			));
		}

		Ok(())
	}
}

/// Parses and validates a configuration string, resolving environment
/// variables first.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
