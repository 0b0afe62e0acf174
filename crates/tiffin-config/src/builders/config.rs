//! Configuration builder for tests and local development.

use crate::{ApiConfig, Config, PersistenceConfig, ServiceConfig, SessionConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to the in-memory session store and the in-memory persistence
/// gateway, both with empty implementation tables.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	session_primary: String,
	session_config: toml::Value,
	cleanup_interval_seconds: u64,
	persistence_primary: String,
	persistence_config: toml::Value,
	persistence_timeout_ms: u64,
	api: ApiConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "test-tiffin".to_string(),
			session_primary: "memory".to_string(),
			session_config: toml::Value::Table(toml::map::Map::new()),
			cleanup_interval_seconds: 60,
			persistence_primary: "memory".to_string(),
			persistence_config: toml::Value::Table(toml::map::Map::new()),
			persistence_timeout_ms: 1000,
			api: ApiConfig::default(),
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Sets the primary session store and its implementation table.
	pub fn session(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.session_primary = primary.into();
		self.session_config = config;
		self
	}

	pub fn cleanup_interval_seconds(mut self, interval: u64) -> Self {
		self.cleanup_interval_seconds = interval;
		self
	}

	/// Sets the primary persistence gateway and its implementation table.
	pub fn persistence(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.persistence_primary = primary.into();
		self.persistence_config = config;
		self
	}

	pub fn persistence_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.persistence_timeout_ms = timeout_ms;
		self
	}

	pub fn api(mut self, api: ApiConfig) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			session: SessionConfig {
				implementations: HashMap::from([(
					self.session_primary.clone(),
					self.session_config,
				)]),
				primary: self.session_primary,
				cleanup_interval_seconds: self.cleanup_interval_seconds,
			},
			persistence: PersistenceConfig {
				implementations: HashMap::from([(
					self.persistence_primary.clone(),
					self.persistence_config,
				)]),
				primary: self.persistence_primary,
				timeout_ms: self.persistence_timeout_ms,
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_defaults_are_valid() {
		let config = ConfigBuilder::new().build();
		assert!(config.validate().is_ok());
		assert_eq!(config.session.primary, "memory");
		assert!(config.persistence.implementations.contains_key("memory"));
	}

	#[test]
	fn test_builder_overrides() {
		let config = ConfigBuilder::new()
			.service_id("kitchen")
			.persistence_timeout_ms(250)
			.build();
		assert_eq!(config.service.id, "kitchen");
		assert_eq!(config.persistence.timeout_ms, 250);
	}
}
