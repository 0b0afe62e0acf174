//! Factory registry for pluggable backends.
//!
//! Every backend crate lists its implementations through
//! `get_all_implementations()`. The registry collects them once and hands
//! the builder only the ones named in the configuration.

use std::collections::HashMap;
use std::sync::OnceLock;
use tiffin_config::Config;
use tiffin_core::{EngineBuilder, EngineFactories, FulfillmentEngine};
use tiffin_persistence::PersistenceFactory;
use tiffin_session::SessionFactory;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub session: HashMap<String, SessionFactory>,
	pub persistence: HashMap<String, PersistenceFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			session: HashMap::new(),
			persistence: HashMap::new(),
		}
	}

	pub fn register_session(&mut self, name: impl Into<String>, factory: SessionFactory) {
		self.session.insert(name.into(), factory);
	}

	pub fn register_persistence(&mut self, name: impl Into<String>, factory: PersistenceFactory) {
		self.persistence.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in tiffin_session::get_all_implementations() {
			tracing::debug!("Registering session implementation: {}", name);
			registry.register_session(name, factory);
		}

		for (name, factory) in tiffin_persistence::get_all_implementations() {
			tracing::debug!("Registering persistence implementation: {}", name);
			registry.register_persistence(name, factory);
		}

		registry
	})
}

/// Picks the factories for the implementations named in the config,
/// failing on names nobody registered.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the engine using the registry and config.
pub fn build_engine_from_config(
	config: Config,
) -> Result<FulfillmentEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let session_factories =
		build_factories!(registry, config.session.implementations, session, "session");
	let persistence_factories = build_factories!(
		registry,
		config.persistence.implementations,
		persistence,
		"persistence"
	);

	let engine = EngineBuilder::new(config).build(EngineFactories {
		session_factories,
		persistence_factories,
	})?;
	Ok(engine)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tiffin_config::builders::config::ConfigBuilder;

	#[test]
	fn test_registry_has_all_backends() {
		let registry = get_registry();
		assert!(registry.session.contains_key("memory"));
		assert!(registry.persistence.contains_key("memory"));
		assert!(registry.persistence.contains_key("http"));
	}

	#[tokio::test]
	async fn test_build_engine_from_config() {
		let engine = build_engine_from_config(ConfigBuilder::new().build()).unwrap();
		assert_eq!(engine.config().service.id, "test-tiffin");
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let config = ConfigBuilder::new()
			.persistence("mysql", toml::Value::Table(toml::map::Map::new()))
			.build();
		let err = build_engine_from_config(config).err().unwrap();
		assert_eq!(
			err.to_string(),
			"Unknown persistence implementation 'mysql'. Available: [http, memory]"
		);
	}
}
