//! Builder pattern for constructing fulfillment engines.
//!
//! Backends are selected by name from the factory maps handed in by the
//! binary, so the core crate never hard-codes which session store or order
//! store is in use.

use crate::engine::FulfillmentEngine;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tiffin_config::Config;
use tiffin_persistence::{PersistenceError, PersistenceInterface, PersistenceService};
use tiffin_session::{SessionError, SessionService, SessionStoreInterface};

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by
/// implementation name.
pub struct EngineFactories<SF, PF> {
	pub session_factories: HashMap<String, SF>,
	pub persistence_factories: HashMap<String, PF>,
}

/// Builder for constructing a FulfillmentEngine with pluggable implementations.
pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine from the primary implementation of each component.
	pub fn build<SF, PF>(self, factories: EngineFactories<SF, PF>) -> Result<FulfillmentEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn SessionStoreInterface>, SessionError>,
		PF: Fn(&toml::Value) -> Result<Box<dyn PersistenceInterface>, PersistenceError>,
	{
		let session_backend = build_primary(
			"session",
			&self.config.session.primary,
			&self.config.session.implementations,
			&factories.session_factories,
		)?;
		let persistence_backend = build_primary(
			"persistence",
			&self.config.persistence.primary,
			&self.config.persistence.implementations,
			&factories.persistence_factories,
		)?;

		let sessions = Arc::new(SessionService::new(session_backend));
		let persistence = Arc::new(PersistenceService::new(
			persistence_backend,
			Duration::from_millis(self.config.persistence.timeout_ms),
		));

		Ok(FulfillmentEngine::new(self.config, sessions, persistence))
	}
}

fn build_primary<T: ?Sized, E, F>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	E: std::fmt::Display,
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	for name in implementations.keys().filter(|name| name.as_str() != primary) {
		tracing::debug!(component, implementation = %name, "Configured but not primary, skipping");
	}

	let config = implementations.get(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} implementation '{}' has no configuration",
			component, primary
		))
	})?;
	let factory = factories.get(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!("{} implementation '{}'", component, primary))
	})?;

	match factory(config) {
		Ok(implementation) => {
			tracing::info!(component, implementation = %primary, "Loaded");
			Ok(implementation)
		},
		Err(e) => {
			tracing::error!(
				component,
				implementation = %primary,
				error = %e,
				"Failed to create implementation"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, primary, e
			)))
		},
	}
}
