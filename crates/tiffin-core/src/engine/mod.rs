//! Fulfillment engine that answers webhook events.
//!
//! The engine owns the session store and the persistence gateway, turns a raw
//! event into a dispatch call and keeps the session store trimmed while the
//! service runs.

use crate::dispatch::{DispatchError, IntentDispatcher};
use crate::parser::{parse_event, ParseError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tiffin_config::Config;
use tiffin_persistence::PersistenceService;
use tiffin_session::SessionService;
use tiffin_types::{FulfillmentResponse, WebhookError};

/// Errors that can occur while handling one webhook event.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error(transparent)]
	Parse(#[from] ParseError),
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
}

impl From<EngineError> for WebhookError {
	fn from(err: EngineError) -> Self {
		match err {
			EngineError::Parse(e) => WebhookError::bad_request(e.to_string()),
			EngineError::Dispatch(e) => e.into(),
		}
	}
}

/// Main fulfillment engine.
#[derive(Clone)]
pub struct FulfillmentEngine {
	/// Service configuration.
	config: Config,
	/// In-progress orders keyed by session id.
	sessions: Arc<SessionService>,
	/// Gateway to the order store.
	persistence: Arc<PersistenceService>,
	dispatcher: Arc<IntentDispatcher>,
}

impl FulfillmentEngine {
	pub fn new(
		config: Config,
		sessions: Arc<SessionService>,
		persistence: Arc<PersistenceService>,
	) -> Self {
		let dispatcher = Arc::new(IntentDispatcher::new(
			Arc::clone(&sessions),
			Arc::clone(&persistence),
		));
		Self {
			config,
			sessions,
			persistence,
			dispatcher,
		}
	}

	/// Parses a raw webhook event and dispatches it.
	pub async fn handle_event(&self, payload: &Value) -> Result<FulfillmentResponse, EngineError> {
		tracing::debug!(%payload, "Received webhook event");

		let event = parse_event(payload).inspect_err(|e| {
			tracing::warn!(error = %e, "Rejected malformed event");
		})?;
		tracing::info!(
			session_id = %event.session_id,
			intent = %event.intent_name,
			"Handling intent"
		);

		Ok(self
			.dispatcher
			.dispatch(&event.intent_name, &event.parameters, &event.session_id)
			.await?)
	}

	/// Runs the session cleanup loop until ctrl-c.
	pub async fn run(&self) -> Result<(), EngineError> {
		let cleanup_handle = self.spawn_session_cleanup();

		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::warn!(error = %e, "Failed to listen for shutdown signal");
		}

		cleanup_handle.abort();
		Ok(())
	}

	/// Spawns the periodic sweep that drops expired sessions.
	pub fn spawn_session_cleanup(&self) -> tokio::task::JoinHandle<()> {
		let sessions = Arc::clone(&self.sessions);
		let period = Duration::from_secs(self.config.session.cleanup_interval_seconds);
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				interval.tick().await;
				match sessions.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Session cleanup: removed {} expired sessions", count);
					},
					Err(e) => {
						tracing::warn!("Session cleanup failed: {}", e);
					},
					_ => {},
				}
			}
		})
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn sessions(&self) -> &Arc<SessionService> {
		&self.sessions
	}

	pub fn persistence(&self) -> &Arc<PersistenceService> {
		&self.persistence
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use tiffin_config::builders::config::ConfigBuilder;
	use tiffin_persistence::implementations::memory::MemoryPersistence;
	use tiffin_session::implementations::memory::MemorySessionStore;
	use tiffin_session::SessionStoreInterface;

	fn engine_with(sessions: Box<dyn SessionStoreInterface>, cleanup_secs: u64) -> FulfillmentEngine {
		FulfillmentEngine::new(
			ConfigBuilder::new()
				.cleanup_interval_seconds(cleanup_secs)
				.build(),
			Arc::new(SessionService::new(sessions)),
			Arc::new(PersistenceService::new(
				Box::new(MemoryPersistence::with_default_menu(1)),
				Duration::from_secs(1),
			)),
		)
	}

	fn event(intent: &str, parameters: Value) -> Value {
		json!({
			"queryResult": {
				"intent": { "displayName": intent },
				"parameters": parameters,
				"outputContexts": [
					{ "name": "projects/food-bot/agent/sessions/abc123/contexts/ongoing-order" }
				]
			}
		})
	}

	#[tokio::test]
	async fn test_handle_event_routes_to_session() {
		let engine = engine_with(Box::new(MemorySessionStore::new()), 60);
		let response = engine
			.handle_event(&event(
				"order.add - context: ongoing-order",
				json!({ "food-item": ["samosa"], "number": [2] }),
			))
			.await
			.unwrap();
		assert_eq!(
			response.fulfillment_text,
			"So far you have: 2 samosa. Do you need anything else?"
		);
		assert!(engine.sessions().exists("abc123").await.unwrap());
	}

	#[tokio::test]
	async fn test_errors_map_to_webhook_errors() {
		let engine = engine_with(Box::new(MemorySessionStore::new()), 60);

		let err: WebhookError = engine
			.handle_event(&json!({ "queryResult": { "intent": { "displayName": "x" }, "parameters": {}, "outputContexts": [] } }))
			.await
			.unwrap_err()
			.into();
		assert_eq!(
			err.to_fulfillment().fulfillment_text,
			"Error: No output contexts provided"
		);

		let err: WebhookError = engine
			.handle_event(&event("order.cancel", json!({})))
			.await
			.unwrap_err()
			.into();
		assert_eq!(err.status_code().as_u16(), 400);
		assert_eq!(
			err.to_fulfillment().fulfillment_text,
			"Error: Unknown intent order.cancel"
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cleanup_task_drops_expired_sessions() {
		let store = MemorySessionStore::with_limits(10, Some(Duration::from_secs(30)));
		store.set_bytes("stale", b"[]".to_vec(), None).await.unwrap();
		let engine = engine_with(Box::new(store), 10);

		let handle = engine.spawn_session_cleanup();
		tokio::time::sleep(Duration::from_secs(45)).await;

		assert_eq!(engine.sessions().len().await.unwrap(), 0);
		handle.abort();
	}
}
