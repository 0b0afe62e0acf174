//! HTTP RPC client for a remote order store.
//!
//! Each gateway operation is one `POST` to the configured endpoint with a
//! body of `{"method": "...", "params": {...}}`. The store answers with
//! `{"result": ...}` on success or `{"error": "..."}` when it refuses the
//! call. Transport failures and non-2xx statuses are backend errors.

use crate::{PersistenceError, PersistenceFactory, PersistenceInterface, PersistenceRegistry};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tiffin_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderId, Schema, ValidationError,
};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
	method: &'a str,
	params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Value,
	#[serde(default)]
	error: Option<String>,
}

/// Order store reached over HTTP.
pub struct HttpPersistence {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpPersistence {
	pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, PersistenceError> {
		let client = reqwest::Client::builder()
			.timeout(request_timeout)
			.pool_idle_timeout(Duration::from_secs(90))
			.build()
			.map_err(|e| PersistenceError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			endpoint: endpoint.into(),
		})
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, PersistenceError> {
		tracing::debug!(method, endpoint = %self.endpoint, "Calling order store");

		let response = self
			.client
			.post(&self.endpoint)
			.json(&RpcRequest { method, params })
			.send()
			.await
			.map_err(|e| PersistenceError::Backend(format!("{} failed: {}", method, e)))?;

		let status = response.status();
		if !status.is_success() {
			return Err(PersistenceError::Backend(format!(
				"{} returned HTTP {}",
				method, status
			)));
		}

		let body: RpcResponse = response
			.json()
			.await
			.map_err(|e| PersistenceError::Serialization(e.to_string()))?;
		if let Some(error) = body.error {
			return Err(PersistenceError::Rejected(error));
		}
		serde_json::from_value(body.result).map_err(|e| PersistenceError::Serialization(e.to_string()))
	}
}

#[async_trait]
impl PersistenceInterface for HttpPersistence {
	async fn next_order_id(&self) -> Result<OrderId, PersistenceError> {
		self.call("next_order_id", json!({})).await
	}

	async fn insert_line_item(
		&self,
		item: &str,
		quantity: u32,
		order_id: OrderId,
	) -> Result<(), PersistenceError> {
		self.call::<Value>(
			"insert_line_item",
			json!({ "item": item, "quantity": quantity, "order_id": order_id }),
		)
		.await
		.map(|_| ())
	}

	async fn insert_tracking_record(
		&self,
		order_id: OrderId,
		status: &str,
	) -> Result<(), PersistenceError> {
		self.call::<Value>(
			"insert_tracking_record",
			json!({ "order_id": order_id, "status": status }),
		)
		.await
		.map(|_| ())
	}

	async fn total_price(&self, order_id: OrderId) -> Result<Decimal, PersistenceError> {
		self.call("total_price", json!({ "order_id": order_id }))
			.await
	}

	async fn order_status(&self, order_id: OrderId) -> Result<Option<String>, PersistenceError> {
		self.call("order_status", json!({ "order_id": order_id }))
			.await
	}

	async fn rollback_order(&self, order_id: OrderId) -> Result<(), PersistenceError> {
		self.call::<Value>("rollback_order", json!({ "order_id": order_id }))
			.await
			.map(|_| ())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpPersistenceSchema)
	}
}

/// Configuration schema for HttpPersistence.
pub struct HttpPersistenceSchema;

impl ConfigSchema for HttpPersistenceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("endpoint", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("endpoint must be an http(s) URL".to_string()),
				}
			})],
			vec![Field::new(
				"request_timeout_ms",
				FieldType::Integer {
					min: Some(1),
					max: Some(60_000),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create the HTTP store client from configuration.
///
/// Configuration parameters:
/// - `endpoint`: RPC URL of the order store
/// - `request_timeout_ms` (optional, default 3000)
pub fn create_persistence(
	config: &toml::Value,
) -> Result<Box<dyn PersistenceInterface>, PersistenceError> {
	HttpPersistenceSchema
		.validate(config)
		.map_err(|e| PersistenceError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| PersistenceError::Configuration("endpoint is required".into()))?;
	let timeout_ms = config
		.get("request_timeout_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

	Ok(Box::new(HttpPersistence::new(
		endpoint,
		Duration::from_millis(timeout_ms),
	)?))
}

/// Registry for the HTTP persistence implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = PersistenceFactory;

	fn factory() -> Self::Factory {
		create_persistence
	}
}

impl PersistenceRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryPersistence;
	use axum::{extract::State, routing::post, Json, Router};
	use std::sync::Arc;

	#[derive(Deserialize)]
	struct Call {
		method: String,
		params: Value,
	}

	fn order_id(params: &Value) -> OrderId {
		params["order_id"].as_i64().unwrap_or_default()
	}

	async fn rpc(State(store): State<Arc<MemoryPersistence>>, Json(call): Json<Call>) -> Json<Value> {
		let p = &call.params;
		let outcome = match call.method.as_str() {
			"next_order_id" => store.next_order_id().await.map(|id| json!(id)),
			"insert_line_item" => store
				.insert_line_item(
					p["item"].as_str().unwrap_or_default(),
					p["quantity"].as_u64().unwrap_or_default() as u32,
					order_id(p),
				)
				.await
				.map(|_| Value::Null),
			"insert_tracking_record" => store
				.insert_tracking_record(order_id(p), p["status"].as_str().unwrap_or_default())
				.await
				.map(|_| Value::Null),
			"total_price" => store
				.total_price(order_id(p))
				.await
				.map(|total| json!(total)),
			"order_status" => store.order_status(order_id(p)).await.map(|s| json!(s)),
			"rollback_order" => store
				.rollback_order(order_id(p))
				.await
				.map(|_| Value::Null),
			other => Err(PersistenceError::Rejected(format!("unknown method {}", other))),
		};
		Json(match outcome {
			Ok(result) => json!({ "result": result }),
			Err(e) => json!({ "error": e.to_string() }),
		})
	}

	async fn spawn_store() -> (String, Arc<MemoryPersistence>) {
		let store = Arc::new(MemoryPersistence::with_default_menu(40));
		let app = Router::new()
			.route("/rpc", post(rpc))
			.with_state(Arc::clone(&store));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		(format!("http://{}/rpc", addr), store)
	}

	#[tokio::test]
	async fn test_round_trip_against_rpc_store() {
		let (endpoint, store) = spawn_store().await;
		let client = HttpPersistence::new(endpoint, Duration::from_secs(2)).unwrap();

		let id = client.next_order_id().await.unwrap();
		assert_eq!(id, 40);
		client.insert_line_item("vada pav", 3, id).await.unwrap();
		client.insert_tracking_record(id, "in progress").await.unwrap();

		assert_eq!(client.total_price(id).await.unwrap(), Decimal::new(1200, 2));
		assert_eq!(
			client.order_status(id).await.unwrap().as_deref(),
			Some("in progress")
		);
		assert_eq!(client.order_status(999).await.unwrap(), None);
		assert!(store.committed_order(id).await.is_some());
	}

	#[tokio::test]
	async fn test_store_error_is_rejected() {
		let (endpoint, _store) = spawn_store().await;
		let client = HttpPersistence::new(endpoint, Duration::from_secs(2)).unwrap();

		let result = client.insert_line_item("sushi", 1, 40).await;
		assert!(matches!(result, Err(PersistenceError::Rejected(_))));
	}

	#[tokio::test]
	async fn test_unreachable_store_is_backend_error() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let client =
			HttpPersistence::new(format!("http://{}/rpc", addr), Duration::from_millis(500)).unwrap();
		assert!(matches!(
			client.next_order_id().await,
			Err(PersistenceError::Backend(_))
		));
	}

	#[test]
	fn test_factory_requires_http_endpoint() {
		let config: toml::Value = toml::from_str(r#"endpoint = "mysql://localhost""#).unwrap();
		assert!(matches!(
			create_persistence(&config),
			Err(PersistenceError::Configuration(_))
		));

		let config: toml::Value = toml::from_str(r#"endpoint = "http://localhost:9000/rpc""#).unwrap();
		assert!(create_persistence(&config).is_ok());
	}
}
