//! HTTP server for the fulfillment webhook.
//!
//! `POST /` receives webhook events from the dialog engine. `GET /` and
//! `/static` serve the landing page from the configured static directory.

use axum::{
	extract::{rejection::JsonRejection, DefaultBodyLimit, State},
	http::StatusCode,
	response::{Html, IntoResponse, Response},
	routing::post,
	Json, Router,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tiffin_config::ApiConfig;
use tiffin_core::FulfillmentEngine;
use tiffin_types::{FulfillmentResponse, WebhookError};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

const INDEX_NOT_FOUND: &str = "<h1>Error: index.html not found</h1>";

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
	/// Engine answering webhook events.
	pub engine: Arc<FulfillmentEngine>,
	/// Directory holding `index.html` and static assets.
	pub static_dir: Option<PathBuf>,
}

/// Builds the router with all routes and middleware.
pub fn build_router(api_config: &ApiConfig, engine: Arc<FulfillmentEngine>) -> Router {
	let state = AppState {
		engine,
		static_dir: api_config.static_dir.clone(),
	};

	let mut router = Router::new().route("/", post(handle_webhook).get(handle_index));
	if let Some(dir) = &api_config.static_dir {
		router = router.nest_service("/static", ServeDir::new(dir));
	}

	router
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Starts the HTTP server and runs it until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<FulfillmentEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Fulfillment webhook listening on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST / requests.
///
/// The body is taken as a generic JSON value so that a malformed envelope is
/// answered with a `fulfillmentText` like every other failure.
async fn handle_webhook(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<FulfillmentResponse, WebhookError> {
	let Json(payload) = payload.map_err(|rejection| {
		tracing::warn!(error = %rejection.body_text(), "Rejected unreadable webhook body");
		WebhookError::bad_request(rejection.body_text())
	})?;

	match state.engine.handle_event(&payload).await {
		Ok(response) => Ok(response),
		Err(e) => {
			tracing::warn!("Webhook request failed: {}", e);
			Err(WebhookError::from(e))
		},
	}
}

/// Handles GET / requests with the landing page.
async fn handle_index(State(state): State<AppState>) -> Response {
	let Some(dir) = &state.static_dir else {
		return (StatusCode::NOT_FOUND, Html(INDEX_NOT_FOUND)).into_response();
	};
	match tokio::fs::read_to_string(dir.join("index.html")).await {
		Ok(html) => Html(html).into_response(),
		Err(e) => {
			tracing::debug!(error = %e, "Landing page unavailable");
			(StatusCode::NOT_FOUND, Html(INDEX_NOT_FOUND)).into_response()
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Request};
	use serde_json::json;
	use tempfile::TempDir;
	use tiffin_config::builders::config::ConfigBuilder;
	use tower::ServiceExt;

	fn app(static_dir: Option<PathBuf>) -> Router {
		let api = ApiConfig {
			static_dir,
			..ApiConfig::default()
		};
		let config = ConfigBuilder::new().api(api.clone()).build();
		let engine = crate::factory_registry::build_engine_from_config(config).unwrap();
		build_router(&api, Arc::new(engine))
	}

	fn webhook(body: String) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri("/")
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body))
			.unwrap()
	}

	fn event(intent: &str, parameters: Value) -> String {
		json!({
			"queryResult": {
				"intent": { "displayName": intent },
				"parameters": parameters,
				"outputContexts": [
					{ "name": "projects/food-bot/agent/sessions/web-1/contexts/ongoing-order" }
				]
			}
		})
		.to_string()
	}

	async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, String::from_utf8(body.to_vec()).unwrap())
	}

	async fn fulfillment(app: &Router, body: String) -> (StatusCode, String) {
		let (status, body) = send(app, webhook(body)).await;
		let json: Value = serde_json::from_str(&body).unwrap();
		(status, json["fulfillmentText"].as_str().unwrap().to_string())
	}

	#[tokio::test]
	async fn test_order_conversation() {
		let app = app(None);

		let (status, text) = fulfillment(
			&app,
			event(
				"order.add - context: ongoing-order",
				json!({ "food-item": ["pav bhaji", "mango lassi"], "number": [2, 1] }),
			),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(
			text,
			"So far you have: 2 pav bhaji, 1 mango lassi. Do you need anything else?"
		);

		let (status, text) = fulfillment(
			&app,
			event("order.complete - context: ongoing-order", json!({})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert!(text.contains("order id # 1."), "{}", text);
		assert!(text.contains("17.00"), "{}", text);

		let (status, text) = fulfillment(
			&app,
			event("track.order - context: ongoing-tracking", json!({ "number": 1 })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(text, "The order status for order id: 1 is: in progress");
	}

	#[tokio::test]
	async fn test_bad_requests_use_envelope() {
		let app = app(None);

		let (status, text) = fulfillment(&app, "{not json".to_string()).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(text.starts_with("Error: "), "{}", text);

		let (status, text) = fulfillment(&app, event("order.cancel", json!({}))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(text, "Error: Unknown intent order.cancel");

		let body = json!({
			"queryResult": {
				"intent": { "displayName": "order.add - context: ongoing-order" },
				"parameters": {},
				"outputContexts": []
			}
		})
		.to_string();
		let (status, text) = fulfillment(&app, body).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(text, "Error: No output contexts provided");

		let (status, text) = fulfillment(
			&app,
			event("track.order - context: ongoing-tracking", json!({ "number": "soon" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(
			text,
			"No order found with order id: soon. Please provide a numeric order id."
		);
	}

	#[tokio::test]
	async fn test_landing_page_and_static_files() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join("index.html"), "<h1>Tiffin</h1>").unwrap();
		std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
		let app = app(Some(dir.path().to_path_buf()));

		let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

		let (status, body) = send(&app, get("/")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, "<h1>Tiffin</h1>");

		let (status, body) = send(&app, get("/static/app.js")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, "console.log('hi');");
	}

	#[tokio::test]
	async fn test_missing_landing_page() {
		let dir = TempDir::new().unwrap();
		for app in [app(None), app(Some(dir.path().to_path_buf()))] {
			let request = Request::builder().uri("/").body(Body::empty()).unwrap();
			let (status, body) = send(&app, request).await;
			assert_eq!(status, StatusCode::NOT_FOUND);
			assert_eq!(body, INDEX_NOT_FOUND);
		}
	}
}
