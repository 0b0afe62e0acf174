//! Webhook response types for the fulfillment endpoint.
//!
//! The upstream dialog engine only reads `fulfillmentText`, so both successful
//! and failed requests are answered with the same envelope. The HTTP status is
//! the only thing that distinguishes a rejected request.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response envelope returned to the dialog engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentResponse {
	/// Natural-language reply spoken back to the user.
	#[serde(rename = "fulfillmentText")]
	pub fulfillment_text: String,
}

impl FulfillmentResponse {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			fulfillment_text: text.into(),
		}
	}
}

impl IntoResponse for FulfillmentResponse {
	fn into_response(self) -> Response {
		(StatusCode::OK, Json(self)).into_response()
	}
}

/// Structured webhook error with HTTP status mapping.
///
/// Every variant still renders a `fulfillmentText` so the dialog engine has
/// something to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
	/// Malformed envelope, invalid parameters or unknown intent (400).
	BadRequest { message: String },
	/// Request is well-formed but its content was rejected (400 with a
	/// ready-made conversational reply).
	Rejected { fulfillment_text: String },
}

impl WebhookError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		WebhookError::BadRequest {
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> StatusCode {
		match self {
			WebhookError::BadRequest { .. } | WebhookError::Rejected { .. } => {
				StatusCode::BAD_REQUEST
			},
		}
	}

	/// Converts to the response envelope.
	pub fn to_fulfillment(&self) -> FulfillmentResponse {
		match self {
			WebhookError::BadRequest { message } => {
				FulfillmentResponse::new(format!("Error: {}", message))
			},
			WebhookError::Rejected { fulfillment_text } => {
				FulfillmentResponse::new(fulfillment_text.clone())
			},
		}
	}
}

impl fmt::Display for WebhookError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WebhookError::BadRequest { message } => write!(f, "Bad Request: {}", message),
			WebhookError::Rejected { fulfillment_text } => {
				write!(f, "Rejected: {}", fulfillment_text)
			},
		}
	}
}

impl std::error::Error for WebhookError {}

impl IntoResponse for WebhookError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		(status, Json(self.to_fulfillment())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_fulfillment_serializes_camel_case() {
		let json = serde_json::to_value(FulfillmentResponse::new("hi")).unwrap();
		assert_eq!(json, serde_json::json!({"fulfillmentText": "hi"}));
	}

	#[test]
	fn test_bad_request_prefixes_error() {
		let err = WebhookError::bad_request("No output contexts provided");
		assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(
			err.to_fulfillment().fulfillment_text,
			"Error: No output contexts provided"
		);
	}

	#[test]
	fn test_rejected_keeps_text_verbatim() {
		let err = WebhookError::Rejected {
			fulfillment_text: "No order found with order id: abc".into(),
		};
		assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(
			err.to_fulfillment().fulfillment_text,
			"No order found with order id: abc"
		);
	}
}
