//! Extraction of the fields the dispatcher needs from a webhook event.
//!
//! The dialog engine posts a JSON envelope of the form
//!
//! ```json
//! {
//!   "queryResult": {
//!     "intent": { "displayName": "order.add - context: ongoing-order" },
//!     "parameters": { "food-item": ["samosa"], "number": [2] },
//!     "outputContexts": [
//!       { "name": "projects/p/agent/sessions/abc123/contexts/ongoing-order" }
//!     ]
//!   }
//! }
//! ```
//!
//! Only the first output context is consulted for the session id.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

static SESSION_PATTERN: Lazy<Result<Regex, regex::Error>> =
	Lazy::new(|| Regex::new(r"/sessions/([^/]+)/contexts/"));

/// Errors that can occur while reading a webhook event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
	/// A required field is missing or has the wrong JSON type.
	#[error("{0}")]
	MalformedEvent(String),
	/// The context name does not carry a session id.
	#[error("Malformed session context: {0}")]
	MalformedSessionContext(String),
}

/// Fields of a webhook event used for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
	pub intent_name: String,
	pub parameters: Map<String, Value>,
	pub session_id: String,
}

/// Reads intent name, parameters and session id from a raw event.
pub fn parse_event(payload: &Value) -> Result<ParsedEvent, ParseError> {
	let query_result = payload
		.get("queryResult")
		.and_then(Value::as_object)
		.ok_or_else(|| malformed("Missing queryResult"))?;

	let intent_name = query_result
		.get("intent")
		.and_then(|intent| intent.get("displayName"))
		.and_then(Value::as_str)
		.ok_or_else(|| malformed("Missing intent displayName"))?;

	let parameters = query_result
		.get("parameters")
		.and_then(Value::as_object)
		.ok_or_else(|| malformed("Missing parameters"))?;

	let contexts = query_result
		.get("outputContexts")
		.and_then(Value::as_array)
		.ok_or_else(|| malformed("No output contexts provided"))?;
	let context_name = contexts
		.first()
		.ok_or_else(|| malformed("No output contexts provided"))?
		.get("name")
		.and_then(Value::as_str)
		.ok_or_else(|| malformed("Output context has no name"))?;

	Ok(ParsedEvent {
		intent_name: intent_name.to_string(),
		parameters: parameters.clone(),
		session_id: extract_session_id(context_name)?,
	})
}

/// Returns the `<sessionId>` segment of
/// `projects/<p>/agent/sessions/<sessionId>/contexts/<ctx>`.
pub fn extract_session_id(context_name: &str) -> Result<String, ParseError> {
	let pattern = (*SESSION_PATTERN)
		.as_ref()
		.map_err(|e| ParseError::MalformedSessionContext(e.to_string()))?;
	pattern
		.captures(context_name)
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str().to_string())
		.ok_or_else(|| ParseError::MalformedSessionContext(context_name.to_string()))
}

fn malformed(message: &str) -> ParseError {
	ParseError::MalformedEvent(message.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn event(contexts: Value) -> Value {
		json!({
			"queryResult": {
				"intent": { "displayName": "order.add - context: ongoing-order" },
				"parameters": { "food-item": ["samosa"], "number": [2] },
				"outputContexts": contexts
			}
		})
	}

	#[test]
	fn test_parses_well_formed_event() {
		let parsed = parse_event(&event(json!([
			{ "name": "projects/food-bot/agent/sessions/abc123/contexts/ongoing-order" },
			{ "name": "projects/food-bot/agent/sessions/other/contexts/__system_counters__" }
		])))
		.unwrap();

		assert_eq!(parsed.intent_name, "order.add - context: ongoing-order");
		assert_eq!(parsed.session_id, "abc123");
		assert_eq!(parsed.parameters["number"], json!([2]));
	}

	#[test]
	fn test_empty_contexts() {
		let err = parse_event(&event(json!([]))).unwrap_err();
		assert_eq!(err.to_string(), "No output contexts provided");
	}

	#[test]
	fn test_missing_fields() {
		assert!(matches!(
			parse_event(&json!({})),
			Err(ParseError::MalformedEvent(_))
		));
		assert!(matches!(
			parse_event(&json!({ "queryResult": { "parameters": {}, "outputContexts": [] } })),
			Err(ParseError::MalformedEvent(_))
		));
		assert!(matches!(
			parse_event(&json!({
				"queryResult": {
					"intent": { "displayName": "x" },
					"parameters": [],
					"outputContexts": [{ "name": "a/sessions/b/contexts/c" }]
				}
			})),
			Err(ParseError::MalformedEvent(_))
		));
	}

	#[test]
	fn test_context_without_session_segment() {
		let err = parse_event(&event(json!([{ "name": "projects/food-bot/agent/ongoing-order" }])))
			.unwrap_err();
		assert!(matches!(err, ParseError::MalformedSessionContext(_)));
	}

	#[test]
	fn test_extract_session_id() {
		assert_eq!(
			extract_session_id("projects/p/agent/sessions/s-1/contexts/ongoing-tracking").unwrap(),
			"s-1"
		);
		assert!(extract_session_id("projects/p/agent/sessions//contexts/x").is_err());
	}
}
