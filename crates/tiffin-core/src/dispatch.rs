//! Routing of classified intents to their handlers.

use crate::handlers::{replies, AddHandler, CompleteHandler, RemoveHandler, TrackHandler};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tiffin_persistence::PersistenceService;
use tiffin_session::{SessionError, SessionService};
use tiffin_types::{FulfillmentResponse, WebhookError};
use tracing::instrument;

/// Errors that end a dispatch without a conversational reply.
///
/// Business outcomes such as a quantity mismatch or a failed commit are
/// replies, not errors, and never show up here.
#[derive(Debug, Error)]
pub enum DispatchError {
	#[error("Unknown intent {0}")]
	UnknownIntent(String),
	#[error("Invalid parameter '{name}': {reason}")]
	InvalidParameter { name: String, reason: String },
	#[error("Invalid order id: {0}")]
	InvalidOrderId(String),
	#[error(transparent)]
	Session(#[from] SessionError),
}

impl DispatchError {
	pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
		DispatchError::InvalidParameter {
			name: name.into(),
			reason: reason.into(),
		}
	}
}

impl From<DispatchError> for WebhookError {
	fn from(err: DispatchError) -> Self {
		match err {
			DispatchError::InvalidOrderId(raw) => WebhookError::Rejected {
				fulfillment_text: replies::invalid_order_id(&raw),
			},
			other => WebhookError::bad_request(other.to_string()),
		}
	}
}

/// Intents the fulfillment service answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
	AddToOrder,
	RemoveFromOrder,
	CompleteOrder,
	TrackOrder,
}

impl Intent {
	pub const ALL: [Intent; 4] = [
		Intent::AddToOrder,
		Intent::RemoveFromOrder,
		Intent::CompleteOrder,
		Intent::TrackOrder,
	];

	/// Display name the dialog engine uses for this intent.
	pub fn as_str(&self) -> &'static str {
		match self {
			Intent::AddToOrder => "order.add - context: ongoing-order",
			Intent::RemoveFromOrder => "order.remove - context: ongoing-order",
			Intent::CompleteOrder => "order.complete - context: ongoing-order",
			Intent::TrackOrder => "track.order - context: ongoing-tracking",
		}
	}
}

impl fmt::Display for Intent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Intent {
	type Err = DispatchError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Intent::ALL
			.into_iter()
			.find(|intent| intent.as_str() == s)
			.ok_or_else(|| DispatchError::UnknownIntent(s.to_string()))
	}
}

/// Routes each intent to exactly one handler.
pub struct IntentDispatcher {
	add: AddHandler,
	remove: RemoveHandler,
	complete: CompleteHandler,
	track: TrackHandler,
}

impl IntentDispatcher {
	pub fn new(sessions: Arc<SessionService>, persistence: Arc<PersistenceService>) -> Self {
		Self {
			add: AddHandler::new(Arc::clone(&sessions)),
			remove: RemoveHandler::new(Arc::clone(&sessions)),
			complete: CompleteHandler::new(sessions, Arc::clone(&persistence)),
			track: TrackHandler::new(persistence),
		}
	}

	#[instrument(skip_all, fields(session_id = %session_id, intent = %intent_name))]
	pub async fn dispatch(
		&self,
		intent_name: &str,
		parameters: &Map<String, Value>,
		session_id: &str,
	) -> Result<FulfillmentResponse, DispatchError> {
		let intent = intent_name.parse::<Intent>().inspect_err(|_| {
			tracing::warn!("Unknown intent");
		})?;
		tracing::debug!(%intent, "Dispatching");

		match intent {
			Intent::AddToOrder => self.add.handle(parameters, session_id).await,
			Intent::RemoveFromOrder => self.remove.handle(parameters, session_id).await,
			Intent::CompleteOrder => self.complete.handle(session_id).await,
			Intent::TrackOrder => self.track.handle(parameters).await,
		}
	}
}
