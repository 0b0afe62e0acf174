//! Removes food items from the session's order.

use crate::dispatch::DispatchError;
use crate::handlers::{params, replies};
use crate::order::OrderAggregate;
use serde_json::{Map, Value};
use std::sync::Arc;
use tiffin_session::SessionService;
use tiffin_types::FulfillmentResponse;
use tracing::instrument;

/// Handler for `order.remove`.
pub struct RemoveHandler {
	sessions: Arc<SessionService>,
}

impl RemoveHandler {
	pub fn new(sessions: Arc<SessionService>) -> Self {
		Self { sessions }
	}

	/// Drops the requested items and reports what was removed, what was
	/// never there and what is left. An emptied order stays in the session.
	#[instrument(skip_all)]
	pub async fn handle(
		&self,
		parameters: &Map<String, Value>,
		session_id: &str,
	) -> Result<FulfillmentResponse, DispatchError> {
		let _guard = self.sessions.lock(session_id).await;
		let Some(mut order) = self.sessions.load::<OrderAggregate>(session_id).await? else {
			return Ok(FulfillmentResponse::new(replies::ORDER_NOT_FOUND));
		};

		let items = params::food_items(parameters)?;
		let (removed, absent): (Vec<String>, Vec<String>) =
			items.into_iter().partition(|item| order.remove(item));
		self.sessions.save(session_id, &order).await?;

		tracing::debug!(removed = removed.len(), absent = absent.len(), "Updated order");
		Ok(FulfillmentResponse::new(replies::order_after_removal(
			&removed, &absent, &order,
		)))
	}
}
