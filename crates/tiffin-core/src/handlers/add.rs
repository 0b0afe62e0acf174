//! Adds food items to the session's order.

use crate::dispatch::DispatchError;
use crate::handlers::{params, replies};
use crate::order::OrderAggregate;
use serde_json::{Map, Value};
use std::sync::Arc;
use tiffin_session::SessionService;
use tiffin_types::FulfillmentResponse;
use tracing::instrument;

/// Handler for `order.add`.
pub struct AddHandler {
	sessions: Arc<SessionService>,
}

impl AddHandler {
	pub fn new(sessions: Arc<SessionService>) -> Self {
		Self { sessions }
	}

	/// Merges the requested items into the session's order, creating the
	/// order on the first add.
	#[instrument(skip_all)]
	pub async fn handle(
		&self,
		parameters: &Map<String, Value>,
		session_id: &str,
	) -> Result<FulfillmentResponse, DispatchError> {
		let items = params::food_items(parameters)?;
		let raw_quantities = params::quantities(parameters)?;

		if items.len() != raw_quantities.len() {
			tracing::info!(
				items = items.len(),
				quantities = raw_quantities.len(),
				"Item and quantity counts do not match"
			);
			return Ok(FulfillmentResponse::new(replies::CLARIFY_ITEMS));
		}
		let Some(quantities) = raw_quantities
			.iter()
			.map(|raw| params::to_quantity(*raw))
			.collect::<Option<Vec<u32>>>()
		else {
			tracing::info!(?raw_quantities, "Rejected non-positive or fractional quantity");
			return Ok(FulfillmentResponse::new(replies::CLARIFY_ITEMS));
		};
		let delta = OrderAggregate::from_pairs(items.into_iter().zip(quantities));

		let _guard = self.sessions.lock(session_id).await;
		let mut order = self
			.sessions
			.load::<OrderAggregate>(session_id)
			.await?
			.unwrap_or_default();
		order.merge(delta);
		self.sessions.save(session_id, &order).await?;

		tracing::debug!(lines = order.len(), "Updated order");
		Ok(FulfillmentResponse::new(replies::order_so_far(&order)))
	}
}
