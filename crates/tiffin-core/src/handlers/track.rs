//! Looks up the tracking status of a committed order.

use crate::dispatch::DispatchError;
use crate::handlers::{params, replies};
use serde_json::{Map, Value};
use std::sync::Arc;
use tiffin_persistence::PersistenceService;
use tiffin_types::FulfillmentResponse;
use tracing::instrument;

/// Handler for `track.order`. Does not read or write sessions.
pub struct TrackHandler {
	persistence: Arc<PersistenceService>,
}

impl TrackHandler {
	pub fn new(persistence: Arc<PersistenceService>) -> Self {
		Self { persistence }
	}

	#[instrument(skip_all)]
	pub async fn handle(
		&self,
		parameters: &Map<String, Value>,
	) -> Result<FulfillmentResponse, DispatchError> {
		let order_id = params::order_id(parameters)?;

		let text = match self.persistence.order_status(order_id).await {
			Ok(Some(status)) => replies::order_status(order_id, &status),
			Ok(None) => replies::no_such_order(order_id),
			Err(e) => {
				tracing::error!(order_id, error = %e, "Failed to look up order status");
				replies::LOOKUP_FAILED.to_string()
			},
		};
		Ok(FulfillmentResponse::new(text))
	}
}
