//! Commits the session's order to the persistence gateway.

use crate::dispatch::DispatchError;
use crate::handlers::replies;
use crate::order::OrderAggregate;
use std::sync::Arc;
use tiffin_persistence::PersistenceService;
use tiffin_session::SessionService;
use tiffin_types::FulfillmentResponse;
use tracing::instrument;

/// Handler for `order.complete`.
pub struct CompleteHandler {
	sessions: Arc<SessionService>,
	persistence: Arc<PersistenceService>,
}

impl CompleteHandler {
	pub fn new(sessions: Arc<SessionService>, persistence: Arc<PersistenceService>) -> Self {
		Self {
			sessions,
			persistence,
		}
	}

	/// Commits the order and forgets the session, whether or not the commit
	/// went through.
	#[instrument(skip_all)]
	pub async fn handle(&self, session_id: &str) -> Result<FulfillmentResponse, DispatchError> {
		let _guard = self.sessions.lock(session_id).await;
		let Some(order) = self.sessions.load::<OrderAggregate>(session_id).await? else {
			return Ok(FulfillmentResponse::new(replies::ORDER_NOT_FOUND));
		};

		let reply = if order.is_empty() {
			tracing::info!("Nothing to commit, order is empty");
			replies::ORDER_NOT_FOUND.to_string()
		} else {
			match self.persistence.commit_order(order.lines()).await {
				Ok(receipt) => replies::order_placed(receipt.order_id, receipt.total),
				Err(e) => {
					tracing::error!(error = %e, lines = order.len(), "Failed to commit order");
					replies::COMMIT_FAILED.to_string()
				},
			}
		};

		if let Err(e) = self.sessions.remove(session_id).await {
			tracing::error!(error = %e, "Failed to drop completed session");
		}
		Ok(FulfillmentResponse::new(reply))
	}
}
