//! Persistence gateway for committed orders.
//!
//! The relational order store (orders, line items, tracking) sits behind the
//! [`PersistenceInterface`] trait. The fulfillment code never talks to a
//! backend directly: it goes through [`PersistenceService`], which bounds
//! every call with a timeout and owns the multi-step commit of an order.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tiffin_types::{ConfigSchema, ImplementationRegistry, OrderId, OrderLine, STATUS_IN_PROGRESS};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur while talking to the order store.
#[derive(Debug, Error)]
pub enum PersistenceError {
	/// The store could not be reached or failed internally.
	#[error("Backend error: {0}")]
	Backend(String),
	/// The store refused the operation (unknown item, duplicate record, ...).
	#[error("Rejected by store: {0}")]
	Rejected(String),
	/// The call did not finish within the configured bound.
	#[error("Persistence call timed out after {0:?}")]
	Timeout(Duration),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Row-level operations offered by an order store.
#[async_trait]
pub trait PersistenceInterface: Send + Sync {
	/// Allocates the identifier for a new order.
	async fn next_order_id(&self) -> Result<OrderId, PersistenceError>;

	/// Inserts one line item of an order.
	async fn insert_line_item(
		&self,
		item: &str,
		quantity: u32,
		order_id: OrderId,
	) -> Result<(), PersistenceError>;

	/// Inserts the tracking record of an order.
	async fn insert_tracking_record(
		&self,
		order_id: OrderId,
		status: &str,
	) -> Result<(), PersistenceError>;

	/// Total price of all line items of an order.
	async fn total_price(&self, order_id: OrderId) -> Result<Decimal, PersistenceError>;

	/// Current tracking status, `None` when the order is unknown.
	async fn order_status(&self, order_id: OrderId) -> Result<Option<String>, PersistenceError>;

	/// Discards rows written for a partially committed order.
	///
	/// Stores without a way to undo writes keep the default, which leaves any
	/// partial rows in place.
	async fn rollback_order(&self, _order_id: OrderId) -> Result<(), PersistenceError> {
		Ok(())
	}

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Lets a backend be shared with code that updates it out of band, such as
/// tracking status changes made by the kitchen.
#[async_trait]
impl<T: PersistenceInterface + ?Sized> PersistenceInterface for std::sync::Arc<T> {
	async fn next_order_id(&self) -> Result<OrderId, PersistenceError> {
		(**self).next_order_id().await
	}

	async fn insert_line_item(
		&self,
		item: &str,
		quantity: u32,
		order_id: OrderId,
	) -> Result<(), PersistenceError> {
		(**self).insert_line_item(item, quantity, order_id).await
	}

	async fn insert_tracking_record(
		&self,
		order_id: OrderId,
		status: &str,
	) -> Result<(), PersistenceError> {
		(**self).insert_tracking_record(order_id, status).await
	}

	async fn total_price(&self, order_id: OrderId) -> Result<Decimal, PersistenceError> {
		(**self).total_price(order_id).await
	}

	async fn order_status(&self, order_id: OrderId) -> Result<Option<String>, PersistenceError> {
		(**self).order_status(order_id).await
	}

	async fn rollback_order(&self, order_id: OrderId) -> Result<(), PersistenceError> {
		(**self).rollback_order(order_id).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		(**self).config_schema()
	}
}

/// Type alias for persistence factory functions.
pub type PersistenceFactory =
	fn(&toml::Value) -> Result<Box<dyn PersistenceInterface>, PersistenceError>;

/// Registry trait for persistence implementations.
pub trait PersistenceRegistry: ImplementationRegistry<Factory = PersistenceFactory> {}

/// Returns `(name, factory)` for every available persistence backend.
pub fn get_all_implementations() -> Vec<(&'static str, PersistenceFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Result of a successful order commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
	pub order_id: OrderId,
	pub total: Decimal,
}

/// Timeout-bounded facade over a persistence backend.
pub struct PersistenceService {
	backend: Box<dyn PersistenceInterface>,
	timeout: Duration,
}

impl PersistenceService {
	pub fn new(backend: Box<dyn PersistenceInterface>, timeout: Duration) -> Self {
		Self { backend, timeout }
	}

	async fn bounded<T, F>(&self, call: F) -> Result<T, PersistenceError>
	where
		F: Future<Output = Result<T, PersistenceError>>,
	{
		tokio::time::timeout(self.timeout, call)
			.await
			.map_err(|_| PersistenceError::Timeout(self.timeout))?
	}

	/// Commits an order and prices it.
	///
	/// Allocates an id, writes every line, then writes the initial
	/// `in progress` tracking record. The first failed write aborts the
	/// commit and asks the backend to roll back what was already written.
	pub async fn commit_order(&self, lines: &[OrderLine]) -> Result<CommitReceipt, PersistenceError> {
		let order_id = self.bounded(self.backend.next_order_id()).await?;

		if let Err(e) = self.write_order(order_id, lines).await {
			tracing::warn!(order_id, error = %e, "Order commit failed, rolling back");
			if let Err(rollback_err) = self.bounded(self.backend.rollback_order(order_id)).await {
				tracing::error!(order_id, error = %rollback_err, "Rollback failed, partial rows may remain");
			}
			return Err(e);
		}

		let total = self.bounded(self.backend.total_price(order_id)).await?;
		tracing::info!(order_id, lines = lines.len(), %total, "Committed order");
		Ok(CommitReceipt { order_id, total })
	}

	async fn write_order(&self, order_id: OrderId, lines: &[OrderLine]) -> Result<(), PersistenceError> {
		for line in lines {
			self.bounded(
				self.backend
					.insert_line_item(&line.item, line.quantity, order_id),
			)
			.await?;
		}
		self.bounded(
			self.backend
				.insert_tracking_record(order_id, STATUS_IN_PROGRESS),
		)
		.await
	}

	pub async fn order_status(&self, order_id: OrderId) -> Result<Option<String>, PersistenceError> {
		self.bounded(self.backend.order_status(order_id)).await
	}

	pub async fn total_price(&self, order_id: OrderId) -> Result<Decimal, PersistenceError> {
		self.bounded(self.backend.total_price(order_id)).await
	}
}
