//! Order-related types shared across the fulfillment pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracking status written for every freshly committed order.
pub const STATUS_IN_PROGRESS: &str = "in progress";

/// Identifier allocated by the persistence gateway for a committed order.
pub type OrderId = i64;

/// A single `(food item, quantity)` entry of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
	pub item: String,
	pub quantity: u32,
}

impl OrderLine {
	pub fn new(item: impl Into<String>, quantity: u32) -> Self {
		Self {
			item: item.into(),
			quantity,
		}
	}
}

impl fmt::Display for OrderLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.quantity, self.item)
	}
}

/// A priced entry of the menu known to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
	/// Food item name as produced by the upstream classifier.
	pub name: String,
	/// Unit price.
	pub price: Decimal,
}

/// Committed order as seen by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedOrder {
	pub id: OrderId,
	pub status: String,
	pub lines: Vec<OrderLine>,
}
