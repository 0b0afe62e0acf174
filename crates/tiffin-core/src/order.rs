//! Working set of an order that has not been committed yet.

use serde::{Deserialize, Serialize};
use std::fmt;
use tiffin_types::OrderLine;

/// Food item → quantity map of an in-progress order.
///
/// Items keep the position and spelling of their first insertion, so the
/// rendered order reads back in the sequence the user asked for things.
/// Item names compare case-insensitively, like the menu lookup of the order
/// store. Setting an item that is already present replaces its quantity in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderAggregate {
	lines: Vec<OrderLine>,
}

impl OrderAggregate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds an aggregate from item/quantity pairs. A repeated item keeps its
	/// first position and the last quantity given for it.
	pub fn from_pairs<I, S>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (S, u32)>,
		S: Into<String>,
	{
		let mut order = Self::new();
		for (item, quantity) in pairs {
			order.set(item, quantity);
		}
		order
	}

	/// Sets the quantity of an item, overwriting any previous quantity.
	pub fn set(&mut self, item: impl Into<String>, quantity: u32) {
		let item = item.into();
		match self.lines.iter_mut().find(|line| same_item(&line.item, &item)) {
			Some(line) => line.quantity = quantity,
			None => self.lines.push(OrderLine::new(item, quantity)),
		}
	}

	/// Overlays `delta` on this aggregate: its quantities replace ours for
	/// shared items, new items are appended.
	pub fn merge(&mut self, delta: OrderAggregate) {
		for line in delta.lines {
			self.set(line.item, line.quantity);
		}
	}

	/// Removes an item, returning whether it was present.
	pub fn remove(&mut self, item: &str) -> bool {
		let before = self.lines.len();
		self.lines.retain(|line| !same_item(&line.item, item));
		self.lines.len() != before
	}

	pub fn get(&self, item: &str) -> Option<u32> {
		self.lines
			.iter()
			.find(|line| same_item(&line.item, item))
			.map(|line| line.quantity)
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &OrderLine> {
		self.lines.iter()
	}

	pub fn lines(&self) -> &[OrderLine] {
		&self.lines
	}
}

fn same_item(a: &str, b: &str) -> bool {
	a == b || a.to_lowercase() == b.to_lowercase()
}

impl fmt::Display for OrderAggregate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, line) in self.lines.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{}", line)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_pairs_last_duplicate_wins() {
		let order = OrderAggregate::from_pairs([("rice", 2), ("dal", 1), ("rice", 5)]);
		assert_eq!(order.len(), 2);
		assert_eq!(order.get("rice"), Some(5));
		assert_eq!(order.to_string(), "5 rice, 1 dal");
	}

	#[test]
	fn test_item_names_ignore_case() {
		let mut order = OrderAggregate::from_pairs([("Pizza", 1), ("pizza", 2)]);
		assert_eq!(order.len(), 1);
		assert_eq!(order.to_string(), "2 Pizza");
		assert_eq!(order.get("PIZZA"), Some(2));

		order.merge(OrderAggregate::from_pairs([("pIzZa", 5)]));
		assert_eq!(order.to_string(), "5 Pizza");
		assert!(order.remove("pizza"));
		assert!(order.is_empty());
	}

	#[test]
	fn test_merge_overwrites_and_appends() {
		let mut order = OrderAggregate::from_pairs([("pizza", 1), ("samosa", 2)]);
		order.merge(OrderAggregate::from_pairs([("samosa", 4), ("mango lassi", 1)]));
		assert_eq!(order.to_string(), "1 pizza, 4 samosa, 1 mango lassi");
	}

	#[test]
	fn test_remove_reports_presence() {
		let mut order = OrderAggregate::from_pairs([("pizza", 1)]);
		assert!(!order.remove("samosa"));
		assert!(order.remove("pizza"));
		assert!(order.is_empty());
		assert_eq!(order.to_string(), "");
	}

	#[test]
	fn test_serializes_as_line_list() {
		let order = OrderAggregate::from_pairs([("rice", 2), ("dal", 1)]);
		let json = serde_json::to_value(&order).unwrap();
		assert_eq!(
			json,
			serde_json::json!([
				{ "item": "rice", "quantity": 2 },
				{ "item": "dal", "quantity": 1 }
			])
		);
		let back: OrderAggregate = serde_json::from_value(json).unwrap();
		assert_eq!(back, order);
	}
}
