//! In-memory order store.
//!
//! Mirrors the relational schema of the production database closely enough
//! for development and tests: a menu of priced food items, line items priced
//! at insert time, and one tracking row per order. Item names match the menu
//! case-insensitively, like the default collation of the SQL store.

use crate::{PersistenceError, PersistenceFactory, PersistenceInterface, PersistenceRegistry};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tiffin_types::{
	CommittedOrder, ConfigSchema, Field, FieldType, ImplementationRegistry, MenuItem, OrderId,
	OrderLine, Schema, ValidationError,
};
use tokio::sync::RwLock;

/// Menu used when the configuration does not provide one.
const DEFAULT_MENU: &[(&str, i64)] = &[
	("pav bhaji", 600),
	("chole bhature", 700),
	("pizza", 800),
	("mango lassi", 500),
	("masala dosa", 600),
	("vegetable biryani", 900),
	("vada pav", 400),
	("rava dosa", 700),
	("samosa", 500),
];

#[derive(Debug, Clone)]
struct LineRow {
	line: OrderLine,
	total_price: Decimal,
}

#[derive(Debug, Default)]
struct Tables {
	next_order_id: OrderId,
	lines: HashMap<OrderId, Vec<LineRow>>,
	tracking: HashMap<OrderId, String>,
}

/// In-memory order store.
pub struct MemoryPersistence {
	menu: HashMap<String, Decimal>,
	tables: RwLock<Tables>,
}

impl MemoryPersistence {
	pub fn new(menu: Vec<MenuItem>, first_order_id: OrderId) -> Self {
		Self {
			menu: menu
				.into_iter()
				.map(|item| (item.name.to_lowercase(), item.price))
				.collect(),
			tables: RwLock::new(Tables {
				next_order_id: first_order_id,
				..Tables::default()
			}),
		}
	}

	pub fn with_default_menu(first_order_id: OrderId) -> Self {
		Self::new(default_menu(), first_order_id)
	}

	/// Changes the tracking status of an existing order.
	pub async fn set_order_status(
		&self,
		order_id: OrderId,
		status: impl Into<String>,
	) -> Result<(), PersistenceError> {
		let mut tables = self.tables.write().await;
		match tables.tracking.get_mut(&order_id) {
			Some(current) => {
				*current = status.into();
				Ok(())
			},
			None => Err(PersistenceError::Rejected(format!(
				"no tracking record for order {}",
				order_id
			))),
		}
	}

	/// Returns a committed order with its lines, if it has a tracking record.
	pub async fn committed_order(&self, order_id: OrderId) -> Option<CommittedOrder> {
		let tables = self.tables.read().await;
		let status = tables.tracking.get(&order_id)?.clone();
		let lines = tables
			.lines
			.get(&order_id)
			.map(|rows| rows.iter().map(|row| row.line.clone()).collect())
			.unwrap_or_default();
		Some(CommittedOrder {
			id: order_id,
			status,
			lines,
		})
	}
}

fn default_menu() -> Vec<MenuItem> {
	DEFAULT_MENU
		.iter()
		.map(|(name, cents)| MenuItem {
			name: (*name).to_string(),
			price: Decimal::new(*cents, 2),
		})
		.collect()
}

#[async_trait]
impl PersistenceInterface for MemoryPersistence {
	async fn next_order_id(&self) -> Result<OrderId, PersistenceError> {
		let mut tables = self.tables.write().await;
		let order_id = tables.next_order_id;
		tables.next_order_id += 1;
		Ok(order_id)
	}

	async fn insert_line_item(
		&self,
		item: &str,
		quantity: u32,
		order_id: OrderId,
	) -> Result<(), PersistenceError> {
		if quantity == 0 {
			return Err(PersistenceError::Rejected(format!(
				"quantity for '{}' must be at least 1",
				item
			)));
		}
		let price = self
			.menu
			.get(&item.to_lowercase())
			.ok_or_else(|| PersistenceError::Rejected(format!("unknown food item '{}'", item)))?;

		let mut tables = self.tables.write().await;
		tables.lines.entry(order_id).or_default().push(LineRow {
			line: OrderLine::new(item, quantity),
			total_price: *price * Decimal::from(quantity),
		});
		Ok(())
	}

	async fn insert_tracking_record(
		&self,
		order_id: OrderId,
		status: &str,
	) -> Result<(), PersistenceError> {
		let mut tables = self.tables.write().await;
		if tables.tracking.contains_key(&order_id) {
			return Err(PersistenceError::Rejected(format!(
				"tracking record for order {} already exists",
				order_id
			)));
		}
		tables.tracking.insert(order_id, status.to_string());
		Ok(())
	}

	async fn total_price(&self, order_id: OrderId) -> Result<Decimal, PersistenceError> {
		let tables = self.tables.read().await;
		Ok(tables
			.lines
			.get(&order_id)
			.map(|rows| rows.iter().map(|row| row.total_price).sum())
			.unwrap_or(Decimal::ZERO))
	}

	async fn order_status(&self, order_id: OrderId) -> Result<Option<String>, PersistenceError> {
		Ok(self.tables.read().await.tracking.get(&order_id).cloned())
	}

	async fn rollback_order(&self, order_id: OrderId) -> Result<(), PersistenceError> {
		let mut tables = self.tables.write().await;
		tables.lines.remove(&order_id);
		tables.tracking.remove(&order_id);
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryPersistenceSchema)
	}
}

/// Configuration schema for MemoryPersistence.
pub struct MemoryPersistenceSchema;

impl ConfigSchema for MemoryPersistenceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let menu_item = Schema::new(
			vec![
				Field::new("name", FieldType::String),
				Field::new("price", FieldType::Decimal),
			],
			vec![],
		);
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"first_order_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new("menu", FieldType::Array(Box::new(FieldType::Table(menu_item)))),
			],
		);
		schema.validate(config)
	}
}

#[derive(Debug, Deserialize)]
struct MemoryPersistenceConfig {
	#[serde(default = "default_first_order_id")]
	first_order_id: OrderId,
	#[serde(default)]
	menu: Option<Vec<MenuItem>>,
}

fn default_first_order_id() -> OrderId {
	1
}

/// Factory function to create the in-memory store from configuration.
///
/// Configuration parameters:
/// - `first_order_id` (optional, default 1)
/// - `menu` (optional array of `{ name, price }`, defaults to the house menu)
pub fn create_persistence(
	config: &toml::Value,
) -> Result<Box<dyn PersistenceInterface>, PersistenceError> {
	MemoryPersistenceSchema
		.validate(config)
		.map_err(|e| PersistenceError::Configuration(e.to_string()))?;

	let parsed: MemoryPersistenceConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| PersistenceError::Configuration(e.to_string()))?;
	let menu = parsed.menu.unwrap_or_else(default_menu);

	Ok(Box::new(MemoryPersistence::new(menu, parsed.first_order_id)))
}

/// Registry for the in-memory persistence implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = PersistenceFactory;

	fn factory() -> Self::Factory {
		create_persistence
	}
}

impl PersistenceRegistry for Registry {}
