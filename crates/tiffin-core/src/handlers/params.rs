//! Typed access to intent parameters.
//!
//! The classifier sends list-valued slots as arrays, but a slot filled
//! with one value occasionally arrives as a bare scalar. Both shapes are
//! accepted.

use crate::dispatch::DispatchError;
use serde_json::{Map, Value};
use tiffin_types::OrderId;

pub const FOOD_ITEM: &str = "food-item";
pub const NUMBER: &str = "number";

fn list<'a>(parameters: &'a Map<String, Value>, name: &str) -> Result<Vec<&'a Value>, DispatchError> {
	match parameters.get(name) {
		Some(Value::Array(values)) => Ok(values.iter().collect()),
		Some(Value::Null) | None => Err(DispatchError::invalid_parameter(name, "missing")),
		Some(value) => Ok(vec![value]),
	}
}

/// The `food-item` slot as a list of item names.
pub fn food_items(parameters: &Map<String, Value>) -> Result<Vec<String>, DispatchError> {
	list(parameters, FOOD_ITEM)?
		.into_iter()
		.map(|value| {
			value
				.as_str()
				.map(str::to_string)
				.ok_or_else(|| DispatchError::invalid_parameter(FOOD_ITEM, "expected a list of strings"))
		})
		.collect()
}

/// The `number` slot as raw numbers, in the order given.
pub fn quantities(parameters: &Map<String, Value>) -> Result<Vec<f64>, DispatchError> {
	list(parameters, NUMBER)?
		.into_iter()
		.map(|value| {
			value
				.as_f64()
				.ok_or_else(|| DispatchError::invalid_parameter(NUMBER, "expected a list of numbers"))
		})
		.collect()
}

/// Converts a classifier number to an order quantity. Only whole numbers
/// of at least one are quantities.
pub fn to_quantity(raw: f64) -> Option<u32> {
	if raw.fract() == 0.0 && (1.0..=f64::from(u32::MAX)).contains(&raw) {
		Some(raw as u32)
	} else {
		None
	}
}

/// The `number` slot as an order id.
///
/// Accepts an integer, a whole float, a numeric string, or a one-element
/// array holding one of those.
pub fn order_id(parameters: &Map<String, Value>) -> Result<OrderId, DispatchError> {
	let value = match parameters.get(NUMBER) {
		Some(Value::Array(values)) if values.len() == 1 => &values[0],
		Some(value) => value,
		None => &Value::Null,
	};
	parse_order_id(value).ok_or_else(|| DispatchError::InvalidOrderId(raw_text(value)))
}

fn parse_order_id(value: &Value) -> Option<OrderId> {
	match value {
		Value::Number(n) => n.as_i64().or_else(|| {
			n.as_f64()
				.filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
				.map(|f| f as OrderId)
		}),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

fn raw_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn params(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => unreachable!(),
		}
	}

	#[test]
	fn test_food_items_accepts_scalar_and_list() {
		assert_eq!(
			food_items(&params(json!({ "food-item": ["pizza", "samosa"] }))).unwrap(),
			vec!["pizza", "samosa"]
		);
		assert_eq!(
			food_items(&params(json!({ "food-item": "pizza" }))).unwrap(),
			vec!["pizza"]
		);
		assert!(food_items(&params(json!({ "food-item": [1] }))).is_err());
		assert!(food_items(&params(json!({}))).is_err());
	}

	#[test]
	fn test_to_quantity() {
		assert_eq!(to_quantity(2.0), Some(2));
		assert_eq!(to_quantity(0.0), None);
		assert_eq!(to_quantity(-1.0), None);
		assert_eq!(to_quantity(1.5), None);
	}

	#[test]
	fn test_order_id_shapes() {
		assert_eq!(order_id(&params(json!({ "number": 41 }))).unwrap(), 41);
		assert_eq!(order_id(&params(json!({ "number": 41.0 }))).unwrap(), 41);
		assert_eq!(order_id(&params(json!({ "number": [41] }))).unwrap(), 41);
		assert_eq!(order_id(&params(json!({ "number": " 41 " }))).unwrap(), 41);

		match order_id(&params(json!({ "number": "forty" }))) {
			Err(DispatchError::InvalidOrderId(raw)) => assert_eq!(raw, "forty"),
			other => panic!("unexpected {:?}", other),
		}
		assert!(order_id(&params(json!({ "number": 4.5 }))).is_err());
		assert!(order_id(&params(json!({ "number": [1, 2] }))).is_err());
		assert!(order_id(&params(json!({}))).is_err());
	}
}
