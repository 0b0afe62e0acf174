//! Conversational replies spoken back through the dialog engine.

use crate::order::OrderAggregate;
use rust_decimal::Decimal;
use tiffin_types::OrderId;

pub const ORDER_NOT_FOUND: &str =
	"I'm having a trouble finding your order. Sorry! Can you place a new order please?";

pub const CLARIFY_ITEMS: &str =
	"Sorry I didn't understand. Can you please specify food items and quantities clearly?";

pub const COMMIT_FAILED: &str =
	"Sorry, I couldn't process your order due to a backend error. Please place a new order again";

pub const LOOKUP_FAILED: &str =
	"Sorry, I couldn't look up your order due to a backend error. Please try again later";

pub fn order_so_far(order: &OrderAggregate) -> String {
	format!("So far you have: {}. Do you need anything else?", order)
}

pub fn order_after_removal(removed: &[String], absent: &[String], order: &OrderAggregate) -> String {
	let mut text = String::new();
	if !removed.is_empty() {
		text.push_str(&format!("Removed {} from your order! ", removed.join(",")));
	}
	if !absent.is_empty() {
		text.push_str(&format!("Your current order does not have {}. ", absent.join(",")));
	}
	if order.is_empty() {
		text.push_str("Your order is empty!");
	} else {
		text.push_str(&format!("Here is what is left in your order: {}", order));
	}
	text
}

pub fn order_placed(order_id: OrderId, total: Decimal) -> String {
	format!(
		"Awesome. We have placed your order. Here is your order id # {}. Your order total is {} which you can pay at the time of delivery!",
		order_id, total
	)
}

pub fn order_status(order_id: OrderId, status: &str) -> String {
	format!("The order status for order id: {} is: {}", order_id, status)
}

pub fn no_such_order(order_id: OrderId) -> String {
	format!("No order found with order id: {}", order_id)
}

pub fn invalid_order_id(raw: &str) -> String {
	format!(
		"No order found with order id: {}. Please provide a numeric order id.",
		raw
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_removal_text_combinations() {
		let left = OrderAggregate::from_pairs([("pizza", 1)]);
		assert_eq!(
			order_after_removal(&["samosa".into(), "dosa".into()], &[], &left),
			"Removed samosa,dosa from your order! Here is what is left in your order: 1 pizza"
		);
		assert_eq!(
			order_after_removal(&[], &["sushi".into()], &OrderAggregate::new()),
			"Your current order does not have sushi. Your order is empty!"
		);
	}

	#[test]
	fn test_order_placed_text() {
		assert_eq!(
			order_placed(41, Decimal::new(1700, 2)),
			"Awesome. We have placed your order. Here is your order id # 41. Your order total is 17.00 which you can pay at the time of delivery!"
		);
	}
}
