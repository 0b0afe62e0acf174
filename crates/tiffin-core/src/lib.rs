//! Fulfillment core for the tiffin ordering assistant.
//!
//! Webhook events from the dialog engine are parsed into an intent, its
//! parameters and a session id, then routed to one of four handlers that
//! build up an order in the session store, commit it through the
//! persistence gateway, or look up the status of a committed order.

pub mod builder;
pub mod dispatch;
pub mod engine;
pub mod handlers;
pub mod order;
pub mod parser;

pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use dispatch::{DispatchError, Intent, IntentDispatcher};
pub use engine::{EngineError, FulfillmentEngine};
pub use order::OrderAggregate;
pub use parser::{parse_event, ParseError, ParsedEvent};
