//! Common types module for the tiffin fulfillment service.
//!
//! This module defines the data types shared by the session store, the
//! persistence gateway, the dispatcher and the HTTP layer so that every
//! crate agrees on the wire shapes and error mapping.

/// Order line and menu types shared between the dispatcher and persistence.
pub mod order;
/// Self-registration trait for pluggable backends.
pub mod registry;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;
/// Webhook response envelope and HTTP error mapping.
pub mod webhook;

pub use order::*;
pub use registry::ImplementationRegistry;
pub use validation::*;
pub use webhook::*;
