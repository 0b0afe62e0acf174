//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each backend module (session store, persistence gateway) exposes a
/// `Registry` struct implementing this trait so the service can wire every
/// available backend by its configuration name.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. `"memory"` for `session.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
