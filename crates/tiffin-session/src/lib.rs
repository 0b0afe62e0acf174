//! Session store for in-progress orders.
//!
//! A session is one conversation with the ordering assistant. While the user
//! is still adding and removing items, their order lives here, keyed by the
//! session id the dialog engine hands us. Nothing in this crate survives a
//! restart.
//!
//! Backends implement [`SessionStoreInterface`] over raw bytes; the
//! [`SessionService`] on top provides typed access and per-session locking.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tiffin_types::{ConfigSchema, ImplementationRegistry};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during session store operations.
#[derive(Debug, Error)]
pub enum SessionError {
	/// Error that occurs when a requested session is not found.
	#[error("Session not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the session backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface for session backends.
#[async_trait]
pub trait SessionStoreInterface: Send + Sync {
	/// Retrieves raw bytes stored for a session.
	async fn get_bytes(&self, session_id: &str) -> Result<Vec<u8>, SessionError>;

	/// Stores raw bytes for a session. `ttl` overrides the backend's idle
	/// timeout for this entry.
	async fn set_bytes(
		&self,
		session_id: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), SessionError>;

	/// Deletes a session. Deleting an unknown session is not an error.
	async fn delete(&self, session_id: &str) -> Result<(), SessionError>;

	/// Checks whether a live session exists.
	async fn exists(&self, session_id: &str) -> Result<bool, SessionError>;

	/// Number of sessions currently held, expired or not.
	async fn len(&self) -> Result<usize, SessionError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired sessions and returns how many were dropped.
	async fn cleanup_expired(&self) -> Result<usize, SessionError> {
		Ok(0)
	}
}

/// Type alias for session store factory functions.
pub type SessionFactory = fn(&toml::Value) -> Result<Box<dyn SessionStoreInterface>, SessionError>;

/// Registry trait for session store implementations.
pub trait SessionRegistry: ImplementationRegistry<Factory = SessionFactory> {}

/// Returns `(name, factory)` for every available session store.
pub fn get_all_implementations() -> Vec<(&'static str, SessionFactory)> {
	use implementations::memory;

	vec![(memory::Registry::NAME, memory::Registry::factory())]
}

/// Typed session store with per-session mutual exclusion.
///
/// Handlers that read, modify and write back a session must hold the
/// [`SessionGuard`] for that id for the whole sequence. Guards for different
/// ids never contend, and waiters on the same id are served in arrival order.
pub struct SessionService {
	backend: Box<dyn SessionStoreInterface>,
	locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionService {
	pub fn new(backend: Box<dyn SessionStoreInterface>) -> Self {
		Self {
			backend,
			locks: DashMap::new(),
		}
	}

	/// Acquires the exclusive lock for a session id.
	pub async fn lock(&self, session_id: &str) -> SessionGuard<'_> {
		let lock = Arc::clone(self.locks.entry(session_id.to_string()).or_default().value());
		let guard = lock.lock_owned().await;
		SessionGuard {
			locks: &self.locks,
			session_id: session_id.to_string(),
			guard: Some(guard),
		}
	}

	/// Loads and deserializes a session, `None` when it does not exist.
	pub async fn load<T: DeserializeOwned>(&self, session_id: &str) -> Result<Option<T>, SessionError> {
		match self.backend.get_bytes(session_id).await {
			Ok(bytes) => serde_json::from_slice(&bytes)
				.map(Some)
				.map_err(|e| SessionError::Serialization(e.to_string())),
			Err(SessionError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Serializes and stores a session with the backend's default expiry.
	pub async fn save<T: Serialize>(&self, session_id: &str, data: &T) -> Result<(), SessionError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| SessionError::Serialization(e.to_string()))?;
		self.backend.set_bytes(session_id, bytes, None).await
	}

	pub async fn remove(&self, session_id: &str) -> Result<(), SessionError> {
		self.backend.delete(session_id).await
	}

	pub async fn exists(&self, session_id: &str) -> Result<bool, SessionError> {
		self.backend.exists(session_id).await
	}

	pub async fn len(&self) -> Result<usize, SessionError> {
		self.backend.len().await
	}

	/// Removes expired sessions from the backend.
	pub async fn cleanup_expired(&self) -> Result<usize, SessionError> {
		self.backend.cleanup_expired().await
	}

	/// Number of lock entries currently tracked.
	pub fn lock_count(&self) -> usize {
		self.locks.len()
	}
}

/// Exclusive access to one session id, released on drop.
pub struct SessionGuard<'a> {
	locks: &'a DashMap<String, Arc<Mutex<()>>>,
	session_id: String,
	guard: Option<OwnedMutexGuard<()>>,
}

impl SessionGuard<'_> {
	pub fn session_id(&self) -> &str {
		&self.session_id
	}
}

impl Drop for SessionGuard<'_> {
	fn drop(&mut self) {
		drop(self.guard.take());
		// Only the table still references the lock: nobody holds or awaits it.
		self.locks
			.remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
	}
}
