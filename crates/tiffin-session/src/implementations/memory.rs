//! In-memory session backend.
//!
//! Sessions are kept in a `HashMap` for the lifetime of the process. Two
//! limits stop abandoned conversations from piling up:
//!
//! - `max_sessions`: when a new session would exceed the bound, the least
//!   recently used session is dropped first.
//! - `idle_ttl_seconds`: a session untouched for this long is treated as
//!   gone and is removed by the next cleanup sweep. `0` disables expiry.

use crate::{SessionError, SessionFactory, SessionRegistry, SessionStoreInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tiffin_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use tokio::sync::RwLock;
use tokio::time::Instant;

const DEFAULT_MAX_SESSIONS: usize = 10_000;
const DEFAULT_IDLE_TTL_SECONDS: u64 = 3600;

#[derive(Debug)]
struct Entry {
	value: Vec<u8>,
	last_access: Instant,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| now >= at)
	}
}

/// In-memory session store with LRU bound and idle expiry.
pub struct MemorySessionStore {
	store: RwLock<HashMap<String, Entry>>,
	max_sessions: usize,
	idle_ttl: Option<Duration>,
}

impl MemorySessionStore {
	/// Creates a store with the default limits.
	pub fn new() -> Self {
		Self::with_limits(
			DEFAULT_MAX_SESSIONS,
			Some(Duration::from_secs(DEFAULT_IDLE_TTL_SECONDS)),
		)
	}

	pub fn with_limits(max_sessions: usize, idle_ttl: Option<Duration>) -> Self {
		Self {
			store: RwLock::new(HashMap::new()),
			max_sessions: max_sessions.max(1),
			idle_ttl,
		}
	}

	/// Makes room for one new session. Below capacity nothing is touched;
	/// expired entries are left to `cleanup_expired`.
	fn evict_for_insert(&self, store: &mut HashMap<String, Entry>, now: Instant) {
		if store.len() < self.max_sessions {
			return;
		}
		store.retain(|_, entry| !entry.is_expired(now));
		while store.len() >= self.max_sessions {
			let oldest = store
				.iter()
				.min_by_key(|(_, entry)| entry.last_access)
				.map(|(key, _)| key.clone());
			match oldest {
				Some(key) => {
					tracing::debug!(session_id = %key, "Evicting least recently used session");
					store.remove(&key);
				},
				None => break,
			}
		}
	}
}

impl Default for MemorySessionStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl SessionStoreInterface for MemorySessionStore {
	async fn get_bytes(&self, session_id: &str) -> Result<Vec<u8>, SessionError> {
		let now = Instant::now();
		let mut store = self.store.write().await;
		match store.get_mut(session_id) {
			Some(entry) if !entry.is_expired(now) => {
				entry.last_access = now;
				Ok(entry.value.clone())
			},
			Some(_) => {
				store.remove(session_id);
				Err(SessionError::NotFound)
			},
			None => Err(SessionError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		session_id: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), SessionError> {
		let now = Instant::now();
		let expires_at = ttl.or(self.idle_ttl).map(|ttl| now + ttl);
		let mut store = self.store.write().await;

		if !store.contains_key(session_id) {
			self.evict_for_insert(&mut store, now);
		}
		store.insert(
			session_id.to_string(),
			Entry {
				value,
				last_access: now,
				expires_at,
			},
		);
		Ok(())
	}

	async fn delete(&self, session_id: &str) -> Result<(), SessionError> {
		let mut store = self.store.write().await;
		store.remove(session_id);
		Ok(())
	}

	async fn exists(&self, session_id: &str) -> Result<bool, SessionError> {
		let store = self.store.read().await;
		Ok(store
			.get(session_id)
			.is_some_and(|entry| !entry.is_expired(Instant::now())))
	}

	async fn len(&self) -> Result<usize, SessionError> {
		Ok(self.store.read().await.len())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemorySessionStoreSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, SessionError> {
		let now = Instant::now();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| !entry.is_expired(now));
		Ok(before - store.len())
	}
}

/// Configuration schema for MemorySessionStore.
pub struct MemorySessionStoreSchema;

impl ConfigSchema for MemorySessionStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"max_sessions",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new(
					"idle_ttl_seconds",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a memory session store from configuration.
///
/// Configuration parameters:
/// - `max_sessions` (optional, default 10000)
/// - `idle_ttl_seconds` (optional, default 3600, `0` disables expiry)
pub fn create_session_store(
	config: &toml::Value,
) -> Result<Box<dyn SessionStoreInterface>, SessionError> {
	MemorySessionStoreSchema
		.validate(config)
		.map_err(|e| SessionError::Configuration(e.to_string()))?;

	let max_sessions = config
		.get("max_sessions")
		.and_then(|v| v.as_integer())
		.map(|v| v as usize)
		.unwrap_or(DEFAULT_MAX_SESSIONS);
	let idle_ttl = match config
		.get("idle_ttl_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_IDLE_TTL_SECONDS)
	{
		0 => None,
		secs => Some(Duration::from_secs(secs)),
	};

	Ok(Box::new(MemorySessionStore::with_limits(max_sessions, idle_ttl)))
}

/// Registry for the memory session store implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = SessionFactory;

	fn factory() -> Self::Factory {
		create_session_store
	}
}

impl SessionRegistry for Registry {}
