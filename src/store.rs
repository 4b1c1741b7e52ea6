//! Storage contract for per-owner token records, plus the built-in in-memory
//! backend.
//!
//! Production deployments own the relational storage; the relay only calls
//! through [`TokenStore`] and never caches a record across requests.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{OwnerId, TokenRecord, TokenSecret},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented over the surrounding backend's
/// persistence layer.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the record associated with the owner, if present.
	fn fetch<'a>(&'a self, owner: &'a OwnerId) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Persists or replaces the record for its owner (first login or re-login).
	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Replaces all three credential fields of an existing record atomically.
	///
	/// Callers rely on readers never observing a mixture of old and new
	/// fields; a failed replace must leave the stored record untouched.
	fn replace<'a>(
		&'a self,
		owner: &'a OwnerId,
		access_token: TokenSecret,
		refresh_token: TokenSecret,
		expires_at: OffsetDateTime,
	) -> StoreFuture<'a, TokenRecord>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A replace targeted an owner with no stored record.
	#[error("No record exists for owner `{owner}`.")]
	MissingRecord {
		/// Owner the replace was issued for.
		owner: OwnerId,
	},
}
