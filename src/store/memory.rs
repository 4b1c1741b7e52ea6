//! Thread-safe in-memory [`TokenStore`] implementation for local development
//! and tests.

// self
use crate::{
	_prelude::*,
	auth::{OwnerId, TokenRecord, TokenSecret},
	store::{StoreError, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<OwnerId, TokenRecord>>>;

/// Thread-safe storage backend that keeps records in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn fetch_now(map: StoreMap, owner: OwnerId) -> Option<TokenRecord> {
		map.read().get(&owner).cloned()
	}

	fn upsert_now(map: StoreMap, record: TokenRecord) {
		map.write().insert(record.owner.clone(), record);
	}

	fn replace_now(
		map: StoreMap,
		owner: OwnerId,
		access_token: TokenSecret,
		refresh_token: TokenSecret,
		expires_at: OffsetDateTime,
	) -> Result<TokenRecord, StoreError> {
		let mut guard = map.write();

		match guard.get_mut(&owner) {
			Some(record) => {
				record.access_token = access_token;
				record.refresh_token = refresh_token;
				record.expires_at = expires_at;

				Ok(record.clone())
			},
			None => Err(StoreError::MissingRecord { owner }),
		}
	}
}
impl TokenStore for MemoryStore {
	fn fetch<'a>(&'a self, owner: &'a OwnerId) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();
		let owner = owner.to_owned();

		Box::pin(async move { Ok(Self::fetch_now(map, owner)) })
	}

	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::upsert_now(map, record);

			Ok(())
		})
	}

	fn replace<'a>(
		&'a self,
		owner: &'a OwnerId,
		access_token: TokenSecret,
		refresh_token: TokenSecret,
		expires_at: OffsetDateTime,
	) -> StoreFuture<'a, TokenRecord> {
		let map = self.0.clone();
		let owner = owner.to_owned();

		Box::pin(async move {
			Self::replace_now(map, owner, access_token, refresh_token, expires_at)
		})
	}
}
