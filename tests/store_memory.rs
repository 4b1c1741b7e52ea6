// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use upstream_relay::{
	auth::{OwnerId, TokenRecord, TokenSecret},
	store::{MemoryStore, StoreError, TokenStore},
};

fn owner(id: &str) -> OwnerId {
	OwnerId::new(id).expect("Owner fixture should be valid for store tests.")
}

#[tokio::test]
async fn upsert_then_fetch_round_trips() {
	let store = MemoryStore::default();
	let known = owner("owner-store");
	let record = TokenRecord::new(
		known.clone(),
		"access",
		"refresh",
		OffsetDateTime::now_utc() + Duration::hours(1),
	);

	store.upsert(record.clone()).await.expect("Upsert should succeed.");

	let fetched = store
		.fetch(&known)
		.await
		.expect("Fetch should succeed.")
		.expect("Record should be present after upsert.");

	assert_eq!(fetched, record);
	assert!(
		store
			.fetch(&owner("owner-other"))
			.await
			.expect("Fetch of an unknown owner should succeed.")
			.is_none()
	);
}

#[tokio::test]
async fn upsert_overwrites_on_relogin() {
	let store = MemoryStore::default();
	let owner = owner("owner-relogin");
	let first = TokenRecord::new(
		owner.clone(),
		"first-access",
		"first-refresh",
		macros::datetime!(2025-01-01 00:00 UTC),
	);
	let second = TokenRecord::new(
		owner.clone(),
		"second-access",
		"second-refresh",
		macros::datetime!(2025-02-01 00:00 UTC),
	);

	store.upsert(first).await.expect("First upsert should succeed.");
	store.upsert(second.clone()).await.expect("Second upsert should succeed.");

	let fetched = store
		.fetch(&owner)
		.await
		.expect("Fetch should succeed.")
		.expect("Record should be present after re-login.");

	assert_eq!(fetched, second, "At most one live record exists per owner.");
}

#[tokio::test]
async fn replace_updates_all_three_fields_together() {
	let store = MemoryStore::default();
	let owner = owner("owner-replace");
	let record = TokenRecord::new(
		owner.clone(),
		"old-access",
		"old-refresh",
		macros::datetime!(2025-01-01 00:00 UTC),
	);

	store.upsert(record).await.expect("Seed upsert should succeed.");

	let new_expiry = macros::datetime!(2025-01-01 02:00 UTC);
	let replaced = store
		.replace(
			&owner,
			TokenSecret::new("new-access"),
			TokenSecret::new("new-refresh"),
			new_expiry,
		)
		.await
		.expect("Replace should succeed for an existing owner.");

	assert_eq!(replaced.access_token.expose(), "new-access");
	assert_eq!(replaced.refresh_token.expose(), "new-refresh");
	assert_eq!(replaced.expires_at, new_expiry);

	let fetched = store
		.fetch(&owner)
		.await
		.expect("Fetch should succeed.")
		.expect("Record should be present after replace.");

	assert_eq!(fetched, replaced, "Readers must never observe mixed old/new fields.");
}

#[tokio::test]
async fn replace_without_a_record_reports_the_owner() {
	let store = MemoryStore::default();
	let owner = owner("owner-missing");
	let err = store
		.replace(
			&owner,
			TokenSecret::new("access"),
			TokenSecret::new("refresh"),
			OffsetDateTime::now_utc(),
		)
		.await
		.expect_err("Replace must not create records.");

	assert!(matches!(err, StoreError::MissingRecord { owner: reported } if reported == owner));
}
