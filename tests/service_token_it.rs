// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
// self
use upstream_relay::{
	config::RelayConfig,
	error::Error,
	relay::Relay,
	reqwest::Method,
	store::MemoryStore,
	url::Url,
};

const CLIENT_ID: &str = "client-service";
const CLIENT_SECRET: &str = "secret-service";

fn build_relay(server: &MockServer) -> Relay {
	let base =
		Url::parse(&server.base_url()).expect("Mock server base URL should parse successfully.");

	Relay::new(Arc::new(MemoryStore::default()), RelayConfig::new(CLIENT_ID, CLIENT_SECRET, base))
		.expect("Relay should build against the mock upstream.")
}

#[tokio::test]
async fn service_token_is_cached_until_expiry() {
	let server = MockServer::start_async().await;
	let relay = build_relay(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"svc-token\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let first = relay.service_token().await.expect("Initial service token should be minted.");
	let second = relay.service_token().await.expect("Cached service token should be returned.");

	assert_eq!(first.expose(), "svc-token");
	assert_eq!(second.expose(), "svc-token");

	token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_cold_callers_collapse_into_one_exchange() {
	let server = MockServer::start_async().await;
	let relay = build_relay(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"svc-guard\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let (first, second) = tokio::join!(relay.service_token(), relay.service_token());
	let first = first.expect("First concurrent service token call should succeed.");
	let second = second.expect("Second concurrent service token call should succeed.");

	assert_eq!(first.expose(), "svc-guard");
	assert_eq!(second.expose(), "svc-guard");

	token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn expired_service_token_is_reacquired() {
	let server = MockServer::start_async().await;
	let relay = build_relay(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"svc-short\",\"token_type\":\"bearer\",\"expires_in\":1}",
			);
		})
		.await;

	relay.service_token().await.expect("Initial short-lived token should be minted.");

	// Let the one-second lifetime lapse; the cache check is strict.
	tokio::time::sleep(StdDuration::from_secs(2)).await;

	relay.service_token().await.expect("A stale cache entry should trigger a new exchange.");

	token_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn service_request_attaches_the_service_identity() {
	let server = MockServer::start_async().await;
	let relay = build_relay(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"svc-lookup\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v2/beatmaps/lookup")
				.query_param("checksum", "9e107d9d372bb6826bd81d3542a419d6")
				.header("authorization", "Bearer svc-lookup")
				.header("accept", "application/json");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":909,\"status\":\"ranked\"}");
		})
		.await;
	let body = relay
		.service_request(
			Method::GET,
			"beatmaps/lookup",
			&[("checksum".into(), "9e107d9d372bb6826bd81d3542a419d6".into())],
		)
		.await
		.expect("Service lookup should succeed.");

	assert_eq!(body, serde_json::json!({ "id": 909, "status": "ranked" }));

	token_mock.assert_calls_async(1).await;
	api_mock.assert_async().await;
}

#[tokio::test]
async fn rejected_client_credentials_surface_to_the_caller() {
	let server = MockServer::start_async().await;
	let relay = build_relay(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let err = relay
		.service_token()
		.await
		.expect_err("A rejected client-credentials exchange should surface to the caller.");

	assert!(matches!(
		err,
		Error::GrantRejected { grant: "client_credentials", status: Some(401), .. }
	));

	token_mock.assert_async().await;
}
