//! Service-identity token cache and lookups made on behalf of nobody.
//!
//! Reference-data lookups (e.g. bulk checksum resolution) authenticate as the
//! server itself via the client-credentials grant. The resulting token is
//! cached process-wide until its expiry and shared by all concurrent callers;
//! it is owned by the relay, not a module-level global, so its lifecycle ends
//! with the relay's.

// crates.io
use reqwest::{Method, header};
// self
use crate::{
	_prelude::*,
	auth::{ServiceToken, TokenSecret},
	error::TransportError,
	oauth::TokenEndpoint,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	relay::{Relay, proxy},
};

/// Cache slot for the process-wide client-credentials token.
///
/// The slot lock is held across a miss's exchange, so concurrent cold callers
/// collapse into a single outbound grant instead of stampeding the endpoint.
#[derive(Debug, Default)]
pub struct ServiceTokenCache {
	slot: AsyncMutex<Option<ServiceToken>>,
}
impl ServiceTokenCache {
	pub(crate) async fn get_or_mint(&self, endpoint: &TokenEndpoint) -> Result<ServiceToken> {
		let mut slot = self.slot.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(token) = slot.as_ref().filter(|token| token.is_fresh_at(now)) {
			return Ok(token.clone());
		}

		let grant = endpoint.client_credentials().await?;
		let expires_at = grant.expires_at();
		let token = ServiceToken::new(grant.access_token, expires_at);

		*slot = Some(token.clone());

		Ok(token)
	}
}

impl Relay {
	/// Returns the shared service-identity access token, exchanging client
	/// credentials on a cache miss.
	pub async fn service_token(&self) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let span = FlowSpan::new(KIND, "service_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token = self.service_cache.get_or_mint(&self.token_endpoint).await?;

				Ok(token.access_token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Performs a reference-data lookup with the service identity.
	///
	/// Shares the outbound quota with user-token traffic and carries the
	/// shorter lookup deadline.
	pub async fn service_request(
		&self,
		method: Method,
		path: &str,
		query: &[(String, String)],
	) -> Result<serde_json::Value> {
		const KIND: FlowKind = FlowKind::Proxy;

		let span = FlowSpan::new(KIND, "service_request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let url = self.config.api_url(path)?;
				let access_token = self.service_token().await?;

				self.limiter.acquire().await;

				let response = self
					.http_client
					.request(method, url)
					.bearer_auth(access_token.expose())
					.header(header::ACCEPT, "application/json")
					.query(query)
					.timeout(self.config.lookup_timeout)
					.send()
					.await
					.map_err(TransportError::from)?;

				proxy::decode_json_response(response).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
