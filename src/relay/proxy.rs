//! Proxied upstream resource calls on behalf of authenticated owners.
//!
//! The proxy is intentionally open toward the upstream's own API: any
//! non-empty path under the configured prefix is forwarded verbatim, together
//! with the caller's query pairs (repeated keys allowed, order preserved).
//! Responses pass through schema-agnostically.

// crates.io
use reqwest::{Method, Response, header};
// self
use crate::{
	_prelude::*,
	auth::OwnerId,
	error::TransportError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	relay::Relay,
};

impl Relay {
	/// Performs one upstream call on behalf of `owner`, transparently
	/// authorized and rate-limited.
	///
	/// On a 2xx response the decoded JSON body is returned verbatim. A non-2xx
	/// response surfaces as [`Error::UpstreamStatus`] carrying the upstream
	/// status and body; transport failures surface as [`Error::Unreachable`].
	pub async fn proxy_request(
		&self,
		owner: &OwnerId,
		method: Method,
		path: &str,
		query: &[(String, String)],
	) -> Result<serde_json::Value> {
		const KIND: FlowKind = FlowKind::Proxy;

		let span = FlowSpan::new(KIND, "proxy_request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let url = self.config.api_url(path)?;
				// Refresh-before-call ordering is strict within one request.
				let access_token = self.ensure_fresh(owner).await?;

				self.limiter.acquire().await;

				let response = self
					.http_client
					.request(method, url)
					.bearer_auth(access_token.expose())
					.header(header::ACCEPT, "application/json")
					.query(query)
					.send()
					.await
					.map_err(TransportError::from)?;

				decode_json_response(response).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}

/// Splits a response into verbatim JSON passthrough or the relay error shape.
pub(crate) async fn decode_json_response(response: Response) -> Result<serde_json::Value> {
	let status = response.status();

	if !status.is_success() {
		let body = response.text().await.map_err(TransportError::from)?;

		return Err(Error::UpstreamStatus { status: status.as_u16(), body });
	}

	let bytes = response.bytes().await.map_err(TransportError::from)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::UpstreamDecode { source, status: status.as_u16() })
}
