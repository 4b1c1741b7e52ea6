//! Token-endpoint facade for the refresh and client-credentials grants.
//!
//! Client id and secret travel in the request body (`AuthType::RequestBody`),
//! matching the upstream's form-field token contract.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	config::RelayConfig,
	error::{ConfigError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredTokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Outcome of a successful token-endpoint exchange.
#[derive(Clone, Debug)]
pub(crate) struct TokenGrant {
	pub access_token: String,
	pub refresh_token: Option<String>,
	pub issued_at: OffsetDateTime,
	pub expires_in: Duration,
}
impl TokenGrant {
	/// Absolute expiry derived from the exchange instant plus the returned
	/// lifetime.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at + self.expires_in
	}
}

/// Facade over the configured upstream token endpoint.
pub(crate) struct TokenEndpoint {
	oauth_client: ConfiguredTokenClient,
	http_client: ReqwestHttpClient,
}
impl TokenEndpoint {
	pub fn from_config(config: &RelayConfig, http_client: ReqwestHttpClient) -> Result<Self> {
		let token_url = TokenUrl::new(config.token_endpoint()?.to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.clone()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client })
	}

	/// Performs a `grant_type=refresh_token` exchange.
	pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
		const GRANT: &str = "refresh_token";

		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let secret = RefreshToken::new(refresh_token.to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&secret)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(GRANT, meta.take(), err))?;

		map_token_response(response)
	}

	/// Performs a `grant_type=client_credentials` exchange.
	pub async fn client_credentials(&self) -> Result<TokenGrant> {
		const GRANT: &str = "client_credentials";

		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(GRANT, meta.take(), err))?;

		map_token_response(response)
	}
}

fn map_token_response(response: oauth2::basic::BasicTokenResponse) -> Result<TokenGrant> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(TokenGrant {
		access_token: response.access_token().secret().to_owned(),
		refresh_token: response.refresh_token().map(|token| token.secret().to_owned()),
		issued_at: OffsetDateTime::now_utc(),
		expires_in: Duration::seconds(expires_in),
	})
}

fn map_request_error(
	grant: &'static str,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) =>
			Error::GrantRejected { grant, reason: server_response_reason(&response), status },
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(source, _body) => Error::GrantRejected {
			grant,
			reason: format!("token endpoint returned malformed JSON ({source})"),
			status,
		},
		RequestTokenError::Other(message) => Error::GrantRejected { grant, reason: message, status },
	}
}

fn server_response_reason(response: &BasicErrorResponse) -> String {
	match response.error_description() {
		Some(description) => format!("{} ({description})", response.error().as_ref()),
		None => response.error().as_ref().to_string(),
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Network { source: message.into() }.into(),
		_ => TransportError::Network { source: "unclassified HTTP client error".into() }.into(),
	}
}
