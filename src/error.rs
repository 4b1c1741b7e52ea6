//! Relay-level error types shared across the proxy, refresh, and store layers.

// self
use crate::{_prelude::*, auth::OwnerId};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream could not be reached (timeout, DNS, connection reset).
	#[error(transparent)]
	Unreachable(#[from] TransportError),

	/// The token endpoint rejected a grant (bad refresh token, auth outage).
	///
	/// Never retried by the relay; the stored record is left untouched so the
	/// caller can prompt the user to re-authenticate.
	#[error("Token endpoint rejected the {grant} grant: {reason}.")]
	GrantRejected {
		/// Grant label (`refresh_token` or `client_credentials`).
		grant: &'static str,
		/// Endpoint- or relay-supplied reason string.
		reason: String,
		/// HTTP status code returned by the token endpoint, when available.
		status: Option<u16>,
	},
	/// No token record exists for the requesting owner.
	#[error("No stored token for owner `{owner}`.")]
	NoToken {
		/// Owner the proxy request was issued for.
		owner: OwnerId,
	},
	/// The upstream resource API answered with a non-2xx status.
	///
	/// Status and body are carried verbatim so the boundary can forward the
	/// real upstream reason instead of a generic message.
	#[error("Upstream returned status {status}.")]
	UpstreamStatus {
		/// Original upstream status code.
		status: u16,
		/// Original upstream body, JSON or text.
		body: String,
	},
	/// The upstream answered 2xx with a body that is not valid JSON.
	#[error("Upstream returned a 2xx response that could not be decoded as JSON.")]
	UpstreamDecode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// Status of the response whose body failed to decode.
		status: u16,
	},
}
impl Error {
	/// Translates the error into the protocol-level status a routing boundary
	/// should answer with.
	///
	/// Upstream statuses pass through verbatim, authorization failures map to
	/// 401, unreachable/undecodable upstreams map to 502, local failures to 500.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::UpstreamStatus { status, .. } => *status,
			Self::GrantRejected { .. } | Self::NoToken { .. } => 401,
			Self::Unreachable(_) | Self::UpstreamDecode { .. } => 502,
			Self::Storage(_) | Self::Config(_) => 500,
		}
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// The configured token endpoint is not a valid URL.
	#[error("Token endpoint is not a valid URL.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// The upstream base URL cannot host relative API paths.
	#[error("Base URL `{base}` cannot be joined with API paths.")]
	InvalidBaseUrl {
		/// The offending base URL.
		base: Url,
	},
	/// A proxy path joined to the base URL failed to parse.
	#[error("Proxy path `{path}` does not form a valid upstream URL.")]
	InvalidProxyPath {
		/// The offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The proxy was handed an empty upstream path.
	#[error("Proxy path must not be empty.")]
	EmptyProxyPath,

	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,

	/// A required environment variable is absent.
	#[error("Environment variable `{name}` is required but unset.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{name}` holds an invalid value: `{value}`.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// The rejected value.
		value: String,
	},
	/// The rate-limit quota must allow at least one call per window.
	#[error("Rate limit quota must be at least one call per window.")]
	ZeroRateLimit,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO); the "upstream unreachable" family.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call exceeded its configured deadline.
	#[error("Upstream call timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			return Self::Timeout;
		}

		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn boundary_statuses_preserve_upstream_reasons() {
		let err = Error::UpstreamStatus { status: 404, body: "{\"error\":\"not found\"}".into() };

		assert_eq!(err.http_status(), 404);

		let err = Error::GrantRejected {
			grant: "refresh_token",
			reason: "invalid_grant".into(),
			status: Some(400),
		};

		assert_eq!(err.http_status(), 401);
		assert_eq!(Error::from(TransportError::Timeout).http_status(), 502);
		assert_eq!(
			Error::from(StoreError::Backend { message: "down".into() }).http_status(),
			500
		);
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let relay_error: Error = store_error.clone().into();

		assert!(matches!(relay_error, Error::Storage(_)));
		assert!(relay_error.to_string().contains("database unreachable"));

		let source = StdError::source(&relay_error)
			.expect("Relay error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
