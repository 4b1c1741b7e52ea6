//! Relay configuration: upstream credentials, endpoints, quotas, and timeouts.
//!
//! Values arrive environment-style via [`RelayConfig::from_env`] or are built
//! programmatically with the `with_*` overrides. URL assembly for the token
//! endpoint and proxied API paths lives here so the rest of the crate never
//! concatenates strings into URLs.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError};

const ENV_CLIENT_ID: &str = "UPSTREAM_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "UPSTREAM_CLIENT_SECRET";
const ENV_BASE_URL: &str = "UPSTREAM_BASE_URL";
const ENV_RATE_LIMIT_CALLS: &str = "UPSTREAM_RATE_LIMIT_CALLS";
const ENV_RATE_LIMIT_PERIOD_SECS: &str = "UPSTREAM_RATE_LIMIT_PERIOD_SECS";
const ENV_REFRESH_MARGIN_SECS: &str = "UPSTREAM_REFRESH_MARGIN_SECS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "UPSTREAM_REQUEST_TIMEOUT_SECS";
const ENV_LOOKUP_TIMEOUT_SECS: &str = "UPSTREAM_LOOKUP_TIMEOUT_SECS";

/// Immutable configuration consumed by the relay.
#[derive(Clone)]
pub struct RelayConfig {
	/// OAuth client identifier registered with the upstream.
	pub client_id: String,
	/// OAuth client secret registered with the upstream.
	pub client_secret: String,
	/// Upstream origin hosting both the token endpoint and the resource API.
	pub base_url: Url,
	/// Path prefix prepended to every proxied resource path.
	pub api_prefix: String,
	/// Maximum outbound calls per sliding window.
	pub max_calls: usize,
	/// Sliding window length for the rate limiter.
	pub limit_period: StdDuration,
	/// Safety margin before expiry at which tokens are refreshed.
	pub refresh_margin: Duration,
	/// Deadline for user-token proxy calls and token exchanges.
	pub request_timeout: StdDuration,
	/// Deadline for service-identity lookup calls.
	pub lookup_timeout: StdDuration,
}
impl RelayConfig {
	/// Path prefix used when none is overridden.
	pub const DEFAULT_API_PREFIX: &'static str = "api/v2";
	const DEFAULT_LOOKUP_TIMEOUT: StdDuration = StdDuration::from_secs(10);
	const DEFAULT_MAX_CALLS: usize = 60;
	const DEFAULT_PERIOD: StdDuration = StdDuration::from_secs(60);
	const DEFAULT_REFRESH_MARGIN: Duration = Duration::minutes(10);
	const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(60);
	const TOKEN_PATH: [&'static str; 2] = ["oauth", "token"];

	/// Creates a configuration with the default quota (60 calls / 60 s),
	/// refresh margin (10 min), and timeouts (60 s calls, 10 s lookups).
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		base_url: Url,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			base_url,
			api_prefix: Self::DEFAULT_API_PREFIX.into(),
			max_calls: Self::DEFAULT_MAX_CALLS,
			limit_period: Self::DEFAULT_PERIOD,
			refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
			lookup_timeout: Self::DEFAULT_LOOKUP_TIMEOUT,
		}
	}

	/// Reads the configuration from the process environment.
	///
	/// `UPSTREAM_CLIENT_ID`, `UPSTREAM_CLIENT_SECRET`, and `UPSTREAM_BASE_URL`
	/// are required; quota, margin, and timeout variables override the
	/// defaults when present.
	pub fn from_env() -> Result<Self, ConfigError> {
		let client_id = require_env(ENV_CLIENT_ID)?;
		let client_secret = require_env(ENV_CLIENT_SECRET)?;
		let base_url = {
			let raw = require_env(ENV_BASE_URL)?;

			Url::parse(&raw)
				.map_err(|_| ConfigError::InvalidEnv { name: ENV_BASE_URL, value: raw })?
		};
		let mut config = Self::new(client_id, client_secret, base_url);

		if let Some(calls) = parse_env::<usize>(ENV_RATE_LIMIT_CALLS)? {
			if calls == 0 {
				return Err(ConfigError::ZeroRateLimit);
			}

			config.max_calls = calls;
		}
		if let Some(secs) = parse_env::<u64>(ENV_RATE_LIMIT_PERIOD_SECS)? {
			config.limit_period = StdDuration::from_secs(secs);
		}
		if let Some(secs) = parse_env::<i64>(ENV_REFRESH_MARGIN_SECS)? {
			config.refresh_margin = Duration::seconds(secs);
		}
		if let Some(secs) = parse_env::<u64>(ENV_REQUEST_TIMEOUT_SECS)? {
			config.request_timeout = StdDuration::from_secs(secs);
		}
		if let Some(secs) = parse_env::<u64>(ENV_LOOKUP_TIMEOUT_SECS)? {
			config.lookup_timeout = StdDuration::from_secs(secs);
		}

		Ok(config)
	}

	/// Overrides the proxied API path prefix (defaults to `api/v2`).
	pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.api_prefix = prefix.into();

		self
	}

	/// Overrides the outbound quota.
	pub fn with_rate_limit(mut self, max_calls: usize, period: StdDuration) -> Self {
		self.max_calls = max_calls;
		self.limit_period = period;

		self
	}

	/// Overrides the refresh safety margin.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = margin;

		self
	}

	/// Overrides the user-token call deadline.
	pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the service-lookup call deadline.
	pub fn with_lookup_timeout(mut self, timeout: StdDuration) -> Self {
		self.lookup_timeout = timeout;

		self
	}

	/// Returns the upstream token endpoint URL.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		self.join_segments(Self::TOKEN_PATH.into_iter())
	}

	/// Joins a proxied resource path onto the base URL under the API prefix.
	///
	/// The path is validated for non-emptiness only; arbitrary upstream paths
	/// are accepted and forwarded.
	pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
		let trimmed = path.trim_start_matches('/');

		if trimmed.is_empty() {
			return Err(ConfigError::EmptyProxyPath);
		}

		self.join_segments(self.api_prefix.split('/').chain(trimmed.split('/')))
	}

	fn join_segments<'a>(
		&self,
		segments: impl Iterator<Item = &'a str>,
	) -> Result<Url, ConfigError> {
		let mut url = self.base_url.clone();

		{
			let mut parts = url
				.path_segments_mut()
				.map_err(|_| ConfigError::InvalidBaseUrl { base: self.base_url.clone() })?;

			parts.pop_if_empty();

			for segment in segments.filter(|segment| !segment.is_empty()) {
				parts.push(segment);
			}
		}

		Ok(url)
	}
}
impl Debug for RelayConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayConfig")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &!self.client_secret.is_empty())
			.field("base_url", &self.base_url.as_str())
			.field("api_prefix", &self.api_prefix)
			.field("max_calls", &self.max_calls)
			.field("limit_period", &self.limit_period)
			.field("refresh_margin", &self.refresh_margin)
			.field("request_timeout", &self.request_timeout)
			.field("lookup_timeout", &self.lookup_timeout)
			.finish()
	}
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
	std::env::var(name).map_err(|_| ConfigError::MissingEnv { name })
}

fn parse_env<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
{
	match std::env::var(name) {
		Ok(raw) => match raw.trim().parse::<T>() {
			Ok(value) => Ok(Some(value)),
			Err(_) => Err(ConfigError::InvalidEnv { name, value: raw }),
		},
		Err(_) => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> RelayConfig {
		RelayConfig::new(
			"client-id",
			"client-secret",
			Url::parse("https://stats.example.com").expect("Base URL fixture should parse."),
		)
	}

	#[test]
	fn token_endpoint_joins_onto_base() {
		let endpoint =
			config().token_endpoint().expect("Token endpoint should assemble successfully.");

		assert_eq!(endpoint.as_str(), "https://stats.example.com/oauth/token");
	}

	#[test]
	fn api_url_prefixes_and_trims_paths() {
		let config = config();
		let url = config.api_url("users/42/scores").expect("API URL should assemble.");

		assert_eq!(url.as_str(), "https://stats.example.com/api/v2/users/42/scores");

		let url = config.api_url("/beatmaps/lookup").expect("Leading slashes should be trimmed.");

		assert_eq!(url.as_str(), "https://stats.example.com/api/v2/beatmaps/lookup");
	}

	#[test]
	fn api_url_rejects_empty_paths() {
		assert!(matches!(config().api_url(""), Err(ConfigError::EmptyProxyPath)));
		assert!(matches!(config().api_url("///"), Err(ConfigError::EmptyProxyPath)));
	}

	#[test]
	fn from_env_reports_missing_variables() {
		// None of the UPSTREAM_* variables are set in the test environment.
		assert!(matches!(
			RelayConfig::from_env(),
			Err(ConfigError::MissingEnv { name: super::ENV_CLIENT_ID })
		));
	}

	#[test]
	fn debug_omits_the_client_secret() {
		let rendered = format!("{:?}", config());

		assert!(!rendered.contains("client-secret"));
		assert!(rendered.contains("client_secret_set"));
	}
}
