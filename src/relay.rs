//! The relay orchestrator: composes the token store, refresher, rate limiter,
//! and service-identity cache behind per-request entry points.

pub mod proxy;
pub mod refresh;
pub mod service;

pub use refresh::RefreshMetrics;
pub use service::ServiceTokenCache;

// self
use crate::{
	_prelude::*,
	auth::{OwnerId, TokenRecord},
	config::RelayConfig,
	error::ConfigError,
	http::ReqwestHttpClient,
	limit::RateLimiter,
	oauth::TokenEndpoint,
	store::TokenStore,
};

/// Coordinates authorized, rate-limited calls against the configured upstream.
///
/// The relay owns the HTTP client, the shared rate limiter, the service-token
/// cache, and per-owner refresh guards so the proxy, refresh, and service
/// operations can focus on their contracts. Token records are borrowed from
/// the [`TokenStore`] for the duration of one request and never cached here.
#[derive(Clone)]
pub struct Relay {
	pub(crate) http_client: ReqwestHttpClient,
	pub(crate) store: Arc<dyn TokenStore>,
	pub(crate) config: RelayConfig,
	pub(crate) token_endpoint: Arc<TokenEndpoint>,
	pub(crate) limiter: Arc<RateLimiter>,
	pub(crate) service_cache: Arc<ServiceTokenCache>,
	pub(crate) refresh_metrics: Arc<RefreshMetrics>,
	refresh_guards: Arc<Mutex<HashMap<OwnerId, Arc<AsyncMutex<()>>>>>,
}
impl Relay {
	/// Creates a relay that provisions its own reqwest transport.
	///
	/// The client carries the configured user-call deadline and never follows
	/// redirects, so token exchanges and proxied calls alike return results
	/// directly.
	pub fn new(store: Arc<dyn TokenStore>, config: RelayConfig) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(config.request_timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Self::with_http_client(store, config, ReqwestHttpClient::with_client(client))
	}

	/// Creates a relay that reuses a caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		config: RelayConfig,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		if config.max_calls == 0 {
			return Err(ConfigError::ZeroRateLimit.into());
		}

		let token_endpoint = Arc::new(TokenEndpoint::from_config(&config, http_client.clone())?);
		let limiter = Arc::new(RateLimiter::new(config.max_calls, config.limit_period));

		Ok(Self {
			http_client,
			store,
			config,
			token_endpoint,
			limiter,
			service_cache: Arc::new(ServiceTokenCache::default()),
			refresh_metrics: Default::default(),
			refresh_guards: Default::default(),
		})
	}

	/// Shared counters for refresh exchanges.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	/// Persists the token pair minted by the surrounding login flow, replacing
	/// any previous record for the owner.
	///
	/// `expires_in` is the relative lifetime returned by the authorization
	/// exchange; the stored expiry is computed against the current UTC clock.
	pub async fn install_token(
		&self,
		owner: OwnerId,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		expires_in: Duration,
	) -> Result<TokenRecord> {
		let record = TokenRecord::new(
			owner,
			access_token,
			refresh_token,
			OffsetDateTime::now_utc() + expires_in,
		);

		self.store.upsert(record.clone()).await?;

		Ok(record)
	}

	/// Returns (and creates on demand) the singleflight guard for an owner.
	pub(crate) fn refresh_guard(&self, owner: &OwnerId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.refresh_guards.lock();

		guards.entry(owner.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for Relay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay").field("config", &self.config).finish()
	}
}
