//! Token refresh orchestration with per-owner singleflight guards.
//!
//! [`Relay::ensure_fresh`] guarantees the access token handed to an outbound
//! call remains valid for at least the configured safety margin. Stale records
//! go through a `grant_type=refresh_token` exchange and an atomic three-field
//! replace; a failed exchange leaves the stored record untouched so the caller
//! can surface the authorization failure.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{OwnerId, TokenSecret, TokenState},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	relay::Relay,
};

impl Relay {
	/// Returns an access token for `owner` valid for at least the refresh
	/// margin, refreshing and persisting a replacement pair when needed.
	///
	/// Concurrent calls for the same owner serialize on a singleflight guard,
	/// so a stale record is exchanged once rather than per caller. Failures
	/// propagate without retries; retry policy belongs to the caller.
	pub async fn ensure_fresh(&self, owner: &OwnerId) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "ensure_fresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let guard = self.refresh_guard(owner);
				let _singleflight = guard.lock().await;
				let now = OffsetDateTime::now_utc();
				let current = self
					.store
					.fetch(owner)
					.await?
					.ok_or_else(|| Error::NoToken { owner: owner.clone() })?;

				match current.state_at(now, self.config.refresh_margin) {
					TokenState::Valid => return Ok(current.access_token),
					TokenState::NearExpiry | TokenState::Expired => {},
				}

				self.refresh_metrics.record_attempt();

				let grant = self
					.token_endpoint
					.refresh(current.refresh_token.expose())
					.await
					.inspect_err(|_| self.refresh_metrics.record_failure())?;
				let expires_at = grant.expires_at();
				// An exchange that omits rotation keeps the previous refresh secret.
				let refresh_secret = match grant.refresh_token {
					Some(secret) => TokenSecret::new(secret),
					None => current.refresh_token,
				};
				let updated = self
					.store
					.replace(owner, TokenSecret::new(grant.access_token), refresh_secret, expires_at)
					.await
					.inspect_err(|_| self.refresh_metrics.record_failure())?;

				self.refresh_metrics.record_success();

				Ok(updated.access_token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
