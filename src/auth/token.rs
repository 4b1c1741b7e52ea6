//! Token models: redacted secrets, per-owner credentials, and the service
//! identity token.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::OwnerId};

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Freshness assessment for a stored record at a given instant.
///
/// `NearExpiry` and `Expired` both gate the refresh transition; they are kept
/// distinct so callers can log or test the margin behavior precisely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenState {
	/// The access token remains usable beyond the safety margin.
	Valid,
	/// The access token expires within the safety margin.
	NearExpiry,
	/// The access token has expired outright.
	Expired,
}

/// Per-owner upstream credential: access/refresh token pair plus expiry.
///
/// At most one live record exists per owner; stores key by [`OwnerId`]. A
/// refresh replaces the access token, refresh token, and expiry together or
/// leaves the record untouched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Owner this credential belongs to.
	pub owner: OwnerId,
	/// Bearer secret attached to proxied calls.
	pub access_token: TokenSecret,
	/// Longer-lived secret used to mint a replacement pair.
	pub refresh_token: TokenSecret,
	/// Absolute UTC expiry of the access token.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Creates a record from an offset-aware expiry instant.
	pub fn new(
		owner: OwnerId,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			owner,
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			expires_at,
		}
	}

	/// Creates a record from a naive storage timestamp, assuming UTC.
	///
	/// Storage layers that persist wall-clock datetimes without an offset hand
	/// back naive values; those are UTC by contract, never local time.
	pub fn with_naive_expiry(
		owner: OwnerId,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		expires_at: PrimitiveDateTime,
	) -> Self {
		Self::new(owner, access_token, refresh_token, expires_at.assume_utc())
	}

	/// Assesses the record's freshness at the provided instant.
	pub fn state_at(&self, instant: OffsetDateTime, margin: Duration) -> TokenState {
		if instant >= self.expires_at {
			return TokenState::Expired;
		}
		if instant >= self.expires_at - margin {
			return TokenState::NearExpiry;
		}

		TokenState::Valid
	}

	/// Returns `true` if the access token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.state_at(instant, Duration::ZERO), TokenState::Expired)
	}

	/// Returns `true` if the access token expires within `margin` of `instant`
	/// and must be refreshed before use.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		!matches!(self.state_at(instant, margin), TokenState::Valid)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("owner", &self.owner)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Process-wide service identity token minted via the client-credentials grant.
///
/// Carries no refresh token (a stale one is reacquired from scratch) and no
/// owner; it is shared by every caller that needs a lookup on behalf of nobody.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceToken {
	/// Bearer secret attached to service lookups.
	pub access_token: TokenSecret,
	/// Absolute UTC expiry of the token.
	pub expires_at: OffsetDateTime,
}
impl ServiceToken {
	/// Creates a service token expiring at the provided instant.
	pub fn new(access_token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_at }
	}

	/// Returns `true` while the token's expiry lies in the future.
	pub fn is_fresh_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}
impl Debug for ServiceToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceToken")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
