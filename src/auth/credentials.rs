//! Access/refresh token pair persisted by the credential store.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Access/refresh token pair written by the refresh orchestrator and read per dispatch by the
/// authenticated client.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the credentials were obtained.
	pub issued_at: OffsetDateTime,
	/// Expiry instant, when the provider announced one.
	#[serde(default)]
	pub expires_at: Option<OffsetDateTime>,
}
impl Credentials {
	/// Creates credentials issued now with no refresh token and no expiry.
	pub fn new(access_token: TokenSecret) -> Self {
		Self {
			access_token,
			refresh_token: None,
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
		}
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: TokenSecret) -> Self {
		self.refresh_token = Some(refresh_token);

		self
	}

	/// Overrides the issued-at instant.
	pub fn with_issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Sets the expiry relative to the issued-at instant.
	///
	/// Fails when the resulting instant is not representable.
	pub fn expires_in(mut self, ttl: Duration) -> Result<Self, ConfigError> {
		let expires_at =
			self.issued_at.checked_add(ttl).ok_or(ConfigError::ExpiresInOutOfRange)?;

		self.expires_at = Some(expires_at);

		Ok(self)
	}

	/// Returns the `Authorization` header value for these credentials.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}

	/// Returns `true` if the credentials carry an expiry that has passed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("access_token", &"<redacted>")
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
