//! Crate-level error types shared by the interceptor, transports, exchanges, and stores.

// self
use crate::{_prelude::*, http::RequestDescriptor};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
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
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Upstream answered with a non-success HTTP status.
	#[error("Request failed with status {status}.")]
	Status {
		/// HTTP status code returned by the upstream service.
		status: u16,
		/// Short preview of the response body, if any.
		body: Option<String>,
	},
	/// Provider rejected the refresh grant (expired or revoked refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or crate-supplied reason string.
		reason: String,
	},
	/// The refresh cycle did not finish within the configured timeout.
	#[error("Token refresh did not finish within {timeout:?}.")]
	RefreshTimeout {
		/// Configured wait bound.
		timeout: std::time::Duration,
		/// Failure that triggered the refresh.
		#[source]
		source: Box<Error>,
	},
}
impl Error {
	/// Returns the HTTP status carried by this error, if the failure came from an HTTP response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::Transient(TransientError::TokenEndpoint { status, .. })
			| Self::Transient(TransientError::TokenResponseParse { status, .. }) => *status,
			_ => None,
		}
	}
}

/// A failed dispatch paired with the request that produced it.
///
/// The interceptor hands the descriptor back inside this value so callers can inspect the
/// retry counter after a permanent failure.
#[derive(Debug, ThisError)]
#[error(
	"{} {} failed after {} retries: {}",
	.request.method,
	.request.url,
	.request.retry_count,
	.error
)]
pub struct RequestFailure {
	/// Request as it was last dispatched.
	pub request: RequestDescriptor,
	/// Error returned by the transport or the retry protocol.
	#[source]
	pub error: Error,
}
impl RequestFailure {
	/// Pairs a request with its failure.
	pub fn new(request: RequestDescriptor, error: impl Into<Error>) -> Self {
		Self { request, error: error.into() }
	}

	/// Returns the HTTP status of the underlying error, if any.
	pub fn status(&self) -> Option<u16> {
		self.error.status()
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A header name or value cannot be sent over HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Token endpoint configuration failed validation.
	#[error(transparent)]
	TokenEndpoint(#[from] crate::refresh::TokenEndpointConfigError),
	/// Stored credentials are missing a refresh secret.
	#[error("Stored credentials are missing a refresh token.")]
	MissingRefreshToken,
	/// No credentials are stored yet.
	#[error("No credentials are stored.")]
	MissingCredentials,
	/// Token endpoint response omitted the access token.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken,
	/// Token lifetime does not fit the supported date range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
