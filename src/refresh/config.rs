//! Token endpoint configuration for the refresh-token exchange.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Errors raised while validating a [`TokenEndpointConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenEndpointConfigError {
	/// Token endpoints must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The client identifier is blank.
	#[error("The client identifier must not be empty.")]
	EmptyClientId,
	/// The requested scope contains control characters.
	#[error("The requested scope contains control characters.")]
	InvalidScope,
}

/// Where and as whom the orchestrator exchanges refresh tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenEndpointConfig {
	/// OAuth 2.0 token endpoint.
	pub token_endpoint: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Client secret sent with `client_secret_post`, for confidential clients.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_secret: Option<TokenSecret>,
	/// Space-delimited scope requested on refresh; omitted when `None`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
}
impl TokenEndpointConfig {
	/// Starts a builder for the provided endpoint and client identifier.
	pub fn builder(
		token_endpoint: Url,
		client_id: impl Into<String>,
	) -> TokenEndpointConfigBuilder {
		TokenEndpointConfigBuilder {
			config: Self {
				token_endpoint,
				client_id: client_id.into(),
				client_secret: None,
				scope: None,
			},
		}
	}

	/// Validates invariants; also used after deserializing a config document.
	pub fn validate(&self) -> Result<(), TokenEndpointConfigError> {
		if self.token_endpoint.scheme() != "https" {
			return Err(TokenEndpointConfigError::InsecureEndpoint {
				url: self.token_endpoint.to_string(),
			});
		}
		if self.client_id.trim().is_empty() {
			return Err(TokenEndpointConfigError::EmptyClientId);
		}
		if self.scope.as_deref().is_some_and(|scope| scope.chars().any(char::is_control)) {
			return Err(TokenEndpointConfigError::InvalidScope);
		}

		Ok(())
	}
}

/// Builder returned by [`TokenEndpointConfig::builder`].
#[derive(Clone, Debug)]
pub struct TokenEndpointConfigBuilder {
	config: TokenEndpointConfig,
}
impl TokenEndpointConfigBuilder {
	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.config.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the scope requested on refresh.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.config.scope = Some(scope.into());

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<TokenEndpointConfig, TokenEndpointConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse fixture URL.")
	}

	#[test]
	fn builder_rejects_insecure_endpoints_and_blank_clients() {
		let err = TokenEndpointConfig::builder(url("http://auth.example.com/token"), "client")
			.build()
			.expect_err("Plain HTTP token endpoints should be rejected.");

		assert!(matches!(err, TokenEndpointConfigError::InsecureEndpoint { .. }));

		let err = TokenEndpointConfig::builder(url("https://auth.example.com/token"), "  ")
			.build()
			.expect_err("Blank client identifiers should be rejected.");

		assert_eq!(err, TokenEndpointConfigError::EmptyClientId);

		let err = TokenEndpointConfig::builder(url("https://auth.example.com/token"), "client")
			.scope("read\nwrite")
			.build()
			.expect_err("Control characters in scopes should be rejected.");

		assert_eq!(err, TokenEndpointConfigError::InvalidScope);
	}

	#[test]
	fn config_documents_deserialize_and_validate() {
		let config: TokenEndpointConfig = serde_json::from_str(
			"{\"token_endpoint\":\"https://auth.example.com/token\",\"client_id\":\"app\",\"client_secret\":\"s3cret\"}",
		)
		.expect("Config document should deserialize.");

		assert!(config.validate().is_ok());
		assert_eq!(config.client_secret.as_ref().map(TokenSecret::expose), Some("s3cret"));
		assert!(config.scope.is_none());
		assert!(!format!("{config:?}").contains("s3cret"));
	}
}
