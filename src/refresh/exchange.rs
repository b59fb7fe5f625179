//! `grant_type=refresh_token` exchange against an OAuth 2.0 token endpoint.

// crates.io
use reqwest::{StatusCode, redirect::Policy};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret},
	error::{ConfigError, TransientError, TransportError},
	http,
	refresh::{CredentialExchange, ExchangeFuture, TokenEndpointConfig},
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

/// Exchanges the stored refresh token for a new credential pair over reqwest.
///
/// The client authenticates with `client_secret_post` when a secret is configured. Providers
/// that do not rotate refresh tokens keep the previous one.
#[derive(Clone, Debug)]
pub struct RefreshTokenExchange {
	config: TokenEndpointConfig,
	client: ReqwestClient,
}
impl RefreshTokenExchange {
	/// Validates `config` and builds a dedicated client that does not follow redirects.
	pub fn new(config: TokenEndpointConfig) -> Result<Self> {
		config.validate().map_err(ConfigError::from)?;

		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self { config, client })
	}

	/// Uses a caller-provided client, e.g. one with custom TLS or proxy settings.
	///
	/// `config` is validated the same way as in [`RefreshTokenExchange::new`].
	pub fn with_client(config: TokenEndpointConfig, client: ReqwestClient) -> Result<Self> {
		config.validate().map_err(ConfigError::from)?;

		Ok(Self { config, client })
	}

	/// Endpoint configuration in use.
	pub fn config(&self) -> &TokenEndpointConfig {
		&self.config
	}

	async fn refresh(&self, current: &Credentials) -> Result<Credentials> {
		let refresh_token =
			current.refresh_token.as_ref().ok_or(ConfigError::MissingRefreshToken)?;
		let mut form = vec![
			("grant_type", "refresh_token"),
			("refresh_token", refresh_token.expose()),
			("client_id", self.config.client_id.as_str()),
		];

		if let Some(secret) = &self.config.client_secret {
			form.push(("client_secret", secret.expose()));
		}
		if let Some(scope) = &self.config.scope {
			form.push(("scope", scope.as_str()));
		}

		let response = self
			.client
			.post(self.config.token_endpoint.clone())
			.header(reqwest::header::ACCEPT, "application/json")
			.form(&form)
			.send()
			.await
			.map_err(TransportError::from)?;
		let status = response.status();
		let retry_after = http::parse_retry_after(response.headers());
		let body = response.bytes().await.map_err(TransportError::from)?;

		if !status.is_success() {
			return Err(classify_error(status, &body, retry_after));
		}

		let parsed: TokenResponse =
			serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&body))
				.map_err(|source| TransientError::TokenResponseParse {
					source,
					status: Some(status.as_u16()),
				})?;

		if parsed.access_token.is_empty() {
			return Err(ConfigError::MissingAccessToken.into());
		}

		let mut fresh = Credentials::new(TokenSecret::new(parsed.access_token));

		fresh.refresh_token = match parsed.refresh_token.filter(|token| !token.is_empty()) {
			Some(rotated) => Some(TokenSecret::new(rotated)),
			None => current.refresh_token.clone(),
		};

		if let Some(expires_in) = parsed.expires_in {
			if expires_in <= 0 {
				return Err(ConfigError::NonPositiveExpiresIn.into());
			}

			fresh = fresh.expires_in(Duration::seconds(expires_in))?;
		}

		Ok(fresh)
	}
}
impl CredentialExchange for RefreshTokenExchange {
	fn exchange<'a>(&'a self, current: Option<&'a Credentials>) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let current = current.ok_or(ConfigError::MissingCredentials)?;

			self.refresh(current).await
		})
	}
}

fn classify_error(status: StatusCode, body: &[u8], retry_after: Option<Duration>) -> Error {
	let oauth = serde_json::from_slice::<ErrorResponse>(body).ok();

	if let Some(oauth) = &oauth {
		let message = match &oauth.error_description {
			Some(description) => format!("Token endpoint returned an OAuth error: {description}"),
			None => format!("Token endpoint returned an OAuth error: {}", oauth.error),
		};

		if oauth.error.eq_ignore_ascii_case("invalid_grant")
			|| oauth.error.eq_ignore_ascii_case("access_denied")
		{
			return Error::InvalidGrant { reason: message };
		}

		return TransientError::TokenEndpoint {
			message,
			status: Some(status.as_u16()),
			retry_after,
		}
		.into();
	}

	let message = match http::body_preview(body) {
		Some(preview) => format!("HTTP {}: {preview}", status.as_u16()),
		None => format!("HTTP {}", status.as_u16()),
	};

	TransientError::TokenEndpoint { message, status: Some(status.as_u16()), retry_after }.into()
}
