//! Transport primitives consumed by the retry interceptor.
//!
//! The module exposes [`HttpClient`], the crate's only dependency on an HTTP stack, together
//! with the owned [`RequestDescriptor`] / [`HttpResponse`] pair that flows through it. Any
//! transport that can execute a descriptor and report non-success statuses as
//! [`Error::Status`] plugs into the interceptor; [`ReqwestHttpClient`] is the default adapter.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")]
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransportError};

/// Boxed future returned by [`HttpClient::request`].
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Abstraction over HTTP transports able to execute a [`RequestDescriptor`].
///
/// Implementations must resolve non-success statuses to [`Error::Status`] so the interceptor
/// can classify authorization failures, and must not retry on their own.
pub trait HttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` once.
	fn request<'a>(&'a self, request: &'a RequestDescriptor) -> HttpFuture<'a>;
}
impl<T> HttpClient for Arc<T>
where
	T: ?Sized + HttpClient,
{
	fn request<'a>(&'a self, request: &'a RequestDescriptor) -> HttpFuture<'a> {
		self.as_ref().request(request)
	}
}

/// HTTP methods supported by [`RequestDescriptor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`.
	Get,
	/// `HEAD`.
	Head,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
	/// `OPTIONS`.
	Options,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Head => "HEAD",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
			Method::Options => "OPTIONS",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One outbound HTTP call, owned by the caller and mutated in place by the interceptor.
///
/// Header names are stored lowercase. `retry_count` starts at zero and grows by one for every
/// authorization-triggered replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
	/// Request method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Request headers keyed by lowercase name.
	pub headers: BTreeMap<String, String>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
	/// Number of authorization-triggered retries performed so far.
	#[serde(default)]
	pub retry_count: u32,
}
impl RequestDescriptor {
	/// Creates a descriptor without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: None, retry_count: 0 }
	}

	/// Shortcut for a `GET` descriptor.
	pub fn get(url: Url) -> Self {
		Self::new(Method::Get, url)
	}

	/// Shortcut for a `POST` descriptor carrying `body`.
	pub fn post(url: Url, body: impl Into<Vec<u8>>) -> Self {
		Self::new(Method::Post, url).with_body(body)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.set_header(name, value);

		self
	}

	/// Sets the request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Adds or replaces a header in place.
	pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

/// Response returned by an [`HttpClient`] for a successful dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lowercase name.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with the provided status and body and no headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Returns the body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Deserializes the body as JSON.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: for<'de> Deserialize<'de>,
	{
		serde_json::from_slice(&self.body)
	}
}

/// Maximum number of characters kept from an error response body.
pub(crate) const BODY_PREVIEW_LIMIT: usize = 256;

pub(crate) fn body_preview(body: &[u8]) -> Option<String> {
	if body.is_empty() {
		return None;
	}

	Some(String::from_utf8_lossy(body).chars().take(BODY_PREVIEW_LIMIT).collect())
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects follow the wrapped client's policy. Non-success statuses resolve to
/// [`Error::Status`] with a short body preview.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn build(&self, request: &RequestDescriptor) -> Result<reqwest::Request> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Head => reqwest::Method::HEAD,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
			Method::Options => reqwest::Method::OPTIONS,
		};
		let mut headers = HeaderMap::new();

		for (name, value) in &request.headers {
			let invalid = || ConfigError::InvalidHeader { name: name.clone() };
			let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
			let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;

			headers.insert(header_name, header_value);
		}

		let mut builder = self.0.request(method, request.url.clone()).headers(headers);

		if let Some(body) = &request.body {
			builder = builder.body(body.clone());
		}

		builder.build().map_err(|e| ConfigError::from(e).into())
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpClient for ReqwestHttpClient {
	fn request<'a>(&'a self, request: &'a RequestDescriptor) -> HttpFuture<'a> {
		Box::pin(async move {
			let prepared = self.build(request)?;
			let response = self.0.execute(prepared).await.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			if !status.is_success() {
				return Err(Error::Status { status: status.as_u16(), body: body_preview(&body) });
			}

			Ok(HttpResponse { status: status.as_u16(), headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return i64::try_from(secs).ok().map(Duration::seconds);
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse fixture URL.")
	}

	#[test]
	fn descriptor_headers_are_case_insensitive() {
		let mut request =
			RequestDescriptor::get(url("https://api.example.com/a")).with_header("X-Trace", "1");

		request.set_header("Authorization", "Bearer a");

		assert_eq!(request.header("x-trace"), Some("1"));
		assert_eq!(request.header("AUTHORIZATION"), Some("Bearer a"));
		assert_eq!(request.retry_count, 0);
	}

	#[test]
	fn body_preview_truncates_and_skips_empty_bodies() {
		let long = "x".repeat(BODY_PREVIEW_LIMIT * 2);

		assert_eq!(body_preview(b""), None);
		assert_eq!(
			body_preview(long.as_bytes()).map(|preview| preview.len()),
			Some(BODY_PREVIEW_LIMIT)
		);
	}

	#[test]
	fn response_helpers_decode_bodies() {
		let response = HttpResponse::new(200, "{\"ok\":true}");
		let value: serde_json::Value =
			response.json().expect("Fixture response body should be valid JSON.");

		assert_eq!(value["ok"], serde_json::Value::Bool(true));
		assert_eq!(response.text(), "{\"ok\":true}");
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn retry_after_accepts_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(7)));
		assert_eq!(parse_retry_after(&HeaderMap::new()), None);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn retry_after_beyond_i64_is_ignored() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("18446744073709551615"));

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("9223372036854775807"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(i64::MAX)));
	}
}
