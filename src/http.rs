//! Transport primitives for token-endpoint exchanges.
//!
//! [`TokenHttpClient`] is the vault's only seam onto an HTTP stack: the token
//! endpoint client hands it a fully-encoded form request and receives the raw
//! response back (status, headers, body bytes), leaving recording and lenient
//! parsing to the caller. Implementations must not follow redirects; token
//! endpoints return results directly instead of delegating to another URI.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Fully-prepared `POST` request for a token endpoint.
#[derive(Clone, Debug)]
pub struct FormRequest {
	/// Target URL.
	pub url: Url,
	/// Headers to send, in order.
	pub headers: Vec<(String, String)>,
	/// Form-encoded body.
	pub body: String,
}

/// Raw response surfaced by a transport, before any parsing.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// Final response URL.
	pub url: String,
	/// HTTP status code.
	pub status: u16,
	/// Canonical status text, when known.
	pub status_text: String,
	/// Response headers, in order.
	pub headers: Vec<(String, String)>,
	/// Body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Boxed transport future, `Send` for the lifetime of the in-flight request.
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing token-endpoint exchanges.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes a form-encoded `POST` and returns the raw response.
	fn post_form<'a>(&'a self, request: &'a FormRequest) -> TransportFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The default construction disables redirect following; configure any custom
/// [`ReqwestClient`] the same way before wrapping it.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.unwrap_or_default();

		Self(client)
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
impl TokenHttpClient for ReqwestHttpClient {
	fn post_form<'a>(&'a self, request: &'a FormRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			let mut builder = self.0.post(request.url.clone());

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}

			let response = builder.body(request.body.clone()).send().await?;
			let url = response.url().to_string();
			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.map(|(name, value)| {
					(name.as_str().to_owned(), String::from_utf8_lossy(value.as_bytes()).into_owned())
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse {
				url,
				status: status.as_u16(),
				status_text: status.canonical_reason().unwrap_or_default().to_owned(),
				headers,
				body,
			})
		})
	}
}
