//! Token bundle model: wire-faithful parsing, expiry math, and redacted secrets.

// crates.io
use serde::Deserializer;
// self
use crate::{_prelude::*, auth::id::{CollectionUid, CredentialsId}};

/// Redacted secret wrapper keeping token material out of logs.
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

/// Token-endpoint response payload, kept wire-faithful.
///
/// Every field beyond the RFC 6749 basics is preserved verbatim in `extra`, so
/// provider-specific additions (`id_token`, audiences, custom claims) survive a
/// store round-trip untouched. A bundle parsed from a response is only a
/// *candidate*: the store refuses admission unless [`TokenBundle::is_admissible`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenBundle {
	/// Access token secret; admission requires it to be present and non-empty.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Token type passthrough (`bearer` for most providers).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Refresh token secret, if the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Scope passthrough as returned by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Token lifetime in seconds; numeric strings are accepted for lenient providers.
	#[serde(default, deserialize_with = "lenient_seconds", skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<i64>,
	/// Unix-millisecond receipt stamp applied exactly once at store admission.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<i64>,
	/// Any additional response fields, preserved verbatim.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, Json>,
}
impl TokenBundle {
	/// Parses a candidate bundle out of a token-endpoint response value.
	///
	/// Only JSON objects yield a candidate; raw strings and other shapes return `None`.
	pub fn from_response_value(value: &Json) -> Option<Self> {
		serde_json::from_value(value.clone()).ok()
	}

	/// Returns the access token value, when present.
	pub fn access_token(&self) -> Option<&str> {
		self.access_token.as_ref().map(TokenSecret::expose)
	}

	/// Returns `true` when the bundle carries a non-empty access token.
	pub fn has_access_token(&self) -> bool {
		self.access_token().is_some_and(|token| !token.is_empty())
	}

	/// Returns the `error` field carried by OAuth error responses, if any.
	pub fn error(&self) -> Option<&Json> {
		self.extra.get("error").filter(|value| !value.is_null())
	}

	/// Returns `true` when the store may admit this bundle.
	pub fn is_admissible(&self) -> bool {
		self.has_access_token() && self.error().is_none()
	}

	/// Overwrites the receipt stamp. The store calls this exactly once at admission.
	pub fn stamp_created_at(&mut self, now_ms: i64) {
		self.created_at = Some(now_ms);
	}

	/// Expiry check against the provided unix-millisecond instant.
	///
	/// A bundle without an access token is always expired; a bundle missing
	/// either `expires_in` or `created_at` never expires by time.
	pub fn is_expired_at(&self, now_ms: i64) -> bool {
		if !self.has_access_token() {
			return true;
		}

		match (self.expires_in, self.created_at) {
			(Some(expires_in), Some(created_at)) =>
				now_ms > created_at + expires_in.saturating_mul(1_000),
			_ => false,
		}
	}
}

/// Freshness oracle over an optional stored bundle.
pub fn is_expired(bundle: Option<&TokenBundle>, now_ms: i64) -> bool {
	bundle.is_none_or(|stored| stored.is_expired_at(now_ms))
}

/// Current wall clock in unix milliseconds.
pub fn unix_ms_now() -> i64 {
	(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Composite identity addressing one stored bundle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// Owning collection.
	pub collection: CollectionUid,
	/// Token endpoint URL the bundle belongs to.
	pub token_url: String,
	/// Caller-chosen credentials label.
	pub credentials_id: CredentialsId,
}
impl StoreKey {
	/// Builds a key from the collection, token endpoint, and credentials label.
	pub fn new(collection: &CollectionUid, token_url: &Url, credentials_id: &CredentialsId) -> Self {
		Self {
			collection: collection.clone(),
			token_url: token_url.as_str().to_owned(),
			credentials_id: credentials_id.clone(),
		}
	}
}

// Providers disagree on the type of `expires_in`; numbers and numeric strings
// are both accepted, anything else is treated as absent.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Int(i64),
		Float(f64),
		Text(String),
	}

	Ok(match Option::<Raw>::deserialize(deserializer)? {
		Some(Raw::Int(value)) => Some(value),
		Some(Raw::Float(value)) => Some(value as i64),
		Some(Raw::Text(text)) => text.trim().parse::<i64>().ok(),
		None => None,
	})
}
