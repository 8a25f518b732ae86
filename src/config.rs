//! Grant configuration: the caller-supplied description of one token acquisition.

// self
use crate::{_prelude::*, auth::CredentialsId, error::ConfigError};

/// OAuth 2.0 grant types understood by the vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization Code grant (RFC 6749 §4.1), with optional PKCE.
	AuthorizationCode,
	/// Client Credentials grant (RFC 6749 §4.4).
	ClientCredentials,
	/// Resource Owner Password Credentials grant (RFC 6749 §4.3).
	Password,
	/// Refresh Token exchange (RFC 6749 §6).
	RefreshToken,
}
impl GrantType {
	/// Returns the wire value used in `grant_type` parameters.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::ClientCredentials => "client_credentials",
			GrantType::Password => "password",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Where client credentials travel on token-endpoint requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsPlacement {
	/// `Authorization: Basic` header; `client_secret` is omitted from the body.
	BasicAuthHeader,
	/// `client_id`/`client_secret` as body parameters.
	#[default]
	Body,
}

/// Validated configuration for one grant's token acquisition.
///
/// Build through [`GrantConfig::builder`]; per-grant required fields are
/// checked at build time and re-checked when an operation is invoked, so a
/// configuration mutated after construction still surfaces [`ConfigError`]
/// instead of a malformed exchange.
#[derive(Clone, Debug)]
pub struct GrantConfig {
	/// Grant this configuration describes.
	pub grant: GrantType,
	/// Token endpoint URL; also the URL component of the store key.
	pub access_token_url: Url,
	/// Dedicated refresh endpoint; falls back to `access_token_url`.
	pub refresh_token_url: Option<Url>,
	/// Authorization endpoint (authorization_code only).
	pub authorization_url: Option<Url>,
	/// Redirect target registered with the authorization server (authorization_code only).
	pub callback_url: Option<Url>,
	/// OAuth client identifier.
	pub client_id: String,
	/// Optional client secret for confidential clients.
	pub client_secret: Option<String>,
	/// Resource owner username (password grant only).
	pub username: Option<String>,
	/// Resource owner password (password grant only).
	pub password: Option<String>,
	/// Space-delimited scope string.
	pub scope: Option<String>,
	/// Opaque state round-tripped through the authorization redirect.
	pub state: Option<String>,
	/// Enables PKCE for the authorization_code grant.
	pub pkce: bool,
	/// Where client credentials travel on token-endpoint requests.
	pub credentials_placement: CredentialsPlacement,
	/// Caller-chosen label separating bundles that share a token endpoint.
	pub credentials_id: CredentialsId,
	/// Attempt a refresh_token exchange when the cached bundle expired.
	pub auto_refresh_token: bool,
	/// Fall back to a fresh acquisition when nothing usable is cached.
	pub auto_fetch_token: bool,
}
impl GrantConfig {
	/// Starts a builder for the given grant and token endpoint.
	pub fn builder(grant: GrantType, access_token_url: Url) -> GrantConfigBuilder {
		GrantConfigBuilder::new(grant, access_token_url)
	}

	/// Resolves the endpoint refresh exchanges should POST to.
	pub fn refresh_url(&self) -> &Url {
		self.refresh_token_url.as_ref().unwrap_or(&self.access_token_url)
	}

	pub(crate) fn ensure_grant(&self, expected: GrantType) -> Result<(), ConfigError> {
		if self.grant == expected {
			Ok(())
		} else {
			Err(ConfigError::GrantMismatch { expected: expected.as_str(), found: self.grant.as_str() })
		}
	}

	pub(crate) fn validate(&self) -> Result<(), ConfigError> {
		let grant = self.grant.as_str();

		if self.client_id.is_empty() {
			return Err(ConfigError::EmptyClientId);
		}

		match self.grant {
			GrantType::AuthorizationCode => {
				if self.authorization_url.is_none() {
					return Err(ConfigError::MissingField { grant, field: "authorization_url" });
				}
				if self.callback_url.is_none() {
					return Err(ConfigError::MissingField { grant, field: "callback_url" });
				}
			},
			GrantType::Password => {
				if self.username.as_deref().is_none_or(str::is_empty) {
					return Err(ConfigError::MissingField { grant, field: "username" });
				}
				if self.password.is_none() {
					return Err(ConfigError::MissingField { grant, field: "password" });
				}
			},
			GrantType::ClientCredentials | GrantType::RefreshToken => {},
		}

		Ok(())
	}
}

/// Builder for [`GrantConfig`]; validation happens in [`build`](GrantConfigBuilder::build).
#[derive(Clone, Debug)]
pub struct GrantConfigBuilder {
	grant: GrantType,
	access_token_url: Url,
	refresh_token_url: Option<Url>,
	authorization_url: Option<Url>,
	callback_url: Option<Url>,
	client_id: String,
	client_secret: Option<String>,
	username: Option<String>,
	password: Option<String>,
	scope: Option<String>,
	state: Option<String>,
	pkce: bool,
	credentials_placement: CredentialsPlacement,
	credentials_id: Option<CredentialsId>,
	auto_refresh_token: bool,
	auto_fetch_token: bool,
}
impl GrantConfigBuilder {
	fn new(grant: GrantType, access_token_url: Url) -> Self {
		Self {
			grant,
			access_token_url,
			refresh_token_url: None,
			authorization_url: None,
			callback_url: None,
			client_id: String::new(),
			client_secret: None,
			username: None,
			password: None,
			scope: None,
			state: None,
			pkce: false,
			credentials_placement: CredentialsPlacement::default(),
			credentials_id: None,
			auto_refresh_token: false,
			auto_fetch_token: true,
		}
	}

	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = client_id.into();

		self
	}

	/// Sets the client secret for confidential clients.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the resource owner credentials for the password grant.
	pub fn resource_owner(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
		self.username = Some(username.into());
		self.password = Some(password.into());

		self
	}

	/// Sets the requested scope (space-delimited).
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the opaque state value round-tripped through the redirect.
	pub fn state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Sets the authorization endpoint (authorization_code only).
	pub fn authorization_url(mut self, url: Url) -> Self {
		self.authorization_url = Some(url);

		self
	}

	/// Sets the redirect target the authorization server will navigate to.
	pub fn callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Sets a dedicated refresh endpoint.
	pub fn refresh_token_url(mut self, url: Url) -> Self {
		self.refresh_token_url = Some(url);

		self
	}

	/// Enables PKCE for the authorization_code grant.
	pub fn pkce(mut self, enabled: bool) -> Self {
		self.pkce = enabled;

		self
	}

	/// Chooses where client credentials travel on token requests.
	pub fn credentials_placement(mut self, placement: CredentialsPlacement) -> Self {
		self.credentials_placement = placement;

		self
	}

	/// Labels the bundle so multiple credentials can share a token endpoint.
	pub fn credentials_id(mut self, id: CredentialsId) -> Self {
		self.credentials_id = Some(id);

		self
	}

	/// Enables the refresh-on-expiry attempt (defaults to off).
	pub fn auto_refresh_token(mut self, enabled: bool) -> Self {
		self.auto_refresh_token = enabled;

		self
	}

	/// Enables fresh acquisition fallback (defaults to on).
	pub fn auto_fetch_token(mut self, enabled: bool) -> Self {
		self.auto_fetch_token = enabled;

		self
	}

	/// Validates and produces the [`GrantConfig`].
	pub fn build(self) -> Result<GrantConfig, ConfigError> {
		let credentials_id = match self.credentials_id {
			Some(id) => id,
			None => CredentialsId::new("default")?,
		};
		let config = GrantConfig {
			grant: self.grant,
			access_token_url: self.access_token_url,
			refresh_token_url: self.refresh_token_url,
			authorization_url: self.authorization_url,
			callback_url: self.callback_url,
			client_id: self.client_id,
			client_secret: self.client_secret,
			username: self.username,
			password: self.password,
			scope: self.scope,
			state: self.state,
			pkce: self.pkce,
			credentials_placement: self.credentials_placement,
			credentials_id,
			auto_refresh_token: self.auto_refresh_token,
			auto_fetch_token: self.auto_fetch_token,
		};

		config.validate()?;

		Ok(config)
	}
}
