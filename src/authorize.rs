//! Browser-mediated authorization: URL construction, navigation watching, and the driver seam.
//!
//! The vault never drives a browser itself. Hosts implement
//! [`AuthorizationDriver`] over whatever embedded web surface they own, feeding
//! observed navigations through [`observe_navigation`] until the callback URL
//! is reached; the helpers here keep URL assembly and callback matching pure
//! and testable. The driver never sees the client secret.

// self
use crate::{
	_prelude::*,
	config::GrantConfig,
	error::ConfigError,
	pkce::CodeChallengeMethod,
	session::SessionId,
	trace::DebugInfo,
};

/// Boxed driver future, `Send` while the authorization window is open.
pub type DriverFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, AuthorizationFailure>> + 'a + Send>>;

/// Failures surfaced by the authorization window.
#[derive(Clone, Debug, ThisError)]
pub enum AuthorizationError {
	/// The surface closed before any navigation reached the callback URL.
	#[error("Authorization window closed before reaching the callback URL.")]
	Aborted,
	/// The callback carried an `error` parameter from the authorization server.
	#[error("Authorization server rejected the request: {error}.")]
	Rejected {
		/// OAuth error code from the callback query.
		error: String,
		/// Optional `error_description` from the callback query.
		description: Option<String>,
	},
	/// The window exceeded its time limit.
	#[error("Authorization window timed out after {limit_secs} seconds.")]
	Timeout {
		/// Limit that was exceeded, in seconds.
		limit_secs: u64,
	},
	/// The callback's `state` did not match the value sent with the request.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// The callback was reached without an authorization code.
	#[error("Callback reached without an authorization code.")]
	MissingCode,
}

/// An [`AuthorizationError`] paired with the window trace collected up to the failure.
#[derive(Debug, ThisError)]
#[error("{error}")]
pub struct AuthorizationFailure {
	/// The window failure.
	#[source]
	pub error: AuthorizationError,
	/// Navigation trace collected before the failure.
	pub trace: DebugInfo,
}
impl AuthorizationFailure {
	/// Wraps an error with an empty trace.
	pub fn bare(error: AuthorizationError) -> Self {
		Self { error, trace: DebugInfo::default() }
	}
}

/// Everything a driver needs to run one authorization window.
#[derive(Clone, Debug)]
pub struct AuthorizeRequest {
	/// Fully-formed authorization URL to navigate to.
	pub authorize_url: Url,
	/// Callback URL whose origin + path terminates the window.
	pub callback_url: Url,
	/// Session scope for cookies/storage isolation.
	pub session: SessionId,
}

/// Successful window outcome: the captured code plus the window trace.
#[derive(Clone, Debug)]
pub struct AuthorizationReply {
	/// Authorization code extracted from the callback query.
	pub code: String,
	/// Navigation trace of the window.
	pub trace: DebugInfo,
}

/// Capability driving a user through an authorization URL on an isolated surface.
pub trait AuthorizationDriver
where
	Self: Send + Sync,
{
	/// Opens the window, watches navigations, and resolves with the captured code.
	fn authorize<'a>(&'a self, request: &'a AuthorizeRequest) -> DriverFuture<'a, AuthorizationReply>;
}

/// Outcome of feeding one observed navigation to [`observe_navigation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationOutcome {
	/// The navigation did not reach the callback; keep watching.
	Continue,
	/// The callback was reached and carried a code.
	Code(String),
}

/// Builds the authorization URL for a grant configuration.
///
/// Appends `response_type=code`, `client_id`, then `redirect_uri`, `scope`,
/// `code_challenge` + `code_challenge_method`, and `state` when configured.
pub fn build_authorization_url(
	config: &GrantConfig,
	code_challenge: Option<&str>,
) -> Result<Url, ConfigError> {
	let mut url = config
		.authorization_url
		.clone()
		.ok_or(ConfigError::MissingField { grant: config.grant.as_str(), field: "authorization_url" })?;

	{
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &config.client_id);

		if let Some(callback) = &config.callback_url {
			pairs.append_pair("redirect_uri", callback.as_str());
		}
		if let Some(scope) = &config.scope {
			pairs.append_pair("scope", scope);
		}
		if let Some(challenge) = code_challenge {
			pairs.append_pair("code_challenge", challenge);
			pairs.append_pair("code_challenge_method", CodeChallengeMethod::S256.as_str());
		}
		if let Some(state) = &config.state {
			pairs.append_pair("state", state);
		}
	}

	Ok(url)
}

/// Compares scheme, host, port, and path; query and fragment never participate.
pub fn callback_matches(callback: &Url, navigated: &Url) -> bool {
	navigated.scheme() == callback.scheme()
		&& navigated.host_str() == callback.host_str()
		&& navigated.port_or_known_default() == callback.port_or_known_default()
		&& navigated.path() == callback.path()
}

/// Classifies one observed navigation against the callback URL.
///
/// Non-callback navigations yield [`NavigationOutcome::Continue`]. Once the
/// callback is reached, the query is inspected: an `error` parameter rejects,
/// a `state` mismatch (when one was sent) rejects, otherwise the `code`
/// parameter resolves the window.
pub fn observe_navigation(
	callback: &Url,
	expected_state: Option<&str>,
	navigated: &Url,
) -> Result<NavigationOutcome, AuthorizationError> {
	if !callback_matches(callback, navigated) {
		return Ok(NavigationOutcome::Continue);
	}

	let query: HashMap<_, _> = navigated.query_pairs().collect();

	if let Some(error) = query.get("error") {
		return Err(AuthorizationError::Rejected {
			error: error.clone().into_owned(),
			description: query.get("error_description").map(|text| text.clone().into_owned()),
		});
	}
	if let Some(expected) = expected_state
		&& query.get("state").map(AsRef::as_ref) != Some(expected)
	{
		return Err(AuthorizationError::StateMismatch);
	}

	match query.get("code") {
		Some(code) if !code.is_empty() => Ok(NavigationOutcome::Code(code.clone().into_owned())),
		_ => Err(AuthorizationError::MissingCode),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::GrantType;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	fn config() -> GrantConfig {
		GrantConfig::builder(GrantType::AuthorizationCode, url("https://auth.example.com/token"))
			.client_id("client-1")
			.authorization_url(url("https://auth.example.com/authorize"))
			.callback_url(url("http://localhost:8080/callback"))
			.scope("read write")
			.state("opaque-state")
			.build()
			.expect("Authorization code config fixture should build.")
	}

	#[test]
	fn authorization_url_carries_expected_parameters() {
		let built = build_authorization_url(&config(), Some("challenge-value"))
			.expect("Authorization URL should build.");
		let pairs: HashMap<_, _> = built.query_pairs().collect();

		assert_eq!(pairs.get("response_type").map(AsRef::as_ref), Some("code"));
		assert_eq!(pairs.get("client_id").map(AsRef::as_ref), Some("client-1"));
		assert_eq!(
			pairs.get("redirect_uri").map(AsRef::as_ref),
			Some("http://localhost:8080/callback"),
		);
		assert_eq!(pairs.get("scope").map(AsRef::as_ref), Some("read write"));
		assert_eq!(pairs.get("code_challenge").map(AsRef::as_ref), Some("challenge-value"));
		assert_eq!(pairs.get("code_challenge_method").map(AsRef::as_ref), Some("S256"));
		assert_eq!(pairs.get("state").map(AsRef::as_ref), Some("opaque-state"));
	}

	#[test]
	fn authorization_url_omits_pkce_parameters_without_a_challenge() {
		let built =
			build_authorization_url(&config(), None).expect("Authorization URL should build.");
		let pairs: HashMap<_, _> = built.query_pairs().collect();

		assert!(!pairs.contains_key("code_challenge"));
		assert!(!pairs.contains_key("code_challenge_method"));
	}

	#[test]
	fn callback_matching_is_origin_and_path_exact() {
		let callback = url("http://localhost:8080/callback");

		assert!(callback_matches(&callback, &url("http://localhost:8080/callback?code=abc#frag")));
		assert!(!callback_matches(&callback, &url("http://localhost:8080/other")));
		assert!(!callback_matches(&callback, &url("http://localhost:9090/callback")));
		assert!(!callback_matches(&callback, &url("https://localhost:8080/callback")));
	}

	#[test]
	fn default_ports_compare_equal() {
		assert!(callback_matches(
			&url("https://app.example.com/cb"),
			&url("https://app.example.com:443/cb?code=x"),
		));
	}

	#[test]
	fn navigations_resolve_code_or_keep_watching() {
		let callback = url("http://localhost:8080/callback");

		assert_eq!(
			observe_navigation(&callback, None, &url("https://auth.example.com/login"))
				.expect("Unrelated navigations should continue."),
			NavigationOutcome::Continue,
		);
		assert_eq!(
			observe_navigation(&callback, None, &url("http://localhost:8080/callback?code=abc"))
				.expect("Callback with a code should resolve."),
			NavigationOutcome::Code("abc".into()),
		);
	}

	#[test]
	fn callback_errors_and_state_mismatches_reject() {
		let callback = url("http://localhost:8080/callback");
		let rejected = observe_navigation(
			&callback,
			None,
			&url("http://localhost:8080/callback?error=access_denied&error_description=nope"),
		)
		.expect_err("An error parameter should reject.");

		assert!(matches!(
			rejected,
			AuthorizationError::Rejected { ref error, .. } if error == "access_denied"
		));

		let mismatch = observe_navigation(
			&callback,
			Some("expected"),
			&url("http://localhost:8080/callback?code=abc&state=other"),
		)
		.expect_err("A state mismatch should reject.");

		assert!(matches!(mismatch, AuthorizationError::StateMismatch));

		let missing =
			observe_navigation(&callback, None, &url("http://localhost:8080/callback?foo=1"))
				.expect_err("A callback without a code should reject.");

		assert!(matches!(missing, AuthorizationError::MissingCode));
	}
}
