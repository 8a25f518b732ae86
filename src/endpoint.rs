//! Token endpoint client: grant bodies, credentials placement, lenient parsing, recording.
//!
//! Every exchange is recorded explicitly through the [`TraceRecorder`] handed
//! in by the flow: the request snapshot at dispatch, the response (or a
//! synthetic failure record) at arrival. Callers always receive a complete
//! timeline.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{TokenBundle, unix_ms_now},
	config::{CredentialsPlacement, GrantConfig, GrantType},
	error::TransportError,
	http::{FormRequest, TokenHttpClient},
	trace::{DebugExchange, ExchangeRequest, ExchangeResponse, ExchangeStatus, ExchangeTiming, TraceRecorder},
};

/// Per-grant parameters that vary between exchanges.
#[derive(Clone, Copy, Debug)]
pub(crate) enum GrantParams<'a> {
	/// Authorization code exchange, optionally carrying a PKCE verifier.
	AuthorizationCode {
		/// Code captured from the authorization window.
		code: &'a str,
		/// PKCE verifier matching the challenge sent with the authorization URL.
		code_verifier: Option<&'a str>,
	},
	/// Client credentials exchange.
	ClientCredentials,
	/// Resource owner password exchange.
	Password,
	/// Refresh token exchange.
	RefreshToken {
		/// Refresh token from the stored bundle.
		refresh_token: &'a str,
	},
}
impl GrantParams<'_> {
	pub(crate) fn grant(&self) -> GrantType {
		match self {
			GrantParams::AuthorizationCode { .. } => GrantType::AuthorizationCode,
			GrantParams::ClientCredentials => GrantType::ClientCredentials,
			GrantParams::Password => GrantType::Password,
			GrantParams::RefreshToken { .. } => GrantType::RefreshToken,
		}
	}
}

/// Parsed result of one token-endpoint round-trip that produced a response.
#[derive(Clone, Debug)]
pub(crate) struct ExchangeOutcome {
	pub status: u16,
	pub raw: String,
	pub bundle: Option<TokenBundle>,
}
impl ExchangeOutcome {
	pub(crate) fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Stringified response body used when rejecting an acquisition.
	pub(crate) fn body_string(&self) -> String {
		if self.raw.is_empty() { format!("HTTP {}", self.status) } else { self.raw.clone() }
	}
}

/// Transport failure: the endpoint was never reached, no response exists.
#[derive(Clone, Debug)]
pub(crate) struct ExchangeFailure {
	pub message: String,
}

/// Executes one recorded exchange against `url`.
pub(crate) async fn exchange<C>(
	http: &C,
	recorder: &mut TraceRecorder,
	config: &GrantConfig,
	params: GrantParams<'_>,
	url: &Url,
) -> Result<ExchangeOutcome, ExchangeFailure>
where
	C: ?Sized + TokenHttpClient,
{
	let headers = build_headers(config);
	let body = encode_form(&build_form(config, &params));
	let request = FormRequest { url: url.clone(), headers: headers.clone(), body: body.clone() };
	let started_at = unix_ms_now();
	let record = DebugExchange::started(ExchangeRequest {
		url: url.as_str().to_owned(),
		method: "POST".into(),
		headers,
		body,
		timestamp: started_at,
	});

	match http.post_form(&request).await {
		Ok(response) => {
			let completed_at = unix_ms_now();
			let (data, raw) = parse_lenient(&response.body);
			let status = response.status;
			let error = (!response.is_success())
				.then(|| format!("Token endpoint returned status {status}."));

			recorder.record(record.completed(ExchangeResponse {
				url: response.url,
				status: ExchangeStatus::Code(status),
				status_text: response.status_text,
				headers: response.headers,
				data: data.clone(),
				raw: raw.clone(),
				timestamp: completed_at,
				timing: ExchangeTiming::between(started_at, completed_at),
				error,
			}));

			let bundle = TokenBundle::from_response_value(&data);

			Ok(ExchangeOutcome { status, raw, bundle })
		},
		Err(transport) => {
			let completed_at = unix_ms_now();
			let message = transport.to_string();

			recorder.record(record.failed(synthetic_response(
				url,
				&transport,
				&message,
				started_at,
				completed_at,
			)));

			Err(ExchangeFailure { message })
		},
	}
}

/// Assembles the form pairs for a grant, honoring the credentials placement.
pub(crate) fn build_form(config: &GrantConfig, params: &GrantParams<'_>) -> Vec<(&'static str, String)> {
	let mut form = vec![("grant_type", params.grant().as_str().to_owned())];
	let secret_in_body = matches!(config.credentials_placement, CredentialsPlacement::Body);

	match params {
		GrantParams::AuthorizationCode { code, code_verifier } => {
			form.push(("code", (*code).to_owned()));

			if let Some(callback) = &config.callback_url {
				form.push(("redirect_uri", callback.as_str().to_owned()));
			}

			form.push(("client_id", config.client_id.clone()));

			if let Some(secret) = config.client_secret.as_ref().filter(|_| secret_in_body) {
				form.push(("client_secret", secret.clone()));
			}
			if let Some(verifier) = code_verifier {
				form.push(("code_verifier", (*verifier).to_owned()));
			}
			if let Some(scope) = &config.scope {
				form.push(("scope", scope.clone()));
			}
		},
		GrantParams::ClientCredentials => {
			form.push(("client_id", config.client_id.clone()));

			if let Some(secret) = config.client_secret.as_ref().filter(|_| secret_in_body) {
				form.push(("client_secret", secret.clone()));
			}
			if let Some(scope) = &config.scope {
				form.push(("scope", scope.clone()));
			}
		},
		GrantParams::Password => {
			form.push(("username", config.username.clone().unwrap_or_default()));
			form.push(("password", config.password.clone().unwrap_or_default()));
			form.push(("client_id", config.client_id.clone()));

			if let Some(secret) = config.client_secret.as_ref().filter(|_| secret_in_body) {
				form.push(("client_secret", secret.clone()));
			}
			if let Some(scope) = &config.scope {
				form.push(("scope", scope.clone()));
			}
		},
		GrantParams::RefreshToken { refresh_token } => {
			form.push(("client_id", config.client_id.clone()));
			form.push(("refresh_token", (*refresh_token).to_owned()));

			if let Some(secret) = config.client_secret.as_ref().filter(|_| secret_in_body) {
				form.push(("client_secret", secret.clone()));
			}
		},
	}

	form
}

/// Standard token-request headers plus the optional Basic credentials header.
pub(crate) fn build_headers(config: &GrantConfig) -> Vec<(String, String)> {
	let mut headers = vec![
		("content-type".to_owned(), "application/x-www-form-urlencoded".to_owned()),
		("accept".to_owned(), "application/json".to_owned()),
	];

	if matches!(config.credentials_placement, CredentialsPlacement::BasicAuthHeader) {
		headers.push(("authorization".to_owned(), basic_authorization(config)));
	}

	headers
}

pub(crate) fn encode_form(pairs: &[(&'static str, String)]) -> String {
	let mut serializer = form_urlencoded::Serializer::new(String::new());

	for (key, value) in pairs {
		serializer.append_pair(key, value);
	}

	serializer.finish()
}

fn basic_authorization(config: &GrantConfig) -> String {
	let credentials =
		format!("{}:{}", config.client_id, config.client_secret.as_deref().unwrap_or_default());

	format!("Basic {}", STANDARD.encode(credentials))
}

// Unparsable payloads become a JSON string so debug traces stay faithful to the wire.
fn parse_lenient(bytes: &[u8]) -> (Json, String) {
	let raw = String::from_utf8_lossy(bytes).into_owned();
	let data = serde_json::from_str::<Json>(&raw).unwrap_or_else(|_| Json::String(raw.clone()));

	(data, raw)
}

fn synthetic_response(
	url: &Url,
	transport: &TransportError,
	message: &str,
	started_at: i64,
	completed_at: i64,
) -> ExchangeResponse {
	ExchangeResponse {
		url: url.as_str().to_owned(),
		status: ExchangeStatus::Unreached,
		status_text: transport.class().to_owned(),
		headers: vec![("error-class".to_owned(), transport.class().to_owned())],
		data: Json::Null,
		raw: String::new(),
		timestamp: completed_at,
		timing: ExchangeTiming::between(started_at, completed_at),
		error: Some(message.to_owned()),
	}
}
