// crates.io
use httpmock::prelude::*;
// self
use oauth2_vault::{
	_preludet::*,
	auth::{CollectionUid, TokenBundle},
	authorize::AuthorizationError,
	config::{GrantConfig, GrantType},
	error::ConfigError,
	pkce,
	url::form_urlencoded,
};

fn collection() -> CollectionUid {
	CollectionUid::new("col-auth").expect("Collection fixture should be valid.")
}

fn url(value: &str) -> Url {
	Url::parse(value).expect("URL fixture should parse.")
}

fn build_config(server: &MockServer) -> GrantConfig {
	GrantConfig::builder(
		GrantType::AuthorizationCode,
		url(&server.url("/token")),
	)
	.client_id("c")
	.authorization_url(url(&server.url("/authorize")))
	.callback_url(url("http://localhost:8080/callback"))
	.scope("read")
	.state("opaque-state")
	.pkce(true)
	.build()
	.expect("Authorization code config should build.")
}

fn query_map(target: &Url) -> std::collections::HashMap<String, String> {
	target.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
}

fn form_map(body: &str) -> std::collections::HashMap<String, String> {
	form_urlencoded::parse(body.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
}

#[tokio::test]
async fn pkce_flow_round_trips_challenge_and_verifier() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let driver = Arc::new(ScriptedDriver::returning_code("abc"));
	let (vault, store) = build_reqwest_test_vault();
	let vault = vault.with_authorization_driver(driver.clone());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"T2\",\"refresh_token\":\"R2\",\"expires_in\":3600}",
			);
		})
		.await;
	let acquisition = vault
		.authorization_code(&config, &collection(), false)
		.await
		.expect("Authorization code acquisition should succeed.");

	mock.assert_async().await;

	// The authorization URL must carry the full RFC 6749 §4.1.1 + RFC 7636 parameter set.
	let authorize_url =
		driver.last_authorize_url().expect("The driver should have opened a window.");
	let params = query_map(&authorize_url);

	assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
	assert_eq!(params.get("client_id").map(String::as_str), Some("c"));
	assert_eq!(
		params.get("redirect_uri").map(String::as_str),
		Some("http://localhost:8080/callback"),
	);
	assert_eq!(params.get("scope").map(String::as_str), Some("read"));
	assert_eq!(params.get("state").map(String::as_str), Some("opaque-state"));
	assert_eq!(params.get("code_challenge_method").map(String::as_str), Some("S256"));

	let challenge = params.get("code_challenge").expect("PKCE must add a code_challenge.");

	// The merged trace: authorization window navigation first, token exchange second.
	assert_eq!(acquisition.debug.data.len(), 2);
	assert_eq!(acquisition.debug.data[0].request.method, "GET");
	assert_eq!(acquisition.debug.data[1].request.method, "POST");

	let token_body = form_map(&acquisition.debug.data[1].request.body);

	assert_eq!(token_body.get("grant_type").map(String::as_str), Some("authorization_code"));
	assert_eq!(token_body.get("code").map(String::as_str), Some("abc"));
	assert_eq!(
		token_body.get("redirect_uri").map(String::as_str),
		Some("http://localhost:8080/callback"),
	);

	let verifier = token_body.get("code_verifier").expect("PKCE must send the code_verifier.");

	assert_eq!(
		&pkce::code_challenge(verifier),
		challenge,
		"The challenge in the authorize URL must be the S256 digest of the sent verifier.",
	);

	let credentials =
		acquisition.credentials.expect("The acquisition should carry credentials.");

	assert_eq!(credentials.access_token(), Some("T2"));
	assert!(credentials.created_at.is_some(), "The bundle must be persisted with a stamp.");
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn rejected_window_surfaces_with_its_trace() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let driver = Arc::new(ScriptedDriver::failing_with(AuthorizationError::Rejected {
		error: "access_denied".into(),
		description: None,
	}));
	let (vault, store) = build_reqwest_test_vault();
	let vault = vault.with_authorization_driver(driver);
	let err = vault
		.authorization_code(&config, &collection(), false)
		.await
		.expect_err("A rejected window must fail the acquisition.");

	assert!(matches!(
		&err,
		Error::Authorization { source: AuthorizationError::Rejected { error, .. }, .. }
			if error == "access_denied"
	));
	assert_eq!(
		err.debug_info().map(|debug| debug.data.len()),
		Some(1),
		"The window trace must survive the failure.",
	);
	assert!(store.is_empty(), "Nothing may be persisted for a rejected window.");
}

#[tokio::test]
async fn missing_driver_is_a_configuration_error() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let (vault, _store) = build_reqwest_test_vault();
	let err = vault
		.authorization_code(&config, &collection(), false)
		.await
		.expect_err("A vault without a driver cannot run the authorization window.");

	assert!(matches!(err, Error::Config(ConfigError::MissingAuthorizationDriver)));
}

#[tokio::test]
async fn cached_bundle_avoids_the_window_entirely() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let driver = Arc::new(ScriptedDriver::returning_code("unused"));
	let (vault, store) = build_reqwest_test_vault();
	let vault = vault.with_authorization_driver(driver.clone());
	let key = oauth2_vault::auth::StoreKey::new(
		&collection(),
		&url(&server.url("/token")),
		&config.credentials_id,
	);

	store.insert_raw(
		key,
		TokenBundle::from_response_value(&serde_json::json!({
			"access_token": "cached",
			"expires_in": 3600,
			"created_at": oauth2_vault::auth::unix_ms_now(),
		}))
		.expect("Seeded bundle should parse."),
	);

	let acquisition = vault
		.authorization_code(&config, &collection(), false)
		.await
		.expect("Cached acquisition should succeed.");

	assert_eq!(
		acquisition.credentials.as_ref().and_then(TokenBundle::access_token),
		Some("cached"),
	);
	assert!(driver.seen.lock().is_empty(), "No window may be opened on a cache hit.");
}

#[tokio::test]
async fn escape_hatch_returns_code_and_authorize_url() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let driver = Arc::new(ScriptedDriver::returning_code("raw-code"));
	let (vault, _store) = build_reqwest_test_vault();
	let vault = vault.with_authorization_driver(driver);
	let grant = vault
		.request_authorization_code(&config, Some("prebuilt-challenge"), &collection())
		.await
		.expect("The escape hatch should capture a code.");

	assert_eq!(grant.code, "raw-code");

	let params = query_map(&grant.authorize_url);

	assert_eq!(params.get("code_challenge").map(String::as_str), Some("prebuilt-challenge"));
	assert_eq!(grant.debug.data.len(), 1, "The window trace must be returned.");
}
