// crates.io
use httpmock::prelude::*;
// self
use oauth2_vault::{
	_preludet::*,
	auth::{CollectionUid, StoreKey, TokenBundle, unix_ms_now},
	config::{GrantConfig, GrantType},
	store::CredentialStore,
	trace::ExchangeStatus,
};

fn collection() -> CollectionUid {
	CollectionUid::new("col-refresh").expect("Collection fixture should be valid.")
}

fn token_url(server: &MockServer) -> Url {
	Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully.")
}

fn build_config(server: &MockServer, auto_fetch: bool) -> GrantConfig {
	GrantConfig::builder(GrantType::ClientCredentials, token_url(server))
		.client_id("client-1")
		.auto_refresh_token(true)
		.auto_fetch_token(auto_fetch)
		.build()
		.expect("Config with auto refresh should build.")
}

fn store_key(server: &MockServer, config: &GrantConfig) -> StoreKey {
	StoreKey::new(&collection(), &token_url(server), &config.credentials_id)
}

fn expired_bundle(refresh_token: Option<&str>) -> TokenBundle {
	let mut value = serde_json::json!({
		"access_token": "old",
		"expires_in": 60,
		"created_at": unix_ms_now() - 120_000,
	});

	if let Some(token) = refresh_token {
		value["refresh_token"] = serde_json::Value::from(token);
	}

	TokenBundle::from_response_value(&value).expect("Expired bundle fixture should parse.")
}

#[tokio::test]
async fn expired_bundle_is_refreshed_and_rotated() {
	let server = MockServer::start_async().await;
	let config = build_config(&server, true);
	let (vault, store) = build_reqwest_test_vault();

	store.insert_raw(store_key(&server, &config), expired_bundle(Some("R")));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body("grant_type=refresh_token&client_id=client-1&refresh_token=R");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"new\",\"refresh_token\":\"R2\",\"expires_in\":3600}",
			);
		})
		.await;
	let acquisition = vault
		.client_credentials(&config, &collection(), false)
		.await
		.expect("Refresh-backed acquisition should succeed.");

	mock.assert_async().await;
	assert_eq!(
		acquisition.credentials.as_ref().and_then(TokenBundle::access_token),
		Some("new"),
	);

	let stored = store
		.get(&store_key(&server, &config))
		.await
		.expect("Store fetch should succeed.")
		.expect("The rotated bundle must be persisted.");

	assert_eq!(stored.access_token(), Some("new"));
	assert_eq!(stored.refresh_token.as_ref().map(AsRef::as_ref), Some("R2"));
	assert_eq!(vault.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn failed_refresh_without_auto_fetch_serves_the_expired_bundle() {
	let server = MockServer::start_async().await;
	let config = build_config(&server, false);
	let (vault, store) = build_reqwest_test_vault();

	store.insert_raw(store_key(&server, &config), expired_bundle(Some("R")));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let acquisition = vault
		.client_credentials(&config, &collection(), false)
		.await
		.expect("The expired bundle must be served, not an error.");

	mock.assert_async().await;
	assert_eq!(
		acquisition.credentials.as_ref().and_then(TokenBundle::access_token),
		Some("old"),
		"The expired bundle is returned verbatim when recovery is disabled.",
	);
	assert!(
		store.get(&store_key(&server, &config)).await.expect("Store fetch should succeed.").is_none(),
		"The failed refresh must clear the stored bundle.",
	);

	let response = acquisition.debug.data[0]
		.response
		.as_ref()
		.expect("The failed refresh exchange must be traced.");

	assert_eq!(response.status, ExchangeStatus::Code(400));
	assert_eq!(vault.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn failed_refresh_with_auto_fetch_falls_through_to_a_fresh_fetch() {
	let server = MockServer::start_async().await;
	let config = build_config(&server, true);
	let (vault, store) = build_reqwest_test_vault();

	store.insert_raw(store_key(&server, &config), expired_bundle(Some("R-stale")));

	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body("grant_type=refresh_token&client_id=client-1&refresh_token=R-stale");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let fetch_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body("grant_type=client_credentials&client_id=client-1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"fresh\",\"expires_in\":3600}");
		})
		.await;
	let acquisition = vault
		.client_credentials(&config, &collection(), false)
		.await
		.expect("The fall-through fetch should succeed.");

	refresh_mock.assert_async().await;
	fetch_mock.assert_async().await;

	assert_eq!(
		acquisition.credentials.as_ref().and_then(TokenBundle::access_token),
		Some("fresh"),
	);
	assert_eq!(
		acquisition.debug.data.len(),
		2,
		"Both the failed refresh and the fresh fetch must be traced.",
	);
}

#[tokio::test]
async fn refresh_preserves_the_prior_refresh_token_when_omitted() {
	let server = MockServer::start_async().await;
	let config = build_config(&server, true);
	let (vault, store) = build_reqwest_test_vault();

	store.insert_raw(store_key(&server, &config), expired_bundle(Some("R-keep")));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"new\",\"expires_in\":3600}");
		})
		.await;
	vault
		.client_credentials(&config, &collection(), false)
		.await
		.expect("Refresh-backed acquisition should succeed.");

	let stored = store
		.get(&store_key(&server, &config))
		.await
		.expect("Store fetch should succeed.")
		.expect("The refreshed bundle must be persisted.");

	assert_eq!(
		stored.refresh_token.as_ref().map(AsRef::as_ref),
		Some("R-keep"),
		"A response omitting refresh_token must not lose the previous secret.",
	);
}

#[tokio::test]
async fn standalone_refresh_without_a_stored_secret_clears_and_serves_nothing() {
	let server = MockServer::start_async().await;
	let config = build_config(&server, true);
	let (vault, store) = build_reqwest_test_vault();

	store.insert_raw(store_key(&server, &config), expired_bundle(None));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body("{}");
		})
		.await;
	let acquisition = vault
		.refresh_token(&config, &collection())
		.await
		.expect("The refresh operation should resolve without credentials.");

	assert!(acquisition.credentials.is_none());
	assert!(acquisition.debug.is_empty(), "No exchange happens without a refresh token.");
	assert!(
		store.get(&store_key(&server, &config)).await.expect("Store fetch should succeed.").is_none(),
		"The unusable bundle must be cleared.",
	);

	mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn refresh_uses_the_dedicated_refresh_endpoint() {
	let server = MockServer::start_async().await;
	let config = GrantConfig::builder(GrantType::ClientCredentials, token_url(&server))
		.client_id("client-1")
		.refresh_token_url(
			Url::parse(&server.url("/refresh")).expect("Refresh endpoint should parse."),
		)
		.auto_refresh_token(true)
		.build()
		.expect("Config with a refresh endpoint should build.");
	let (vault, store) = build_reqwest_test_vault();

	// The bundle lives under the token URL key even when refreshes POST elsewhere.
	store.insert_raw(store_key(&server, &config), expired_bundle(Some("R")));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/refresh")
				.body("grant_type=refresh_token&client_id=client-1&refresh_token=R");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"via-refresh\",\"expires_in\":3600}");
		})
		.await;
	let acquisition = vault
		.refresh_token(&config, &collection())
		.await
		.expect("The standalone refresh should succeed.");

	mock.assert_async().await;
	assert_eq!(
		acquisition.credentials.as_ref().and_then(TokenBundle::access_token),
		Some("via-refresh"),
	);
	assert!(acquisition.url.ends_with("/refresh"));
	assert_eq!(
		store
			.get(&store_key(&server, &config))
			.await
			.expect("Store fetch should succeed.")
			.as_ref()
			.and_then(TokenBundle::access_token),
		Some("via-refresh"),
		"The rotated bundle is stored under the access-token-url key.",
	);
}
