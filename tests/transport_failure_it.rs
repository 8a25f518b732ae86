// self
use oauth2_vault::{
	_preludet::*,
	auth::CollectionUid,
	config::{GrantConfig, GrantType},
	trace::ExchangeStatus,
};

#[tokio::test]
async fn unreachable_endpoint_records_a_synthetic_exchange() {
	// Nothing listens on the discard port; the connection fails immediately.
	let config = GrantConfig::builder(
		GrantType::ClientCredentials,
		Url::parse("http://127.0.0.1:9/token").expect("Unreachable URL should parse."),
	)
	.client_id("client-1")
	.build()
	.expect("Config should build.");
	let (vault, store) = build_reqwest_test_vault();
	let collection = CollectionUid::new("col-net").expect("Collection fixture should be valid.");
	let err = vault
		.client_credentials(&config, &collection, false)
		.await
		.expect_err("A transport failure must reject the acquisition.");

	assert!(matches!(err, Error::TokenEndpoint { status: None, .. }));

	let debug = err.debug_info().expect("The failure should carry the exchange trace.");

	assert_eq!(debug.data.len(), 1, "The synthetic exchange must be recorded.");

	let exchange = &debug.data[0];

	assert!(!exchange.completed, "A transport failure never completes the exchange.");

	let response =
		exchange.response.as_ref().expect("The synthetic response must be attached.");

	assert_eq!(response.status, ExchangeStatus::Unreached);
	assert_eq!(response.status_text, "NETWORK_ERROR");
	assert!(
		response.headers.iter().any(|(name, value)| name == "error-class" && value == "NETWORK_ERROR"),
		"The synthetic response carries an error-class header.",
	);
	assert!(response.error.is_some());
	assert!(store.is_empty(), "Nothing may be persisted after a transport failure.");
}
