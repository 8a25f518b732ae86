//! Demonstrates the client-credentials flow with the default reqwest transport and the
//! in-memory credential store reusing cached service tokens.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_vault::{
	auth::CollectionUid,
	config::{GrantConfig, GrantType},
	flows::Vault,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let vault = Vault::new(store);
	let config = GrantConfig::builder(
		GrantType::ClientCredentials,
		Url::parse(&server.url("/token"))?,
	)
	.client_id("demo-client")
	.client_secret("super-secret")
	.scope("email.read profile.read")
	.build()?;
	let collection = CollectionUid::new("collection-demo")?;
	let first = vault.client_credentials(&config, &collection, false).await?;
	let second = vault.client_credentials(&config, &collection, false).await?;

	println!(
		"Fetched access token: {:?}.",
		first.credentials.as_ref().and_then(|bundle| bundle.access_token()),
	);
	println!(
		"Second call was served from cache: {} exchanges traced.",
		second.debug.data.len(),
	);

	token_mock.assert_async().await;

	Ok(())
}
