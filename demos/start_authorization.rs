//! Walks through an authorization-code + PKCE window using a driver that simulates the
//! authorization server redirecting straight back to the callback.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use url::Url;
// self
use oauth2_vault::{
	auth::CollectionUid,
	authorize::{
		AuthorizationDriver, AuthorizationFailure, AuthorizationReply, AuthorizeRequest,
		DriverFuture, NavigationOutcome, observe_navigation,
	},
	config::{GrantConfig, GrantType},
	flows::Vault,
	store::{CredentialStore, MemoryStore},
	trace::DebugInfo,
};

/// A driver that immediately "navigates" to the callback carrying a canned code,
/// the way an embedded browser surface would after the user consented.
struct InstantConsentDriver;
impl AuthorizationDriver for InstantConsentDriver {
	fn authorize<'a>(
		&'a self,
		request: &'a AuthorizeRequest,
	) -> DriverFuture<'a, AuthorizationReply> {
		Box::pin(async move {
			let navigated =
				Url::parse(&format!("{}?code=demo-code&state=demo-state", request.callback_url))
					.map_err(|_| {
						AuthorizationFailure::bare(
							oauth2_vault::authorize::AuthorizationError::Aborted,
						)
					})?;

			match observe_navigation(&request.callback_url, Some("demo-state"), &navigated) {
				Ok(NavigationOutcome::Code(code)) =>
					Ok(AuthorizationReply { code, trace: DebugInfo::default() }),
				Ok(NavigationOutcome::Continue) | Err(_) =>
					Err(AuthorizationFailure::bare(
						oauth2_vault::authorize::AuthorizationError::Aborted,
					)),
			}
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let vault = Vault::new(store).with_authorization_driver(Arc::new(InstantConsentDriver));
	let config = GrantConfig::builder(
		GrantType::AuthorizationCode,
		Url::parse("https://provider.example.com/token")?,
	)
	.client_id("demo-client")
	.authorization_url(Url::parse("https://provider.example.com/authorize")?)
	.callback_url(Url::parse("https://app.example.com/oauth/callback")?)
	.scope("openid profile")
	.state("demo-state")
	.pkce(true)
	.build()?;
	let collection = CollectionUid::new("collection-demo")?;
	let grant = vault
		.request_authorization_code(&config, Some("prebuilt-challenge"), &collection)
		.await?;

	println!("Send your user to {}.", grant.authorize_url);
	println!("Captured authorization code: {}.", grant.code);
	println!("Exchange it against {} to finish the flow.", config.access_token_url);

	Ok(())
}
