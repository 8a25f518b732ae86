//! High-level grant orchestrators coordinating store, session, driver, and token endpoint.

pub mod decision;
pub mod refresh;

mod acquire;

pub use decision::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{CollectionUid, CredentialsId, StoreKey, TokenBundle},
	authorize::AuthorizationDriver,
	config::GrantConfig,
	http::TokenHttpClient,
	session::SessionManager,
	store::CredentialStore,
	trace::DebugInfo,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Vault specialized for the crate's default reqwest transport stack.
pub type ReqwestVault = Vault<ReqwestHttpClient>;

/// Result of one token acquisition (or refresh) surfaced to the caller.
#[derive(Clone, Debug)]
pub struct TokenAcquisition {
	/// Collection the credentials belong to.
	pub collection: CollectionUid,
	/// Token endpoint URL the operation addressed.
	pub url: String,
	/// The served bundle; `None` when nothing usable exists and fetching was disabled.
	pub credentials: Option<TokenBundle>,
	/// Caller-chosen credentials label echoed back.
	pub credentials_id: CredentialsId,
	/// Ordered exchange trace collected during the operation.
	pub debug: DebugInfo,
}

/// Result of the lower-level authorization-code escape hatch.
#[derive(Clone, Debug)]
pub struct AuthorizationGrant {
	/// Authorization code captured from the callback.
	pub code: String,
	/// Fully-formed authorization URL the window navigated to.
	pub authorize_url: Url,
	/// Authorization-window trace.
	pub debug: DebugInfo,
}

/// Coordinates OAuth 2.0 token acquisition for one process.
///
/// The vault owns the HTTP transport, the credential store, the per-endpoint
/// browser session table, and the per-key singleflight guards, so grant
/// implementations can focus on the cache decision tree and the exchanges
/// themselves. Install an [`AuthorizationDriver`] to enable the
/// authorization_code grant; the other grants work without one.
#[derive(Clone)]
pub struct Vault<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// HTTP client used for every token-endpoint exchange.
	pub http_client: Arc<C>,
	/// Credential store persisting admitted bundles.
	pub store: Arc<dyn CredentialStore>,
	/// Optional browser authorization driver.
	pub driver: Option<Arc<dyn AuthorizationDriver>>,
	/// Browser session isolation table.
	pub sessions: Arc<SessionManager>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	flow_guards: Arc<Mutex<HashMap<StoreKey, Arc<AsyncMutex<()>>>>>,
}
impl<C> Vault<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a vault that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			driver: None,
			sessions: Default::default(),
			refresh_metrics: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Installs the browser authorization driver required by the authorization_code grant.
	pub fn with_authorization_driver(mut self, driver: Arc<dyn AuthorizationDriver>) -> Self {
		self.driver = Some(driver);

		self
	}

	/// Returns (and creates on demand) the singleflight guard for a store key.
	pub(crate) fn flow_guard(&self, key: &StoreKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	pub(crate) fn store_key(&self, config: &GrantConfig, collection: &CollectionUid) -> StoreKey {
		StoreKey::new(collection, &config.access_token_url, &config.credentials_id)
	}
}
#[cfg(feature = "reqwest")]
impl Vault<ReqwestHttpClient> {
	/// Creates a vault over the provided store with a fresh reqwest transport.
	///
	/// The transport never follows redirects; see
	/// [`ReqwestHttpClient`](crate::http::ReqwestHttpClient) to wrap a custom client.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self::with_http_client(store, ReqwestHttpClient::default())
	}
}
impl<C> Debug for Vault<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Vault")
			.field("driver_installed", &self.driver.is_some())
			.field("sessions", &self.sessions)
			.finish()
	}
}
