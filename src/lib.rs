//! Grant-aware OAuth 2.0 token vault—acquire, cache, refresh, and trace access tokens for API
//! tooling across authorization-code (PKCE), client-credentials, and password flows.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authorize;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod pkce;
pub mod session;
pub mod store;
pub mod trace;

mod endpoint;

#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::unix_ms_now,
		authorize::{
			AuthorizationDriver, AuthorizationError, AuthorizationFailure, AuthorizationReply,
			AuthorizeRequest, DriverFuture,
		},
		flows::Vault,
		http::ReqwestHttpClient,
		store::{CredentialStore, MemoryStore},
		trace::{DebugExchange, DebugInfo, ExchangeRequest},
	};

	/// Vault type alias used by reqwest-backed integration tests.
	pub type ReqwestTestVault = Vault<ReqwestHttpClient>;

	/// Constructs a [`Vault`] backed by an in-memory store and the default reqwest transport.
	pub fn build_reqwest_test_vault() -> (ReqwestTestVault, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();

		(Vault::with_http_client(store, ReqwestHttpClient::default()), store_backend)
	}

	/// Scripted [`AuthorizationDriver`] that resolves immediately without a browser.
	pub struct ScriptedDriver {
		outcome: Result<String, AuthorizationError>,
		/// Requests observed by the driver, in order.
		pub seen: Mutex<Vec<AuthorizeRequest>>,
	}
	impl ScriptedDriver {
		/// A driver whose window always captures the provided code.
		pub fn returning_code(code: impl Into<String>) -> Self {
			Self { outcome: Ok(code.into()), seen: Default::default() }
		}

		/// A driver whose window always fails with the provided error.
		pub fn failing_with(error: AuthorizationError) -> Self {
			Self { outcome: Err(error), seen: Default::default() }
		}

		/// The authorization URL of the most recent window, if any was opened.
		pub fn last_authorize_url(&self) -> Option<Url> {
			self.seen.lock().last().map(|request| request.authorize_url.clone())
		}
	}
	impl AuthorizationDriver for ScriptedDriver {
		fn authorize<'a>(
			&'a self,
			request: &'a AuthorizeRequest,
		) -> DriverFuture<'a, AuthorizationReply> {
			self.seen.lock().push(request.clone());

			let trace = navigation_trace(request);
			let outcome = self.outcome.clone();

			Box::pin(async move {
				match outcome {
					Ok(code) => Ok(AuthorizationReply { code, trace }),
					Err(error) => Err(AuthorizationFailure { error, trace }),
				}
			})
		}
	}

	// A single navigation record standing in for the authorization window's trace.
	fn navigation_trace(request: &AuthorizeRequest) -> DebugInfo {
		DebugInfo {
			data: vec![DebugExchange::started(ExchangeRequest {
				url: request.authorize_url.as_str().to_owned(),
				method: "GET".into(),
				headers: Vec::new(),
				body: String::new(),
				timestamp: unix_ms_now(),
			})],
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as Json;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
// The crate depends on itself (with the `test` feature) so integration tests can reach
// `_preludet`; the lib-test target never touches that copy.
#[cfg(test)] use oauth2_vault as _;
