//! Refresh engine: exchange a refresh token for a new bundle, clearing the key on failure.
//!
//! Refresh failures never propagate. A failed exchange (transport error, non-2xx
//! status, or an `error` field in the body) clears the stored bundle and yields
//! `None`; the orchestrator's decision tree picks what happens next. When the
//! provider omits the rotated `refresh_token` in a successful response, the
//! previous refresh token is preserved so the bundle stays refreshable.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CollectionUid, StoreKey, TokenBundle, TokenSecret},
	config::GrantConfig,
	endpoint::{self, GrantParams},
	error::ConfigError,
	flows::{TokenAcquisition, Vault},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	trace::TraceRecorder,
};

impl<C> Vault<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Performs a standalone refresh_token exchange for the configured credential.
	///
	/// `credentials` is `None` when no refresh token was stored or the exchange
	/// failed; in both cases the stored bundle has been cleared.
	pub async fn refresh_token(
		&self,
		config: &GrantConfig,
		collection: &CollectionUid,
	) -> Result<TokenAcquisition> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if config.client_id.is_empty() {
					return Err(ConfigError::EmptyClientId.into());
				}

				let key = self.store_key(config, collection);
				let guard = self.flow_guard(&key);
				let _singleflight = guard.lock().await;
				let mut recorder = TraceRecorder::default();
				let credentials = self.refresh_exchange(config, &key, &mut recorder).await?;

				Ok(TokenAcquisition {
					collection: collection.clone(),
					url: config.refresh_url().as_str().to_owned(),
					credentials,
					credentials_id: config.credentials_id.clone(),
					debug: recorder.into_info(),
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Engine shared with the orchestrators; assumes the singleflight guard is held.
	pub(crate) async fn refresh_exchange(
		&self,
		config: &GrantConfig,
		key: &StoreKey,
		recorder: &mut TraceRecorder,
	) -> Result<Option<TokenBundle>> {
		self.refresh_metrics.record_attempt();

		let stored = self.store.get(key).await?;
		let Some(refresh_token) = stored
			.as_ref()
			.and_then(|bundle| bundle.refresh_token.as_ref())
			.map(|secret| secret.expose().to_owned())
		else {
			self.store.clear(key).await?;
			self.refresh_metrics.record_failure();

			return Ok(None);
		};
		let outcome = endpoint::exchange(
			self.http_client.as_ref(),
			recorder,
			config,
			GrantParams::RefreshToken { refresh_token: &refresh_token },
			config.refresh_url(),
		)
		.await;
		let refreshed = match outcome {
			Ok(outcome) if outcome.is_success() =>
				outcome.bundle.filter(TokenBundle::is_admissible),
			_ => None,
		};
		let Some(mut bundle) = refreshed else {
			self.store.clear(key).await?;
			self.refresh_metrics.record_failure();

			return Ok(None);
		};

		if bundle.refresh_token.is_none() {
			bundle.refresh_token = Some(TokenSecret::new(refresh_token));
		}

		let stored = self.store.put(key, bundle.clone()).await?;

		self.refresh_metrics.record_success();

		Ok(Some(stored.unwrap_or(bundle)))
	}
}
