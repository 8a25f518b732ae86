//! Grant orchestrators: one decision tree, parameterised by grant.

// self
use crate::{
	_prelude::*,
	auth::{self, CollectionUid, StoreKey, TokenBundle},
	authorize::{self, AuthorizeRequest},
	config::{GrantConfig, GrantType},
	endpoint::{self, GrantParams},
	error::ConfigError,
	flows::{AuthorizationGrant, CacheDecision, TokenAcquisition, Vault},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	pkce::PkcePair,
	trace::TraceRecorder,
};

impl<C> Vault<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Serves a token via the Authorization Code grant (with PKCE when configured).
	///
	/// Requires an installed [`AuthorizationDriver`](crate::authorize::AuthorizationDriver)
	/// for the fresh-acquisition path; cached and refreshed bundles are served without it.
	pub async fn authorization_code(
		&self,
		config: &GrantConfig,
		collection: &CollectionUid,
		force_fetch: bool,
	) -> Result<TokenAcquisition> {
		self.acquire(
			FlowKind::AuthorizationCode,
			GrantType::AuthorizationCode,
			"authorization_code",
			config,
			collection,
			force_fetch,
		)
		.await
	}

	/// Serves a token via the Client Credentials grant.
	pub async fn client_credentials(
		&self,
		config: &GrantConfig,
		collection: &CollectionUid,
		force_fetch: bool,
	) -> Result<TokenAcquisition> {
		self.acquire(
			FlowKind::ClientCredentials,
			GrantType::ClientCredentials,
			"client_credentials",
			config,
			collection,
			force_fetch,
		)
		.await
	}

	/// Serves a token via the Resource Owner Password Credentials grant.
	pub async fn password_credentials(
		&self,
		config: &GrantConfig,
		collection: &CollectionUid,
		force_fetch: bool,
	) -> Result<TokenAcquisition> {
		self.acquire(
			FlowKind::Password,
			GrantType::Password,
			"password_credentials",
			config,
			collection,
			force_fetch,
		)
		.await
	}

	/// Runs one authorization window and returns the captured code without
	/// exchanging it, for hosts that drive the token exchange themselves.
	pub async fn request_authorization_code(
		&self,
		config: &GrantConfig,
		code_challenge: Option<&str>,
		collection: &CollectionUid,
	) -> Result<AuthorizationGrant> {
		config.ensure_grant(GrantType::AuthorizationCode)?;
		config.validate()?;

		let driver = self.driver.as_ref().ok_or(ConfigError::MissingAuthorizationDriver)?;
		let authorize_url = authorize::build_authorization_url(config, code_challenge)?;
		let request = AuthorizeRequest {
			authorize_url: authorize_url.clone(),
			callback_url: self.required_callback(config)?,
			session: self.sessions.session_id(collection, config.access_token_url.as_str()),
		};

		match driver.authorize(&request).await {
			Ok(reply) =>
				Ok(AuthorizationGrant { code: reply.code, authorize_url, debug: reply.trace }),
			Err(failure) =>
				Err(Error::Authorization { source: failure.error, debug: failure.trace }),
		}
	}

	async fn acquire(
		&self,
		kind: FlowKind,
		grant: GrantType,
		stage: &'static str,
		config: &GrantConfig,
		collection: &CollectionUid,
		force_fetch: bool,
	) -> Result<TokenAcquisition> {
		let span = FlowSpan::new(kind, stage);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result =
			span.instrument(self.acquire_inner(grant, config, collection, force_fetch)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}

	async fn acquire_inner(
		&self,
		grant: GrantType,
		config: &GrantConfig,
		collection: &CollectionUid,
		force_fetch: bool,
	) -> Result<TokenAcquisition> {
		config.ensure_grant(grant)?;
		config.validate()?;

		let key = self.store_key(config, collection);
		let guard = self.flow_guard(&key);
		let _singleflight = guard.lock().await;
		let mut recorder = TraceRecorder::default();

		if !force_fetch {
			let stored = self.store.get(&key).await?;
			let decision = CacheDecision::evaluate(
				stored.is_some(),
				auth::is_expired(stored.as_ref(), auth::unix_ms_now()),
				stored.as_ref().and_then(|bundle| bundle.refresh_token.as_ref()).is_some(),
				config.auto_refresh_token,
				config.auto_fetch_token,
			);

			match decision {
				CacheDecision::CacheHit | CacheDecision::ReturnExpired =>
					return Ok(self.acquisition(config, collection, stored, recorder)),
				CacheDecision::ReturnNone =>
					return Ok(self.acquisition(config, collection, None, recorder)),
				CacheDecision::RefreshAttempt => {
					if let Some(refreshed) =
						self.refresh_exchange(config, &key, &mut recorder).await?
					{
						return Ok(self.acquisition(config, collection, Some(refreshed), recorder));
					}
					// The failed refresh cleared the key; the stale bundle loaded above is all
					// that is left to serve when fetching is disabled.
					if CacheDecision::after_failed_refresh(config.auto_fetch_token)
						== CacheDecision::ReturnExpired
					{
						return Ok(self.acquisition(config, collection, stored, recorder));
					}
				},
				CacheDecision::FreshFetch { clear_first } =>
					if clear_first {
						self.store.clear(&key).await?;
					},
			}
		}

		let credentials = match grant {
			GrantType::AuthorizationCode =>
				self.fresh_authorization_code(config, collection, &key, &mut recorder).await?,
			GrantType::Password =>
				self.complete_exchange(config, GrantParams::Password, &key, &mut recorder).await?,
			_ =>
				self.complete_exchange(config, GrantParams::ClientCredentials, &key, &mut recorder)
					.await?,
		};

		Ok(self.acquisition(config, collection, Some(credentials), recorder))
	}

	async fn fresh_authorization_code(
		&self,
		config: &GrantConfig,
		collection: &CollectionUid,
		key: &StoreKey,
		recorder: &mut TraceRecorder,
	) -> Result<TokenBundle> {
		let driver = self.driver.as_ref().ok_or(ConfigError::MissingAuthorizationDriver)?;
		let pkce = config.pkce.then(PkcePair::generate);
		let request = AuthorizeRequest {
			authorize_url: authorize::build_authorization_url(
				config,
				pkce.as_ref().map(PkcePair::challenge),
			)?,
			callback_url: self.required_callback(config)?,
			session: self.sessions.session_id(collection, config.access_token_url.as_str()),
		};
		let reply = match driver.authorize(&request).await {
			Ok(reply) => reply,
			Err(failure) => {
				recorder.absorb(failure.trace);

				return Err(Error::Authorization {
					source: failure.error,
					debug: recorder.take_info(),
				});
			},
		};

		// The window trace precedes the token-endpoint exchange in the merged timeline.
		recorder.absorb(reply.trace);

		self.complete_exchange(
			config,
			GrantParams::AuthorizationCode {
				code: &reply.code,
				code_verifier: pkce.as_ref().map(PkcePair::verifier),
			},
			key,
			recorder,
		)
		.await
	}

	async fn complete_exchange(
		&self,
		config: &GrantConfig,
		params: GrantParams<'_>,
		key: &StoreKey,
		recorder: &mut TraceRecorder,
	) -> Result<TokenBundle> {
		let outcome = endpoint::exchange(
			self.http_client.as_ref(),
			recorder,
			config,
			params,
			&config.access_token_url,
		)
		.await;

		match outcome {
			Ok(outcome) if outcome.is_success() => {
				let status = outcome.status;
				let body = outcome.body_string();
				let Some(candidate) = outcome.bundle else {
					// A 2xx that is not even a JSON object cannot be served.
					return Err(Error::TokenEndpoint {
						body,
						status: Some(status),
						debug: recorder.take_info(),
					});
				};
				let stored = self.store.put(key, candidate.clone()).await?;

				Ok(stored.unwrap_or(candidate))
			},
			Ok(outcome) => Err(Error::TokenEndpoint {
				body: outcome.body_string(),
				status: Some(outcome.status),
				debug: recorder.take_info(),
			}),
			Err(failure) => Err(Error::TokenEndpoint {
				body: failure.message,
				status: None,
				debug: recorder.take_info(),
			}),
		}
	}

	fn acquisition(
		&self,
		config: &GrantConfig,
		collection: &CollectionUid,
		credentials: Option<TokenBundle>,
		recorder: TraceRecorder,
	) -> TokenAcquisition {
		TokenAcquisition {
			collection: collection.clone(),
			url: config.access_token_url.as_str().to_owned(),
			credentials,
			credentials_id: config.credentials_id.clone(),
			debug: recorder.into_info(),
		}
	}

	fn required_callback(&self, config: &GrantConfig) -> Result<Url, ConfigError> {
		config.callback_url.clone().ok_or(ConfigError::MissingField {
			grant: config.grant.as_str(),
			field: "callback_url",
		})
	}
}
