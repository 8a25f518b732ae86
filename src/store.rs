//! Storage contracts and built-in store implementations for credential bundles.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{StoreKey, TokenBundle, unix_ms_now},
};

/// Boxed store future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for credential bundles, addressed by [`StoreKey`].
///
/// Implementations serialise access per key and persist atomically; `get` on a
/// missing key yields `None` rather than an error, and `clear` is idempotent.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the bundle stored at `key`, if present.
	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenBundle>>;

	/// Admits a bundle at `key`, stamping `created_at` at receipt.
	///
	/// Inadmissible bundles (no access token, or an `error` field) are ignored.
	/// Returns the bundle as stored, or `None` when admission was refused.
	fn put<'a>(&'a self, key: &'a StoreKey, bundle: TokenBundle)
	-> StoreFuture<'a, Option<TokenBundle>>;

	/// Removes any bundle at `key`; adjacent keys are unaffected.
	fn clear<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, ()>;
}

/// Applies the admission rule shared by every store backend.
///
/// Refuses bundles without a non-empty access token or with an `error` field;
/// otherwise stamps `created_at` with the current instant, overwriting any
/// prior stamp.
pub fn admit(mut bundle: TokenBundle) -> Option<TokenBundle> {
	if !bundle.is_admissible() {
		return None;
	}

	bundle.stamp_created_at(unix_ms_now());

	Some(bundle)
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
