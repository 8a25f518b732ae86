//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{StoreKey, TokenBundle},
	store::{self, CredentialStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, TokenBundle>>>;

/// Thread-safe storage backend that keeps bundles in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Inserts a bundle verbatim, bypassing admission.
	///
	/// Intended for seeding fixtures and migrating snapshots; `created_at` is
	/// left exactly as provided.
	pub fn insert_raw(&self, key: StoreKey, bundle: TokenBundle) {
		self.0.write().insert(key, bundle);
	}

	/// Number of stored bundles.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: &StoreMap, key: &StoreKey) -> Option<TokenBundle> {
		map.read().get(key).cloned()
	}

	fn put_now(map: &StoreMap, key: StoreKey, bundle: TokenBundle) -> Option<TokenBundle> {
		let admitted = store::admit(bundle)?;

		map.write().insert(key, admitted.clone());

		Some(admitted)
	}

	fn clear_now(map: &StoreMap, key: &StoreKey) {
		map.write().remove(key);
	}
}
impl CredentialStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenBundle>> {
		let map = self.0.clone();
		let key = key.clone();

		Box::pin(async move { Ok(Self::get_now(&map, &key)) })
	}

	fn put<'a>(
		&'a self,
		key: &'a StoreKey,
		bundle: TokenBundle,
	) -> StoreFuture<'a, Option<TokenBundle>> {
		let map = self.0.clone();
		let key = key.clone();

		Box::pin(async move { Ok(Self::put_now(&map, key, bundle)) })
	}

	fn clear<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.clone();

		Box::pin(async move {
			Self::clear_now(&map, &key);

			Ok(())
		})
	}
}
