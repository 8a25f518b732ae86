//! Per-(collection, token-url) browser session isolation for the authorization driver.

// std
use std::fmt::Write;
// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::CollectionUid};

const SESSION_ID_LEN: usize = 32;

/// Opaque identifier scoping cookies/storage of one authorization surface.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);
impl SessionId {
	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for SessionId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for SessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Session({})", self.0)
	}
}
impl Display for SessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Allocates stable session identifiers per (collection, token-url) pair.
///
/// Identifiers are derived deterministically, so returning to the same token
/// endpoint under the same collection reuses cookies and login state across
/// process restarts, while distinct endpoints or collections stay isolated.
#[derive(Debug, Default)]
pub struct SessionManager {
	table: Mutex<HashMap<(CollectionUid, String), SessionId>>,
}
impl SessionManager {
	/// Returns the session identifier for the pair, allocating it on first access.
	pub fn session_id(&self, collection: &CollectionUid, token_url: &str) -> SessionId {
		let mut table = self.table.lock();

		table
			.entry((collection.clone(), token_url.to_owned()))
			.or_insert_with(|| derive_session_id(collection, token_url))
			.clone()
	}
}

fn derive_session_id(collection: &CollectionUid, token_url: &str) -> SessionId {
	let mut hasher = Sha256::new();

	hasher.update(collection.as_ref().as_bytes());
	hasher.update(b"\n");
	hasher.update(token_url.as_bytes());

	let digest = hasher.finalize();
	let mut rendered = String::with_capacity(SESSION_ID_LEN);

	for byte in digest.iter().take(SESSION_ID_LEN / 2) {
		let _ = write!(rendered, "{byte:02x}");
	}

	SessionId(rendered)
}
