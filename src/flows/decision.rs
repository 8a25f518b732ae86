//! The cache decision tree shared by every grant orchestrator, as a pure function.

/// What an orchestrator does with the cached state before (or instead of) going
/// to the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheDecision {
	/// A fresh bundle is cached; serve it without touching the network.
	CacheHit,
	/// The cached bundle expired but carries a refresh token; try refreshing.
	RefreshAttempt,
	/// Perform a full fresh acquisition.
	FreshFetch {
		/// Remove the stale bundle before acquiring.
		clear_first: bool,
	},
	/// Serve the expired bundle verbatim; the caller opted out of recovery.
	ReturnExpired,
	/// Nothing cached and fetching disabled; serve nothing.
	ReturnNone,
}
impl CacheDecision {
	/// Computes the decision from the cached state and the caller's auto flags.
	///
	/// `force_fetch` is handled upstream: callers skip the store read entirely
	/// and go straight to a fresh acquisition.
	pub fn evaluate(
		stored_present: bool,
		expired: bool,
		has_refresh_token: bool,
		auto_refresh_token: bool,
		auto_fetch_token: bool,
	) -> Self {
		if !stored_present {
			return if auto_fetch_token {
				CacheDecision::FreshFetch { clear_first: false }
			} else {
				CacheDecision::ReturnNone
			};
		}
		if !expired {
			return CacheDecision::CacheHit;
		}
		if auto_refresh_token && has_refresh_token {
			return CacheDecision::RefreshAttempt;
		}
		if auto_fetch_token {
			return CacheDecision::FreshFetch { clear_first: true };
		}

		CacheDecision::ReturnExpired
	}

	/// Follow-up decision after [`CacheDecision::RefreshAttempt`] failed.
	///
	/// The failed refresh has already cleared the stored bundle, so a fresh
	/// fetch needs no additional clear.
	pub fn after_failed_refresh(auto_fetch_token: bool) -> Self {
		if auto_fetch_token {
			CacheDecision::FreshFetch { clear_first: false }
		} else {
			CacheDecision::ReturnExpired
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use CacheDecision::*;

	#[test]
	fn decision_matrix_matches_the_tree() {
		// (stored, expired, has_refresh, auto_refresh, auto_fetch) → decision
		let table = [
			// Nothing stored: only auto_fetch matters.
			((false, false, false, false, false), ReturnNone),
			((false, false, false, false, true), FreshFetch { clear_first: false }),
			((false, true, true, true, true), FreshFetch { clear_first: false }),
			((false, true, true, true, false), ReturnNone),
			// Fresh bundle: always a cache hit.
			((true, false, false, false, false), CacheHit),
			((true, false, true, true, true), CacheHit),
			// Expired with refresh token and auto_refresh: attempt the refresh.
			((true, true, true, true, false), RefreshAttempt),
			((true, true, true, true, true), RefreshAttempt),
			// Expired, auto_refresh set but no refresh token: auto_fetch decides.
			((true, true, false, true, true), FreshFetch { clear_first: true }),
			((true, true, false, true, false), ReturnExpired),
			// Expired without auto_refresh: auto_fetch decides.
			((true, true, true, false, true), FreshFetch { clear_first: true }),
			((true, true, false, false, true), FreshFetch { clear_first: true }),
			((true, true, true, false, false), ReturnExpired),
			((true, true, false, false, false), ReturnExpired),
		];

		for ((stored, expired, has_refresh, auto_refresh, auto_fetch), expected) in table {
			assert_eq!(
				CacheDecision::evaluate(stored, expired, has_refresh, auto_refresh, auto_fetch),
				expected,
				"evaluate({stored}, {expired}, {has_refresh}, {auto_refresh}, {auto_fetch})",
			);
		}
	}

	#[test]
	fn failed_refresh_falls_through_or_returns_expired() {
		assert_eq!(
			CacheDecision::after_failed_refresh(true),
			FreshFetch { clear_first: false },
			"The refresh already cleared the store; no second clear.",
		);
		assert_eq!(CacheDecision::after_failed_refresh(false), ReturnExpired);
	}
}
