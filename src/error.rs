//! Vault-level error types shared across flows, the token endpoint client, and stores.

// self
use crate::{_prelude::*, authorize::AuthorizationError, trace::DebugInfo};

/// Vault-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical vault error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The authorization window failed before an authorization code was captured.
	#[error("{source}")]
	Authorization {
		/// Underlying authorization-window failure.
		#[source]
		source: AuthorizationError,
		/// Authorization-window trace collected up to the failure.
		debug: DebugInfo,
	},
	/// The token endpoint rejected the exchange or could not be reached.
	#[error("Token endpoint rejected the exchange: {body}")]
	TokenEndpoint {
		/// Stringified response body (or transport failure message).
		body: String,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Exchange trace collected during the acquisition, synthetic records included.
		debug: DebugInfo,
	},
}
impl Error {
	/// Returns the exchange trace attached to the error, when one was collected.
	pub fn debug_info(&self) -> Option<&DebugInfo> {
		match self {
			Error::Authorization { debug, .. } | Error::TokenEndpoint { debug, .. } => Some(debug),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the vault.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A grant-specific required field was not provided.
	#[error("The {grant} grant requires the {field} field.")]
	MissingField {
		/// Grant label.
		grant: &'static str,
		/// Missing field name.
		field: &'static str,
	},
	/// The client identifier was empty.
	#[error("Client identifier cannot be empty.")]
	EmptyClientId,
	/// An identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// The configuration carries a different grant than the invoked operation.
	#[error("Expected a {expected} grant configuration, found {found}.")]
	GrantMismatch {
		/// Grant label the operation requires.
		expected: &'static str,
		/// Grant label carried by the configuration.
		found: &'static str,
	},
	/// The vault has no authorization driver installed.
	#[error("No authorization driver is installed on the vault.")]
	MissingAuthorizationDriver,
}

/// Transport-level failures (network, IO, timeouts).
///
/// Never surfaced directly by flow APIs: the token endpoint client records a
/// synthetic exchange and converts the failure into [`Error::TokenEndpoint`].
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the transport's timeout.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Stable error class label used as the status text of synthetic exchange records.
	pub fn class(&self) -> &'static str {
		match self {
			TransportError::Network { .. } => "NETWORK_ERROR",
			TransportError::Timeout => "TIMEOUT",
			TransportError::Io(_) => "IO_ERROR",
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
