//! Per-exchange debug traces surfaced to callers for timeline inspection.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use serde::Serializer;
// self
use crate::_prelude::*;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates the next monotonic exchange identifier.
pub fn next_request_id() -> u64 {
	NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// HTTP status observed for an exchange; transport failures never reach a status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeStatus {
	/// Status code returned by the token endpoint.
	Code(u16),
	/// No response was received; rendered as `"-"` in traces.
	Unreached,
}
impl ExchangeStatus {
	/// Returns the numeric status code, when a response was received.
	pub fn code(self) -> Option<u16> {
		match self {
			ExchangeStatus::Code(code) => Some(code),
			ExchangeStatus::Unreached => None,
		}
	}
}
impl Display for ExchangeStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			ExchangeStatus::Code(code) => write!(f, "{code}"),
			ExchangeStatus::Unreached => f.write_str("-"),
		}
	}
}
impl Serialize for ExchangeStatus {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			ExchangeStatus::Code(code) => serializer.serialize_u16(*code),
			ExchangeStatus::Unreached => serializer.serialize_str("-"),
		}
	}
}

/// Request snapshot captured at the moment the exchange is dispatched.
#[derive(Clone, Debug, Serialize)]
pub struct ExchangeRequest {
	/// Target URL.
	pub url: String,
	/// HTTP method.
	pub method: String,
	/// Headers as sent, in order.
	pub headers: Vec<(String, String)>,
	/// Form-encoded body string (UTF-8; identical to the bytes on the wire).
	pub body: String,
	/// Dispatch instant in unix milliseconds.
	pub timestamp: i64,
}

/// Wall-clock boundaries of one exchange.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ExchangeTiming {
	/// Dispatch instant in unix milliseconds.
	pub started_at: i64,
	/// Arrival (or failure) instant in unix milliseconds.
	pub completed_at: i64,
	/// Elapsed milliseconds between the two.
	pub duration_ms: i64,
}
impl ExchangeTiming {
	/// Builds a timing span from its boundary instants.
	pub fn between(started_at: i64, completed_at: i64) -> Self {
		Self { started_at, completed_at, duration_ms: completed_at.saturating_sub(started_at) }
	}
}

/// Response snapshot (or synthetic failure record) attached when the exchange resolves.
#[derive(Clone, Debug, Serialize)]
pub struct ExchangeResponse {
	/// Final response URL.
	pub url: String,
	/// HTTP status, or `"-"` when the endpoint was never reached.
	pub status: ExchangeStatus,
	/// Status text, or the transport error class for synthetic records.
	pub status_text: String,
	/// Response headers, in order.
	pub headers: Vec<(String, String)>,
	/// Leniently parsed body; unparsable payloads surface as a JSON string.
	pub data: Json,
	/// Raw body decoded lossily as UTF-8.
	pub raw: String,
	/// Arrival instant in unix milliseconds.
	pub timestamp: i64,
	/// Wall-clock boundaries of the exchange.
	pub timing: ExchangeTiming,
	/// Transport or endpoint error message, when the exchange failed.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// One token-endpoint round-trip (or authorization-window navigation) in a trace.
#[derive(Clone, Debug, Serialize)]
pub struct DebugExchange {
	/// Monotonic exchange identifier.
	pub request_id: u64,
	/// Request snapshot.
	pub request: ExchangeRequest,
	/// Response snapshot; `None` while in flight or when the window produced no response.
	pub response: Option<ExchangeResponse>,
	/// Marks records replayed from cache rather than the network.
	pub from_cache: bool,
	/// Marks exchanges that received a real response.
	pub completed: bool,
}
impl DebugExchange {
	/// Starts a record for a freshly dispatched request.
	pub fn started(request: ExchangeRequest) -> Self {
		Self { request_id: next_request_id(), request, response: None, from_cache: false, completed: false }
	}

	/// Attaches the received response and marks the exchange completed.
	pub fn completed(mut self, response: ExchangeResponse) -> Self {
		self.response = Some(response);
		self.completed = true;

		self
	}

	/// Attaches a synthetic failure response; the exchange stays uncompleted.
	pub fn failed(mut self, response: ExchangeResponse) -> Self {
		self.response = Some(response);

		self
	}
}

/// Ordered trace of exchanges produced during one acquisition.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DebugInfo {
	/// Exchange records in dispatch order.
	pub data: Vec<DebugExchange>,
}
impl DebugInfo {
	/// Returns `true` when no exchange was recorded.
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Appends another trace after the existing records.
	pub fn extend(&mut self, later: DebugInfo) {
		self.data.extend(later.data);
	}
}

/// Append-only collector handed through one acquisition.
///
/// Records are never dropped or reordered; the recorder is consumed into the
/// final [`DebugInfo`] when the acquisition resolves.
#[derive(Debug, Default)]
pub struct TraceRecorder {
	info: DebugInfo,
}
impl TraceRecorder {
	/// Appends a finished exchange record.
	pub fn record(&mut self, exchange: DebugExchange) {
		self.info.data.push(exchange);
	}

	/// Appends every record of another trace (e.g. an authorization-window trace).
	pub fn absorb(&mut self, trace: DebugInfo) {
		self.info.extend(trace);
	}

	/// Returns `true` when nothing has been recorded yet.
	pub fn is_empty(&self) -> bool {
		self.info.is_empty()
	}

	/// Consumes the recorder into the collected trace.
	pub fn into_info(self) -> DebugInfo {
		self.info
	}

	/// Takes the collected trace out of the recorder, leaving it empty.
	///
	/// Used when attaching the trace to an error mid-flow.
	pub fn take_info(&mut self) -> DebugInfo {
		std::mem::take(&mut self.info)
	}
}
