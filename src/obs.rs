//! Optional observability helpers for pipeline calls and authorization sessions.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `rookline.op` with the `op` (operation kind)
//!   and `endpoint` (descriptor name) fields, plus a single `warn` event per stream that skips a
//!   malformed line.
//! - Enable `metrics` to increment the `rookline_op_total` counter for every
//!   attempt/success/empty/failure, labeled by `op` + `outcome`; failures also increment
//!   `rookline_op_failures_total`, labeled by `op` + `error` (the [`ErrorKind`](crate::error::ErrorKind)).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Buffered single or list request.
	Request,
	/// NDJSON stream request.
	Stream,
	/// One page of a paginated sequence.
	Page,
	/// PKCE authorization session.
	Authorization,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Request => "request",
			OperationKind::Stream => "stream",
			OperationKind::Page => "page",
			OperationKind::Authorization => "authorization",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Data (or a token) was produced.
	Success,
	/// The call succeeded without matching data.
	Empty,
	/// Failure reported back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Empty => "empty",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
