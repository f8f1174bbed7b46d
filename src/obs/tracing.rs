// self
use crate::{_prelude::*, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// Span wrapper used by the pipeline and the authorizer.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the operation kind and endpoint name.
	pub fn new(kind: OperationKind, endpoint: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("rookline.op", op = kind.as_str(), endpoint);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, endpoint);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the once-per-stream warning for a skipped NDJSON line.
pub fn warn_malformed_line(endpoint: &'static str, line: u64, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			endpoint,
			line,
			error = %error,
			"Skipping malformed stream line; further ones are only counted."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, line, error);
	}
}

/// Emits a debug event describing a PKCE session state transition.
pub fn trace_transition(from: &'static str, to: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(from, to, "PKCE session transitioned.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (from, to);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn helpers_noop_without_tracing() {
		let _span = OpSpan::new(OperationKind::Request, "test");

		warn_malformed_line("test", 2, &std::io::Error::other("bad line"));
		trace_transition("awaiting_redirect", "code_received");
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(OperationKind::Page, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
