// self
use crate::{
	error::ErrorKind,
	obs::{OperationKind, OperationOutcome},
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"rookline_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a failed operation, labeling `rookline_op_failures_total` with the error class.
pub fn record_failure(kind: OperationKind, error: ErrorKind) {
	record_outcome(kind, OperationOutcome::Failure);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"rookline_op_failures_total",
			"op" => kind.as_str(),
			"error" => error.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = error;
	}
}
