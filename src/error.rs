//! Crate-level error types shared by the pipeline, the transport, and the PKCE authorizer.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// The request pipeline only returns this type for precondition violations; every expected runtime
/// failure is reduced to [`ErrorInfo`] inside a [`ResultEnvelope`](crate::envelope::ResultEnvelope).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem or precondition violation.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, socket I/O).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Operation did not finish before its deadline.
	#[error("Operation timed out after {after:?}.")]
	Timeout {
		/// Deadline that elapsed.
		after: StdDuration,
	},
	/// Authorization redirect carried a `state` that does not belong to this session.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// User declined the authorization request.
	#[error("Authorization was denied: {reason}.")]
	Denied {
		/// Remote-supplied reason string.
		reason: String,
	},
	/// Remote endpoint answered with a non-success status.
	#[error("Remote endpoint rejected the request: {message}.")]
	Rejected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Remote-supplied message or body preview.
		message: String,
	},
	/// Remote endpoint returned a body that could not be decoded.
	#[error("Remote endpoint returned malformed JSON.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Caller cancelled the operation or dropped its handle.
	#[error("Operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns the structured kind of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) => ErrorKind::Config,
			Self::Transport(_) => ErrorKind::Transport,
			Self::Timeout { .. } => ErrorKind::Timeout,
			Self::StateMismatch => ErrorKind::StateMismatch,
			Self::Denied { .. } => ErrorKind::Denied,
			Self::Rejected { status: Some(401), .. } => ErrorKind::Unauthorized,
			Self::Rejected { .. } => ErrorKind::RemoteRejected,
			Self::Decode { .. } => ErrorKind::DecodeFailure,
			Self::Cancelled => ErrorKind::Cancelled,
		}
	}
}
impl From<&Error> for ErrorInfo {
	fn from(e: &Error) -> Self {
		let info = ErrorInfo::new(e.kind()).with_message(e.to_string());

		match e {
			Error::Rejected { status: Some(status), .. }
			| Error::Decode { status: Some(status), .. } => info.with_status(*status),
			_ => info,
		}
	}
}

/// Configuration and precondition failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Configuration field that failed validation.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured URL uses a scheme other than HTTP(S).
	#[error("The {field} URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Configuration field that failed validation.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// A configured URL cannot act as a base for relative paths.
	#[error("The {field} URL cannot be used as a base: {url}.")]
	NotABase {
		/// Configuration field that failed validation.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// OAuth client identifier failed validation.
	#[error("Client identifier is invalid.")]
	InvalidClientId(#[from] crate::auth::IdentifierError),

	/// A path placeholder has no matching argument.
	#[error("Endpoint `{endpoint}` requires the `{name}` path argument.")]
	MissingPathArgument {
		/// Descriptor name.
		endpoint: &'static str,
		/// Placeholder name.
		name: String,
	},
	/// A path argument has no matching placeholder.
	#[error("Endpoint `{endpoint}` has no `{name}` placeholder.")]
	UnexpectedPathArgument {
		/// Descriptor name.
		endpoint: &'static str,
		/// Argument name.
		name: String,
	},
	/// A path argument would resolve to a `.` or `..` segment and retarget the request.
	#[error("Endpoint `{endpoint}` path argument `{name}` resolves to a dot segment.")]
	DotSegmentArgument {
		/// Descriptor name.
		endpoint: &'static str,
		/// Argument name.
		name: String,
	},
	/// A path template contains an unterminated placeholder.
	#[error("Endpoint `{endpoint}` has a malformed path template.")]
	MalformedTemplate {
		/// Descriptor name.
		endpoint: &'static str,
	},
	/// A body was supplied for an endpoint that declares no body encoding.
	#[error("Endpoint `{endpoint}` does not accept a request body.")]
	UnexpectedBody {
		/// Descriptor name.
		endpoint: &'static str,
	},
	/// A JSON document was supplied for a form-encoded endpoint.
	#[error("Endpoint `{endpoint}` expects form fields, not a JSON document.")]
	BodyEncodingMismatch {
		/// Descriptor name.
		endpoint: &'static str,
	},
	/// Pagination was requested for an endpoint without a cursor declaration.
	#[error("Endpoint `{endpoint}` is not paginated.")]
	NotPaginated {
		/// Descriptor name.
		endpoint: &'static str,
	},
	/// JSON body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the remote endpoint.
	#[error("Request timed out while calling the remote endpoint.")]
	TimedOut {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while talking to the remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timed_out(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::TimedOut { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timed_out(e) } else { Self::network(e) }
	}
}
impl From<&TransportError> for ErrorInfo {
	fn from(e: &TransportError) -> Self {
		let kind = match e {
			TransportError::TimedOut { .. } => ErrorKind::Timeout,
			_ => ErrorKind::Transport,
		};
		let message = match StdError::source(e) {
			Some(source) => format!("{e} {source}"),
			None => e.to_string(),
		};

		ErrorInfo::new(kind).with_message(message)
	}
}

/// Structured failure categories surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Connection, DNS, or TLS failure.
	Transport,
	/// Deadline elapsed.
	Timeout,
	/// Token missing for a scoped endpoint, or rejected by the remote side.
	Unauthorized,
	/// Non-success status with an optional structured body.
	RemoteRejected,
	/// Body present but not parseable as the expected shape.
	DecodeFailure,
	/// PKCE `state` did not round-trip.
	StateMismatch,
	/// User declined authorization.
	Denied,
	/// No matching data; only produced by accessors that require an item.
	NoData,
	/// Caller cancelled the operation.
	Cancelled,
	/// Local configuration problem or precondition violation.
	Config,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Transport => "transport",
			Self::Timeout => "timeout",
			Self::Unauthorized => "unauthorized",
			Self::RemoteRejected => "remote_rejected",
			Self::DecodeFailure => "decode_failure",
			Self::StateMismatch => "state_mismatch",
			Self::Denied => "denied",
			Self::NoData => "no_data",
			Self::Cancelled => "cancelled",
			Self::Config => "config",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cloneable failure description carried by [`ResultEnvelope::Fail`](crate::envelope::ResultEnvelope::Fail).
///
/// Additional fields may be added in future releases, so downstream code should read fields by name
/// and construct values through the provided helpers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorInfo {
	/// Failure category.
	pub kind: ErrorKind,
	/// HTTP status code, when the remote side answered.
	pub status: Option<u16>,
	/// Remote- or crate-supplied message.
	pub message: Option<String>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}
impl ErrorInfo {
	/// Creates an error of the provided kind without status or message.
	pub fn new(kind: ErrorKind) -> Self {
		Self { kind, status: None, message: None, retry_after: None }
	}

	/// Failure raised before any network call because a scoped endpoint received no token.
	pub fn missing_token(endpoint: &str) -> Self {
		Self::new(ErrorKind::Unauthorized)
			.with_message(format!("Endpoint `{endpoint}` requires an access token."))
	}

	/// Attaches an HTTP status code.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Attaches a message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}
}
impl Display for ErrorInfo {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.kind.as_str())?;

		if let Some(status) = self.status {
			write!(f, " (HTTP {status})")?;
		}
		if let Some(message) = &self.message {
			write!(f, ": {message}")?;
		}

		Ok(())
	}
}
impl StdError for ErrorInfo {}
