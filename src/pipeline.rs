//! Request pipeline: prepares, executes, and reduces calls described by
//! [`EndpointDescriptor`] values.
//!
//! [`RequestPipeline::execute`] only returns `Err` for precondition violations (arguments that do
//! not fit the descriptor). Every runtime failure, including transport errors, non-success statuses,
//! and undecodable bodies, is reduced to a [`ResultEnvelope`].

mod paginate;
mod reduce;

pub use paginate::Pages;

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::ClientConfig,
	endpoint::{self, BodyEncoding, EndpointDescriptor, ResponseShape},
	envelope::ResultEnvelope,
	error::{ConfigError, ErrorInfo, ErrorKind},
	obs::{self, OpSpan, OperationKind, OperationOutcome},
	transport::{
		ApiTransport, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HEADER_USER_AGENT,
		PreparedRequest,
	},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_NDJSON: &str = "application/x-ndjson";

/// Executes endpoint calls against a shared transport.
///
/// Cloning is cheap; clones share the transport (and therefore its connection pool) and the
/// configuration.
pub struct RequestPipeline<T>
where
	T: ApiTransport,
{
	transport: Arc<T>,
	config: Arc<ClientConfig>,
}
#[cfg(feature = "reqwest")]
impl RequestPipeline<ReqwestTransport> {
	/// Builds a pipeline backed by a reqwest client derived from `config`.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self { transport: Arc::new(transport), config: Arc::new(config) })
	}
}
impl<T> RequestPipeline<T>
where
	T: ApiTransport,
{
	/// Builds a pipeline around a caller-provided transport.
	pub fn with_transport(config: &ClientConfig, transport: Arc<T>) -> Self {
		Self { transport, config: Arc::new(config.clone()) }
	}

	/// Configuration the pipeline resolves paths against.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Shared transport handle.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Resolves `descriptor` and `args` into a request without sending it.
	///
	/// A supplied token is always attached, even for unscoped descriptors.
	pub fn prepare(
		&self,
		descriptor: &EndpointDescriptor,
		args: &RequestArgs,
		token: Option<&AccessToken>,
	) -> Result<PreparedRequest, ConfigError> {
		let mut url = endpoint::resolve_url(&self.config.api, descriptor, &args.path)?;

		if !args.query.is_empty() {
			url.query_pairs_mut().extend_pairs(args.query.iter());
		}

		let streaming = descriptor.shape == ResponseShape::Stream;
		let mut request = PreparedRequest::new(descriptor.method, url)
			.with_header(HEADER_ACCEPT, if streaming { ACCEPT_NDJSON } else { ACCEPT_JSON })
			.with_header(HEADER_USER_AGENT, self.config.user_agent.as_str());

		if let Some(token) = token {
			request = request.with_header(HEADER_AUTHORIZATION, token.bearer());
		}
		if let Some((encoding, body)) = encode_body(descriptor, args.body.as_ref())? {
			request = request.with_header(HEADER_CONTENT_TYPE, encoding.content_type());
			request.body = Some(body);
		}

		request.timeout = if streaming { None } else { self.config.request_timeout };

		Ok(request)
	}

	/// Executes one call and reduces its outcome.
	///
	/// A scoped descriptor called without a token yields `Fail(Unauthorized)` without touching the
	/// transport.
	pub async fn execute<R>(
		&self,
		descriptor: &EndpointDescriptor,
		args: RequestArgs,
		token: Option<&AccessToken>,
	) -> Result<ResultEnvelope<R>>
	where
		R: 'static + Send + DeserializeOwned,
	{
		let kind = match descriptor.shape {
			ResponseShape::Stream => OperationKind::Stream,
			ResponseShape::Single | ResponseShape::List => OperationKind::Request,
		};

		self.execute_as(kind, descriptor, &args, token).await
	}

	/// Lazily walks a cursor-paginated endpoint, one call per page.
	///
	/// Each page is decoded into `R` as a single document. Iteration stops after the last page
	/// (absent or `null` cursor), after an empty page response, or right after yielding a failure.
	pub fn paginate<R>(
		&self,
		descriptor: &EndpointDescriptor,
		args: RequestArgs,
		token: Option<AccessToken>,
	) -> Result<Pages<R>>
	where
		R: 'static + Send + DeserializeOwned,
	{
		let pagination =
			descriptor.pagination.ok_or(ConfigError::NotPaginated { endpoint: descriptor.name })?;

		// Surface template problems now rather than as the first page's error.
		self.prepare(descriptor, &args, token.as_ref())?;

		Ok(Pages::new(self.clone(), *descriptor, pagination, args, token))
	}

	async fn execute_as<R>(
		&self,
		kind: OperationKind,
		descriptor: &EndpointDescriptor,
		args: &RequestArgs,
		token: Option<&AccessToken>,
	) -> Result<ResultEnvelope<R>>
	where
		R: 'static + Send + DeserializeOwned,
	{
		let request = self.prepare(descriptor, args, token)?;

		if descriptor.scope.is_some() && token.is_none() {
			obs::record_failure(kind, ErrorKind::Unauthorized);

			return Ok(ResultEnvelope::Fail(ErrorInfo::missing_token(descriptor.name)));
		}

		let span = OpSpan::new(kind, descriptor.name);

		obs::record_outcome(kind, OperationOutcome::Attempt);

		let envelope = span
			.instrument(async {
				match self.transport.send(request).await {
					Ok(response) => reduce::reduce(descriptor, response).await,
					Err(e) => ResultEnvelope::Fail(ErrorInfo::from(&e)),
				}
			})
			.await;
		match &envelope {
			ResultEnvelope::One(_) | ResultEnvelope::Many(_) =>
				obs::record_outcome(kind, OperationOutcome::Success),
			ResultEnvelope::NoneMatch => obs::record_outcome(kind, OperationOutcome::Empty),
			ResultEnvelope::Fail(info) => obs::record_failure(kind, info.kind),
		}

		Ok(envelope)
	}
}
impl<T> Clone for RequestPipeline<T>
where
	T: ApiTransport,
{
	fn clone(&self) -> Self {
		Self { transport: self.transport.clone(), config: self.config.clone() }
	}
}
impl<T> Debug for RequestPipeline<T>
where
	T: ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline").field("api", &self.config.api.as_str()).finish_non_exhaustive()
	}
}

/// Per-call arguments: path placeholder values, query parameters, and an optional body.
#[derive(Clone, Debug, Default)]
pub struct RequestArgs {
	path: Vec<(String, String)>,
	query: Vec<(String, String)>,
	body: Option<RequestBody>,
}
impl RequestArgs {
	/// Creates empty arguments.
	pub fn new() -> Self {
		Self::default()
	}

	/// Supplies the value for the `{name}` path placeholder.
	pub fn path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.path.push((name.into(), value.into()));

		self
	}

	/// Appends a query parameter; repeated names are sent repeatedly.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Appends a form field, switching the body to form fields if none is set yet.
	pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		match &mut self.body {
			Some(RequestBody::Form(fields)) => fields.push((name.into(), value.into())),
			body => *body = Some(RequestBody::Form(vec![(name.into(), value.into())])),
		}

		self
	}

	/// Sets a JSON document as the body.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(RequestBody::Json(serde_json::to_value(body)?));

		Ok(self)
	}

	/// Replaces the body.
	pub fn body(mut self, body: RequestBody) -> Self {
		self.body = Some(body);

		self
	}

	/// Sets `name` to `value`, replacing any earlier values for the same parameter.
	pub fn set_query(&mut self, name: &str, value: impl Into<String>) {
		self.query.retain(|(key, _)| key != name);
		self.query.push((name.to_owned(), value.into()));
	}
}

/// Request body supplied through [`RequestArgs`].
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// Form fields; encoded as a JSON object of strings for JSON endpoints.
	Form(Vec<(String, String)>),
	/// JSON document; rejected by form endpoints.
	Json(serde_json::Value),
}

fn encode_body(
	descriptor: &EndpointDescriptor,
	body: Option<&RequestBody>,
) -> Result<Option<(BodyEncoding, Vec<u8>)>, ConfigError> {
	let Some(body) = body else { return Ok(None) };
	let Some(encoding) = descriptor.body else {
		return Err(ConfigError::UnexpectedBody { endpoint: descriptor.name });
	};
	let bytes = match (encoding, body) {
		(BodyEncoding::Form, RequestBody::Form(fields)) =>
			url::form_urlencoded::Serializer::new(String::new())
				.extend_pairs(fields.iter())
				.finish()
				.into_bytes(),
		(BodyEncoding::Form, RequestBody::Json(_)) =>
			return Err(ConfigError::BodyEncodingMismatch { endpoint: descriptor.name }),
		(BodyEncoding::Json, RequestBody::Form(fields)) => {
			let object = fields
				.iter()
				.map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
				.collect::<serde_json::Map<_, _>>();

			serde_json::to_vec(&object)?
		},
		(BodyEncoding::Json, RequestBody::Json(value)) => serde_json::to_vec(value)?,
	};

	Ok(Some((encoding, bytes)))
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::Scope,
		endpoint::{EmptyBody, HttpMethod},
		error::{ErrorKind, TransportError},
		transport::{RawResponse, TransportFuture},
	};

	/// Transport answering every request with a canned status and body.
	struct CannedTransport {
		status: u16,
		body: &'static str,
		calls: AtomicUsize,
		last: Mutex<Option<PreparedRequest>>,
	}
	impl CannedTransport {
		fn new(status: u16, body: &'static str) -> Arc<Self> {
			Arc::new(Self { status, body, calls: AtomicUsize::new(0), last: Mutex::new(None) })
		}
	}
	impl ApiTransport for CannedTransport {
		fn send(&self, request: PreparedRequest) -> TransportFuture<'_, RawResponse> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			*self.last.lock() = Some(request);

			Box::pin(async move { Ok(RawResponse::from_bytes(self.status, self.body)) })
		}
	}

	/// Transport that always fails before a response arrives.
	struct BrokenTransport;
	impl ApiTransport for BrokenTransport {
		fn send(&self, _: PreparedRequest) -> TransportFuture<'_, RawResponse> {
			Box::pin(async { Err(TransportError::from(std::io::Error::other("connection refused"))) })
		}
	}

	#[derive(Debug, PartialEq, Deserialize)]
	struct Channel {
		user: String,
	}

	const PROFILE: EndpointDescriptor = EndpointDescriptor::get("test.profile", "/api/user/{username}");
	const ACCOUNT: EndpointDescriptor =
		EndpointDescriptor::get("test.account", "/api/account").scope(Scope::PreferenceRead);
	const DECLINE: EndpointDescriptor =
		EndpointDescriptor::post("test.decline", "/api/challenge/{challengeId}/decline");

	fn config() -> ClientConfig {
		ClientConfig::builder()
			.site("https://lichess.org")
			.user_agent("rookline-unit")
			.build()
			.expect("Test configuration should build.")
	}

	fn pipeline<T: ApiTransport>(transport: Arc<T>) -> RequestPipeline<T> {
		RequestPipeline::with_transport(&config(), transport)
	}

	#[test]
	fn prepare_resolves_headers_query_and_form_body() {
		let pipeline = pipeline(CannedTransport::new(200, "{}"));
		let token = AccessToken::new("lip_abc");
		let args = RequestArgs::new()
			.path("challengeId", "xyz")
			.query("opponentToken", "a b")
			.form("reason", "later");
		let request =
			pipeline.prepare(&DECLINE, &args, Some(&token)).expect("Arguments fit the descriptor.");

		assert_eq!(request.method, HttpMethod::Post);
		assert_eq!(
			request.url.as_str(),
			"https://lichess.org/api/challenge/xyz/decline?opponentToken=a+b"
		);
		assert_eq!(request.header("authorization"), Some("Bearer lip_abc"));
		assert_eq!(request.header("accept"), Some(ACCEPT_JSON));
		assert_eq!(request.header("user-agent"), Some("rookline-unit"));
		assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
		assert_eq!(request.body_text(), Some("reason=later"));
		assert!(request.timeout.is_some());
	}

	#[test]
	fn streams_ask_for_ndjson_without_deadline() {
		let pipeline = pipeline(CannedTransport::new(200, ""));
		let stream = EndpointDescriptor::get("test.stream", "/api/stream/event").stream();
		let request =
			pipeline.prepare(&stream, &RequestArgs::new(), None).expect("Static path should resolve.");

		assert_eq!(request.header("accept"), Some(ACCEPT_NDJSON));
		assert_eq!(request.timeout, None);
		assert_eq!(request.header("authorization"), None);
	}

	#[test]
	fn body_mismatches_are_precondition_errors() {
		let pipeline = pipeline(CannedTransport::new(200, "{}"));
		let json_args = RequestArgs::new()
			.path("challengeId", "xyz")
			.json(&serde_json::json!({ "reason": "later" }))
			.expect("JSON value should serialize.");
		let err = pipeline.prepare(&DECLINE, &json_args, None).expect_err("JSON on form must fail.");

		assert!(matches!(err, ConfigError::BodyEncodingMismatch { endpoint: "test.decline" }));

		let args = RequestArgs::new().path("username", "bob").form("x", "y");
		let err = pipeline.prepare(&PROFILE, &args, None).expect_err("Body on GET must fail.");

		assert!(matches!(err, ConfigError::UnexpectedBody { endpoint: "test.profile" }));

		let put = EndpointDescriptor::put("test.put", "/api/thing");
		let request = pipeline
			.prepare(&put, &RequestArgs::new().form("name", "value"), None)
			.expect("Form fields on a JSON endpoint are encoded as an object.");

		assert_eq!(request.body_text(), Some(r#"{"name":"value"}"#));
	}

	#[tokio::test]
	async fn scoped_calls_without_token_never_reach_the_transport() {
		let transport = CannedTransport::new(200, "{}");
		let pipeline = pipeline(transport.clone());
		let envelope = pipeline
			.execute::<serde_json::Value>(&ACCOUNT, RequestArgs::new(), None)
			.await
			.expect("Arguments fit the descriptor.");

		assert_eq!(envelope.error().map(|e| e.kind), Some(ErrorKind::Unauthorized));
		assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn precondition_errors_are_returned_as_err() {
		let transport = CannedTransport::new(200, "{}");
		let pipeline = pipeline(transport.clone());
		let err = pipeline
			.execute::<serde_json::Value>(&PROFILE, RequestArgs::new(), None)
			.await
			.expect_err("Missing placeholder must fail.");

		assert_eq!(err.kind(), ErrorKind::Config);
		assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn transport_failures_become_fail_envelopes() {
		let pipeline = pipeline(Arc::new(BrokenTransport));
		let envelope = pipeline
			.execute::<Channel>(&PROFILE, RequestArgs::new().path("username", "bob"), None)
			.await
			.expect("Arguments fit the descriptor.");

		assert_eq!(envelope.error().map(|e| e.kind), Some(ErrorKind::Transport));
	}

	#[tokio::test]
	async fn empty_bodies_follow_the_descriptor_policy() {
		let absent = pipeline(CannedTransport::new(204, ""));
		let envelope = absent
			.execute::<Option<Channel>>(&PROFILE, RequestArgs::new().path("username", "bob"), None)
			.await
			.expect("Arguments fit the descriptor.");

		assert!(envelope.is_none_match());

		let null = pipeline(CannedTransport::new(200, "  "));
		let descriptor = PROFILE.empty_body(EmptyBody::Null);
		let envelope = null
			.execute::<Option<Channel>>(&descriptor, RequestArgs::new().path("username", "bob"), None)
			.await
			.expect("Arguments fit the descriptor.");

		assert_eq!(envelope.ok(), Some(None));
	}

	#[test]
	fn pagination_requires_a_cursor_declaration() {
		let pipeline = pipeline(CannedTransport::new(200, "{}"));
		let err = pipeline
			.paginate::<serde_json::Value>(&ACCOUNT, RequestArgs::new(), None)
			.expect_err("Unpaginated descriptor must fail.");

		assert_eq!(err.kind(), ErrorKind::Config);
	}
}
