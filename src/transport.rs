//! Transport primitives shared by the request pipeline and the PKCE token exchange.
//!
//! [`ApiTransport`] is the crate's only dependency on an HTTP stack. The pipeline hands it a fully
//! resolved [`PreparedRequest`] and receives a [`RawResponse`] whose body is exposed as a chunk
//! stream, so buffered and NDJSON responses share a single code path. Implementations report
//! connection-level failures as [`TransportError`] and leave status interpretation to the caller.

// crates.io
use futures::{Stream, StreamExt, stream};
#[cfg(feature = "reqwest")] use reqwest::header::RETRY_AFTER;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, endpoint::HttpMethod, error::TransportError};
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::ConfigError};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Response body delivered as a sequence of raw chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Abstraction over HTTP stacks able to execute [`PreparedRequest`] values.
///
/// Implementations must be `Send + Sync + 'static` so a single instance can back many pipeline
/// clones and authorization sessions at once. The returned body stream must own everything it needs;
/// it outlives the `send` call and is polled from whichever task consumes the result.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues `request` and resolves once the status line and headers are available.
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_, RawResponse>;
}

/// Fully resolved HTTP request, owned by the call that built it.
#[derive(Clone)]
pub struct PreparedRequest {
	/// HTTP verb.
	pub method: HttpMethod,
	/// Absolute URL including the encoded query string.
	pub url: Url,
	/// Header name/value pairs; names are lowercase.
	pub headers: Vec<(&'static str, String)>,
	/// Encoded request body.
	pub body: Option<Vec<u8>>,
	/// Overall request deadline; `None` for streams.
	pub timeout: Option<StdDuration>,
}
impl PreparedRequest {
	/// Creates a request without headers, body, or deadline.
	pub fn new(method: HttpMethod, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: None, timeout: None }
	}

	/// Appends a header.
	pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));

		self
	}

	/// Returns the first value recorded for `name`, compared case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the body as UTF-8 text, when present and valid.
	pub fn body_text(&self) -> Option<&str> {
		self.body.as_deref().and_then(|body| std::str::from_utf8(body).ok())
	}
}
impl Debug for PreparedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name.eq_ignore_ascii_case(HEADER_AUTHORIZATION) {
					(*name, "<redacted>")
				} else {
					(*name, value.as_str())
				}
			})
			.collect::<Vec<_>>();

		f.debug_struct("PreparedRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// HTTP response with an unread body.
pub struct RawResponse {
	/// Status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Unread body chunks.
	pub body: BodyStream,
}
impl RawResponse {
	/// Wraps an already available chunk stream.
	pub fn new(status: u16, body: BodyStream) -> Self {
		Self { status, retry_after: None, body }
	}

	/// Builds a response whose body is a single in-memory chunk.
	pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self::from_chunks(status, [body.into()])
	}

	/// Builds a response whose body arrives in the provided chunks.
	pub fn from_chunks<I>(status: u16, chunks: I) -> Self
	where
		I: IntoIterator<Item = Vec<u8>>,
		I::IntoIter: 'static + Send,
	{
		Self::new(status, Box::pin(stream::iter(chunks.into_iter().map(Ok::<_, TransportError>))))
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Drains the body into memory.
	pub async fn into_bytes(self) -> Result<Vec<u8>, TransportError> {
		let mut body = self.body;
		let mut buf = Vec::new();

		while let Some(chunk) = body.next().await {
			buf.extend_from_slice(&chunk?);
		}

		Ok(buf)
	}
}
impl Debug for RawResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RawResponse")
			.field("status", &self.status)
			.field("retry_after", &self.retry_after)
			.finish_non_exhaustive()
	}
}

const BODY_PREVIEW_LIMIT: usize = 256;

pub(crate) const HEADER_ACCEPT: &str = "accept";
pub(crate) const HEADER_AUTHORIZATION: &str = "authorization";
pub(crate) const HEADER_CONTENT_TYPE: &str = "content-type";
pub(crate) const HEADER_USER_AGENT: &str = "user-agent";

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the configured connect timeout and user agent.
	///
	/// The overall request timeout is applied per request instead, so streams stay open.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.user_agent(config.user_agent.as_str())
			.connect_timeout(config.connect_timeout)
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_, RawResponse> {
		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::Post => reqwest::Method::POST,
				HttpMethod::Put => reqwest::Method::PUT,
				HttpMethod::Delete => reqwest::Method::DELETE,
			};
			let mut builder = self.0.request(method, request.url);

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let retry_after = response
				.headers()
				.get(RETRY_AFTER)
				.and_then(|value| value.to_str().ok())
				.and_then(parse_retry_after);
			let body = response
				.bytes_stream()
				.map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from));

			Ok(RawResponse { status, retry_after, body: Box::pin(body) })
		})
	}
}

/// Parses a `Retry-After` header value given as delta seconds or an HTTP date.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

/// Extracts a human-readable message from an error body.
///
/// JSON objects contribute their `error_description` or `error` field; anything else is returned
/// as a preview truncated to a fixed number of characters.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return None;
	}
	if let Ok(serde_json::Value::Object(mut object)) = serde_json::from_str(text) {
		for field in ["error_description", "error"] {
			match object.remove(field) {
				Some(serde_json::Value::String(message)) => return Some(message),
				Some(serde_json::Value::Null) | None => {},
				Some(other) => return Some(other.to_string()),
			}
		}
	}

	Some(truncate_preview(text))
}

fn truncate_preview(body: &str) -> String {
	match body.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}…", &body[..idx]),
		None => body.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_seconds_and_dates() {
		assert_eq!(parse_retry_after(" 120 "), Some(Duration::seconds(120)));
		assert_eq!(parse_retry_after("soon"), None);
		assert_eq!(parse_retry_after("Mon, 01 Jan 2001 00:00:00 +0000"), None);

		let future = OffsetDateTime::now_utc() + Duration::hours(1);
		let header = future.format(&Rfc2822).expect("Date should format.");
		let parsed = parse_retry_after(&header).expect("Future date should parse.");

		assert!(parsed > Duration::minutes(59));
	}

	#[test]
	fn debug_redacts_bearer_credentials() {
		let url = Url::parse("https://lichess.org/api/account").expect("URL should parse.");
		let request = PreparedRequest::new(HttpMethod::Get, url)
			.with_header(HEADER_AUTHORIZATION, "Bearer lip_secret")
			.with_header(HEADER_ACCEPT, "application/json");
		let rendered = format!("{request:?}");

		assert!(!rendered.contains("lip_secret"));
		assert!(rendered.contains("<redacted>"));
		assert_eq!(request.header("Authorization"), Some("Bearer lip_secret"));
	}

	#[tokio::test]
	async fn chunked_bodies_concatenate() {
		let response = RawResponse::from_chunks(200, vec![b"{\"a\":".to_vec(), b"1}".to_vec()]);

		assert!(response.is_success());
		assert_eq!(response.into_bytes().await.expect("Body should drain."), b"{\"a\":1}".to_vec());
	}

	#[test]
	fn error_messages_prefer_structured_fields() {
		assert_eq!(
			error_message(br#"{"error":"invalid_grant","error_description":"Code expired"}"#).as_deref(),
			Some("Code expired")
		);
		assert_eq!(
			error_message(br#"{"error":{"days":["invalid"]}}"#).as_deref(),
			Some(r#"{"days":["invalid"]}"#)
		);
		assert_eq!(error_message(b"  "), None);

		let long = "é".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = error_message(long.as_bytes()).expect("Non-empty body yields a message.");

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
