//! Endpoint descriptors: immutable metadata describing one remote operation.
//!
//! Descriptors are plain `Copy` data built with `const fn` combinators, so resource
//! wrappers declare them once as `const` items and share them across threads without
//! locking. A descriptor never carries call arguments; those travel in
//! [`RequestArgs`](crate::pipeline::RequestArgs).

pub mod catalog;

mod path;

pub(crate) use path::resolve_url;

// self
use crate::{_prelude::*, auth::Scope};

/// HTTP verbs used by the remote API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`.
	Delete,
}
impl HttpMethod {
	/// Returns the request-line token.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How a successful response body is reduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
	/// One JSON document decoded into one item.
	Single,
	/// One JSON array decoded into a finite, buffered sequence.
	List,
	/// Long-lived NDJSON body decoded line by line.
	Stream,
}

/// Request body encodings accepted by write endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
	/// `application/x-www-form-urlencoded`.
	Form,
	/// `application/json`.
	Json,
}
impl BodyEncoding {
	/// Returns the `Content-Type` header value.
	pub const fn content_type(self) -> &'static str {
		match self {
			BodyEncoding::Form => "application/x-www-form-urlencoded",
			BodyEncoding::Json => "application/json",
		}
	}
}

/// Policy for successful responses that carry no body (`204` or an empty `200`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBody {
	/// The resource is absent; reduce to `NoneMatch`.
	#[default]
	Absent,
	/// Emptiness is a legitimate answer; decode the JSON literal `null` into the item type.
	Null,
}

/// Cursor-based pagination declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pagination {
	/// Top-level response field holding the next cursor (absent or `null` on the last page).
	pub cursor_field: &'static str,
	/// Query parameter that carries the cursor on the following request.
	pub cursor_param: &'static str,
}

/// Immutable description of a remote operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EndpointDescriptor {
	/// Stable name used in logs, metrics, and precondition errors.
	pub name: &'static str,
	/// HTTP verb.
	pub method: HttpMethod,
	/// Path template relative to the API base, with `{named}` placeholders.
	pub path: &'static str,
	/// Scope a token must carry; scoped endpoints fail fast without a token.
	pub scope: Option<Scope>,
	/// Response reduction strategy.
	pub shape: ResponseShape,
	/// Body encoding; `None` means the endpoint takes no body.
	pub body: Option<BodyEncoding>,
	/// Cursor pagination, when the endpoint pages its results.
	pub pagination: Option<Pagination>,
	/// Policy for empty successful bodies.
	pub empty_body: EmptyBody,
}
impl EndpointDescriptor {
	/// Creates a single-shape, unscoped, bodiless descriptor.
	pub const fn new(name: &'static str, method: HttpMethod, path: &'static str) -> Self {
		Self {
			name,
			method,
			path,
			scope: None,
			shape: ResponseShape::Single,
			body: None,
			pagination: None,
			empty_body: EmptyBody::Absent,
		}
	}

	/// Shorthand for a `GET` descriptor.
	pub const fn get(name: &'static str, path: &'static str) -> Self {
		Self::new(name, HttpMethod::Get, path)
	}

	/// Shorthand for a `POST` descriptor taking form fields.
	pub const fn post(name: &'static str, path: &'static str) -> Self {
		Self::new(name, HttpMethod::Post, path).form()
	}

	/// Shorthand for a `PUT` descriptor taking a JSON document.
	pub const fn put(name: &'static str, path: &'static str) -> Self {
		Self::new(name, HttpMethod::Put, path).json()
	}

	/// Shorthand for a bodiless `DELETE` descriptor.
	pub const fn delete(name: &'static str, path: &'static str) -> Self {
		Self::new(name, HttpMethod::Delete, path)
	}

	/// Requires a token carrying `scope`.
	pub const fn scope(mut self, scope: Scope) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Declares an NDJSON stream response.
	pub const fn stream(mut self) -> Self {
		self.shape = ResponseShape::Stream;

		self
	}

	/// Declares a buffered JSON array response.
	pub const fn list(mut self) -> Self {
		self.shape = ResponseShape::List;

		self
	}

	/// Declares a form-encoded request body.
	pub const fn form(mut self) -> Self {
		self.body = Some(BodyEncoding::Form);

		self
	}

	/// Declares a JSON request body.
	pub const fn json(mut self) -> Self {
		self.body = Some(BodyEncoding::Json);

		self
	}

	/// Declares cursor pagination.
	pub const fn paginated(mut self, cursor_field: &'static str, cursor_param: &'static str) -> Self {
		self.pagination = Some(Pagination { cursor_field, cursor_param });

		self
	}

	/// Overrides the empty-body policy.
	pub const fn empty_body(mut self, policy: EmptyBody) -> Self {
		self.empty_body = policy;

		self
	}

	/// Returns `true` when repeating the call has no additional effect on the server.
	///
	/// The pipeline never retries; callers that layer a retry policy on top should
	/// restrict it to descriptors for which this returns `true`.
	pub const fn is_idempotent(&self) -> bool {
		matches!(self.method, HttpMethod::Get | HttpMethod::Put | HttpMethod::Delete)
	}

	/// Placeholder names declared by the path template, in order of appearance.
	pub fn placeholders(&self) -> Vec<&'static str> {
		path::placeholders(self.path)
	}
}
