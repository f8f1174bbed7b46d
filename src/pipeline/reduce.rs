// self
use crate::{
	_prelude::*,
	endpoint::{EmptyBody, EndpointDescriptor, ResponseShape},
	envelope::{Items, NdjsonStream, ResultEnvelope},
	error::{ErrorInfo, ErrorKind},
	transport::{self, RawResponse},
};

/// Maps a raw response onto the envelope dictated by the descriptor's shape and empty-body policy.
pub(super) async fn reduce<R>(descriptor: &EndpointDescriptor, response: RawResponse) -> ResultEnvelope<R>
where
	R: 'static + Send + DeserializeOwned,
{
	let status = response.status;

	if status == 404 {
		return ResultEnvelope::NoneMatch;
	}
	if !response.is_success() {
		return ResultEnvelope::Fail(rejection(response).await);
	}
	if descriptor.shape == ResponseShape::Stream {
		if status == 204 {
			return ResultEnvelope::NoneMatch;
		}

		return ResultEnvelope::Many(Items::from_stream(NdjsonStream::new(descriptor.name, response.body)));
	}

	let body = match response.into_bytes().await {
		Ok(body) => body,
		Err(e) => return ResultEnvelope::Fail(ErrorInfo::from(&e)),
	};
	let body = if status == 204 || body.trim_ascii().is_empty() {
		match descriptor.empty_body {
			EmptyBody::Absent => return ResultEnvelope::NoneMatch,
			EmptyBody::Null => b"null".as_slice(),
		}
	} else {
		body.as_slice()
	};

	match descriptor.shape {
		ResponseShape::List => match decode::<Vec<R>>(body, status) {
			Ok(items) => ResultEnvelope::Many(Items::from_vec(items)),
			Err(info) => ResultEnvelope::Fail(info),
		},
		ResponseShape::Single | ResponseShape::Stream => match decode::<R>(body, status) {
			Ok(item) => ResultEnvelope::One(item),
			Err(info) => ResultEnvelope::Fail(info),
		},
	}
}

/// Decodes a JSON document, reporting the failing path on error.
pub(super) fn decode<R>(body: &[u8], status: u16) -> Result<R, ErrorInfo>
where
	R: DeserializeOwned,
{
	let fail = |message: String| {
		ErrorInfo::new(ErrorKind::DecodeFailure).with_status(status).with_message(message)
	};
	let mut de = serde_json::Deserializer::from_slice(body);
	let item = serde_path_to_error::deserialize::<_, R>(&mut de).map_err(|e| {
		fail(format!("Malformed response body at `{}`: {}", e.path(), e.inner()))
	})?;

	de.end().map_err(|e| fail(format!("Malformed response body: {e}")))?;

	Ok(item)
}

async fn rejection(response: RawResponse) -> ErrorInfo {
	let status = response.status;
	let retry_after = response.retry_after;
	let kind = if status == 401 { ErrorKind::Unauthorized } else { ErrorKind::RemoteRejected };
	let info = ErrorInfo::new(kind).with_status(status).with_retry_after(retry_after);

	// A body read failure still leaves the status as the most useful signal.
	match response.into_bytes().await.ok().and_then(|body| transport::error_message(&body)) {
		Some(message) => info.with_message(message),
		None => info,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SINGLE: EndpointDescriptor = EndpointDescriptor::get("test.single", "/api/single");
	const LIST: EndpointDescriptor = EndpointDescriptor::get("test.list", "/api/list").list();

	#[derive(Debug, PartialEq, Deserialize)]
	struct Status {
		id: String,
		online: Option<bool>,
	}

	#[tokio::test]
	async fn not_found_is_none_match() {
		let envelope =
			reduce::<Status>(&SINGLE, RawResponse::from_bytes(404, r#"{"error":"Not found"}"#)).await;

		assert!(envelope.is_none_match());
	}

	#[tokio::test]
	async fn rejections_carry_status_message_and_retry_hint() {
		let response = RawResponse::from_bytes(429, r#"{"error":"Too many requests"}"#)
			.with_retry_after(Some(Duration::seconds(60)));
		let info = reduce::<Status>(&SINGLE, response).await.into_one().expect_err("429 must fail.");

		assert_eq!(info.kind, ErrorKind::RemoteRejected);
		assert_eq!(info.status, Some(429));
		assert_eq!(info.message.as_deref(), Some("Too many requests"));
		assert_eq!(info.retry_after, Some(Duration::seconds(60)));

		let info = reduce::<Status>(&SINGLE, RawResponse::from_bytes(401, r#"{"error":"No such token"}"#))
			.await
			.into_one()
			.expect_err("401 must fail.");

		assert_eq!(info.kind, ErrorKind::Unauthorized);
		assert_eq!(info.status, Some(401));
	}

	#[tokio::test]
	async fn decode_failures_report_the_path() {
		let info = reduce::<Status>(&SINGLE, RawResponse::from_bytes(200, r#"{"id":7}"#))
			.await
			.into_one()
			.expect_err("Wrong field type must fail.");

		assert_eq!(info.kind, ErrorKind::DecodeFailure);
		assert_eq!(info.status, Some(200));
		assert!(info.message.as_deref().is_some_and(|m| m.contains("`id`")), "{info}");
	}

	#[tokio::test]
	async fn lists_become_finite_sequences() {
		let body = r#"[{"id":"a","online":true},{"id":"b"}]"#;
		let envelope = reduce::<Status>(&LIST, RawResponse::from_bytes(200, body)).await;

		assert!(envelope.is_many());
		assert_eq!(envelope.count().await, 2);
	}
}
