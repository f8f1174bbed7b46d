// std
use std::task::{Context, Poll};
// crates.io
use futures::{Stream, stream::BoxStream};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	endpoint::{EndpointDescriptor, Pagination, ResponseShape},
	envelope::ResultEnvelope,
	error::{ErrorInfo, ErrorKind},
	obs::OperationKind,
	pipeline::{RequestArgs, RequestPipeline},
	transport::ApiTransport,
};

/// Lazy sequence of pages produced by [`RequestPipeline::paginate`].
///
/// Nothing is requested until the first pull. Every page is a fresh call carrying the previous
/// page's cursor; a failure is yielded once and ends the sequence.
pub struct Pages<R> {
	inner: BoxStream<'static, Result<R, ErrorInfo>>,
}
impl<R> Pages<R>
where
	R: 'static + Send + DeserializeOwned,
{
	pub(super) fn new<T>(
		pipeline: RequestPipeline<T>,
		descriptor: EndpointDescriptor,
		pagination: Pagination,
		args: RequestArgs,
		token: Option<AccessToken>,
	) -> Self
	where
		T: ApiTransport,
	{
		let state = PageState {
			pipeline,
			descriptor: EndpointDescriptor { shape: ResponseShape::Single, ..descriptor },
			pagination,
			args,
			token,
			finished: false,
		};
		let inner = futures::stream::unfold(state, |mut state| async move {
			if state.finished {
				return None;
			}

			let item = state.next_page::<R>().await?;

			Some((item, state))
		});

		Self { inner: Box::pin(inner) }
	}
}
impl<R> Stream for Pages<R> {
	type Item = Result<R, ErrorInfo>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.inner.as_mut().poll_next(cx)
	}
}
impl<R> Debug for Pages<R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pages").finish_non_exhaustive()
	}
}

struct PageState<T>
where
	T: ApiTransport,
{
	pipeline: RequestPipeline<T>,
	descriptor: EndpointDescriptor,
	pagination: Pagination,
	args: RequestArgs,
	token: Option<AccessToken>,
	finished: bool,
}
impl<T> PageState<T>
where
	T: ApiTransport,
{
	/// Fetches one page; `None` ends the sequence without yielding.
	async fn next_page<R>(&mut self) -> Option<Result<R, ErrorInfo>>
	where
		R: DeserializeOwned,
	{
		let envelope = self
			.pipeline
			.execute_as::<Value>(OperationKind::Page, &self.descriptor, &self.args, self.token.as_ref())
			.await;
		let page = match envelope {
			Ok(ResultEnvelope::One(page)) => page,
			Ok(ResultEnvelope::NoneMatch) => return None,
			Ok(ResultEnvelope::Fail(info)) => return Some(self.fail(info)),
			Ok(ResultEnvelope::Many(_)) => {
				let info = ErrorInfo::new(ErrorKind::DecodeFailure)
					.with_message("Paginated endpoint returned a sequence instead of a page.");

				return Some(self.fail(info));
			},
			Err(e) => return Some(self.fail(ErrorInfo::from(&e))),
		};

		match next_cursor(&page, self.pagination.cursor_field) {
			Some(cursor) => self.args.set_query(self.pagination.cursor_param, cursor),
			None => self.finished = true,
		}

		match serde_path_to_error::deserialize(page) {
			Ok(item) => Some(Ok(item)),
			Err(e) => {
				let info = ErrorInfo::new(ErrorKind::DecodeFailure)
					.with_message(format!("Malformed page at `{}`: {}", e.path(), e.inner()));

				Some(self.fail(info))
			},
		}
	}

	fn fail<R>(&mut self, info: ErrorInfo) -> Result<R, ErrorInfo> {
		self.finished = true;

		Err(info)
	}
}

/// Reads the cursor from a top-level field; strings and integers are accepted.
fn next_cursor(page: &Value, field: &str) -> Option<String> {
	match page.get(field)? {
		Value::String(cursor) if !cursor.is_empty() => Some(cursor.clone()),
		Value::Number(cursor) => Some(cursor.to_string()),
		_ => None,
	}
}
