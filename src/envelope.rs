//! Uniform result shape for every pipeline call.
//!
//! A [`ResultEnvelope`] is exactly one of four variants. Stream-backed [`Items`] are single-pass and
//! own their connection until they finish, are closed, or are dropped; their per-stream counters
//! live on a shared [`StreamStats`] handle so skipped lines never surface as elements.

mod ndjson;

pub(crate) use ndjson::NdjsonStream;

// std
use std::{
	sync::atomic::{AtomicU64, Ordering},
	task::{Context, Poll},
};
// crates.io
use futures::{Stream, StreamExt};
// self
use crate::{
	_prelude::*,
	error::{ErrorInfo, ErrorKind},
};

/// Outcome of a pipeline call.
pub enum ResultEnvelope<T> {
	/// Exactly one decoded item.
	One(T),
	/// Zero or more items; finite for buffered responses, potentially unbounded for streams.
	Many(Items<T>),
	/// The call succeeded but no matching data exists.
	NoneMatch,
	/// The call failed.
	Fail(ErrorInfo),
}
impl<T> ResultEnvelope<T> {
	/// Returns `true` for [`ResultEnvelope::One`].
	pub fn is_one(&self) -> bool {
		matches!(self, Self::One(_))
	}

	/// Returns `true` for [`ResultEnvelope::Many`].
	pub fn is_many(&self) -> bool {
		matches!(self, Self::Many(_))
	}

	/// Returns `true` for [`ResultEnvelope::NoneMatch`].
	pub fn is_none_match(&self) -> bool {
		matches!(self, Self::NoneMatch)
	}

	/// Returns `true` for [`ResultEnvelope::Fail`].
	pub fn is_fail(&self) -> bool {
		matches!(self, Self::Fail(_))
	}

	/// Returns the single item, discarding every other variant.
	pub fn ok(self) -> Option<T> {
		match self {
			Self::One(item) => Some(item),
			_ => None,
		}
	}

	/// Returns the failure, if any.
	pub fn error(&self) -> Option<&ErrorInfo> {
		match self {
			Self::Fail(info) => Some(info),
			_ => None,
		}
	}

	/// Returns the single item or an [`ErrorInfo`] describing why there is none.
	///
	/// `NoneMatch` and `Many` map to [`ErrorKind::NoData`]; `Fail` returns its own error.
	pub fn into_one(self) -> Result<T, ErrorInfo> {
		match self {
			Self::One(item) => Ok(item),
			Self::Many(_) => Err(ErrorInfo::new(ErrorKind::NoData)
				.with_message("Expected a single item but the response is a sequence.")),
			Self::NoneMatch => Err(ErrorInfo::new(ErrorKind::NoData)),
			Self::Fail(info) => Err(info),
		}
	}

	/// Returns the items as a sequence; `One` becomes a one-element sequence and `NoneMatch` an
	/// empty one.
	pub fn into_many(self) -> Result<Items<T>, ErrorInfo> {
		match self {
			Self::One(item) => Ok(Items::from_vec(vec![item])),
			Self::Many(items) => Ok(items),
			Self::NoneMatch => Ok(Items::from_vec(Vec::new())),
			Self::Fail(info) => Err(info),
		}
	}

	/// Maps the item type; stream-backed sequences apply `f` lazily as items are pulled.
	pub fn map<U, F>(self, mut f: F) -> ResultEnvelope<U>
	where
		F: 'static + Send + FnMut(T) -> U,
		T: 'static,
		U: 'static,
	{
		match self {
			Self::One(item) => ResultEnvelope::One(f(item)),
			Self::Many(items) => ResultEnvelope::Many(items.map(f)),
			Self::NoneMatch => ResultEnvelope::NoneMatch,
			Self::Fail(info) => ResultEnvelope::Fail(info),
		}
	}

	/// Counts the items, draining a `Many` sequence; `NoneMatch` and `Fail` count as zero.
	pub async fn count(self) -> usize {
		match self {
			Self::One(_) => 1,
			Self::Many(items) => StreamExt::count(items).await,
			Self::NoneMatch | Self::Fail(_) => 0,
		}
	}
}
impl<T> Debug for ResultEnvelope<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::One(item) => f.debug_tuple("One").field(item).finish(),
			Self::Many(items) => f.debug_tuple("Many").field(items).finish(),
			Self::NoneMatch => f.write_str("NoneMatch"),
			Self::Fail(info) => f.debug_tuple("Fail").field(info).finish(),
		}
	}
}

/// Sequence of decoded items carried by [`ResultEnvelope::Many`].
///
/// Buffered sequences are finite. Stream-backed sequences decode one NDJSON line per pull and may
/// never end; call [`Items::close`] (or drop the value) to release the connection.
pub struct Items<T> {
	source: Source<T>,
	stats: Option<StreamStats>,
}
impl<T> Items<T> {
	/// Wraps already decoded items.
	pub fn from_vec(items: Vec<T>) -> Self {
		Self { source: Source::Buffered(items.into()), stats: None }
	}

	pub(crate) fn from_stream(stream: NdjsonStream<T>) -> Self
	where
		T: 'static + DeserializeOwned,
	{
		let stats = Some(stream.stats().clone());

		Self { source: Source::Lazy(Box::new(stream)), stats }
	}

	/// Returns `true` when items are decoded lazily from a live connection.
	pub fn is_stream_backed(&self) -> bool {
		self.stats.is_some()
	}

	/// Counters for stream-backed sequences; `None` for buffered ones.
	pub fn stats(&self) -> Option<&StreamStats> {
		self.stats.as_ref()
	}

	/// Releases the underlying connection without waiting for the remote side.
	///
	/// Buffered items not yet pulled are discarded as well; later pulls return end-of-sequence.
	pub fn close(&mut self) {
		self.source = Source::Closed;
	}

	/// Maps every item; stream-backed sequences apply `f` lazily.
	pub fn map<U, F>(self, f: F) -> Items<U>
	where
		F: 'static + Send + FnMut(T) -> U,
		T: 'static,
		U: 'static,
	{
		let source = match self.source {
			Source::Buffered(items) => Source::Buffered(items.into_iter().map(f).collect()),
			Source::Lazy(inner) => Source::Lazy(Box::new(Mapped { inner, f })),
			Source::Closed => Source::Closed,
		};

		Items { source, stats: self.stats }
	}
}
impl<T> Stream for Items<T> {
	type Item = T;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let this = self.get_mut();

		match &mut this.source {
			Source::Buffered(items) => Poll::Ready(items.pop_front()),
			Source::Lazy(inner) => inner.poll_item(cx),
			Source::Closed => Poll::Ready(None),
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		match &self.source {
			Source::Buffered(items) => (items.len(), Some(items.len())),
			Source::Lazy(_) => (0, None),
			Source::Closed => (0, Some(0)),
		}
	}
}
impl<T> Unpin for Items<T> {}
impl<T> Debug for Items<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let source = match &self.source {
			Source::Buffered(items) => format!("buffered({})", items.len()),
			Source::Lazy(_) => "stream".into(),
			Source::Closed => "closed".into(),
		};

		f.debug_struct("Items").field("source", &source).field("stats", &self.stats).finish()
	}
}

enum Source<T> {
	Buffered(VecDeque<T>),
	Lazy(Box<dyn LazySource<T> + Send>),
	Closed,
}

/// Item source decoded on demand.
pub(crate) trait LazySource<T> {
	fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>>;
}

struct Mapped<T, F> {
	inner: Box<dyn LazySource<T> + Send>,
	f: F,
}
impl<T, U, F> LazySource<U> for Mapped<T, F>
where
	F: FnMut(T) -> U,
{
	fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<U>> {
		self.inner.poll_item(cx).map(|item| item.map(&mut self.f))
	}
}

/// Shared counters for one stream-backed sequence.
///
/// Clones observe the same counters, so a caller can keep a handle while the sequence itself is
/// moved into a consumer task.
#[derive(Clone, Debug, Default)]
pub struct StreamStats(Arc<StreamStatsInner>);
impl StreamStats {
	/// Items decoded and yielded so far.
	pub fn yielded(&self) -> u64 {
		self.0.yielded.load(Ordering::Relaxed)
	}

	/// Lines skipped because they could not be decoded.
	pub fn malformed(&self) -> u64 {
		self.0.malformed.load(Ordering::Relaxed)
	}

	/// Error that ended the sequence early, if any.
	pub fn terminal_error(&self) -> Option<ErrorInfo> {
		self.0.terminal.lock().clone()
	}

	pub(crate) fn record_item(&self) {
		self.0.yielded.fetch_add(1, Ordering::Relaxed);
	}

	/// Returns the number of malformed lines seen before this one.
	pub(crate) fn record_malformed(&self) -> u64 {
		self.0.malformed.fetch_add(1, Ordering::Relaxed)
	}

	pub(crate) fn record_terminal(&self, info: ErrorInfo) {
		self.0.terminal.lock().get_or_insert(info);
	}
}

#[derive(Debug, Default)]
struct StreamStatsInner {
	yielded: AtomicU64,
	malformed: AtomicU64,
	terminal: Mutex<Option<ErrorInfo>>,
}
