// std
use std::{
	marker::PhantomData,
	mem,
	task::{Context, Poll},
};
// crates.io
use futures::Stream;
// self
use crate::{
	_prelude::*,
	envelope::{LazySource, StreamStats},
	error::ErrorInfo,
	obs,
	transport::BodyStream,
};

/// Line-oriented decoder over a chunked response body.
///
/// Chunks may split lines anywhere, so bytes are buffered until a `\n` arrives. Blank lines are
/// keep-alives and are skipped silently; lines that fail to decode are counted on [`StreamStats`]
/// and skipped. A body error ends the sequence and becomes the terminal error.
pub(crate) struct NdjsonStream<T> {
	endpoint: &'static str,
	body: Option<BodyStream>,
	buf: Vec<u8>,
	// Bytes of `buf` already known to hold no newline.
	scanned: usize,
	line: u64,
	stats: StreamStats,
	_item: PhantomData<fn() -> T>,
}
impl<T> NdjsonStream<T> {
	pub(crate) fn new(endpoint: &'static str, body: BodyStream) -> Self {
		Self {
			endpoint,
			body: Some(body),
			buf: Vec::new(),
			scanned: 0,
			line: 0,
			stats: StreamStats::default(),
			_item: PhantomData,
		}
	}

	pub(crate) fn stats(&self) -> &StreamStats {
		&self.stats
	}
}
impl<T> NdjsonStream<T>
where
	T: DeserializeOwned,
{
	fn decode(&mut self, raw: &[u8]) -> Option<T> {
		self.line += 1;

		let line = raw.trim_ascii();

		if line.is_empty() {
			return None;
		}

		match serde_json::from_slice::<T>(line) {
			Ok(item) => {
				self.stats.record_item();

				Some(item)
			},
			Err(e) => {
				if self.stats.record_malformed() == 0 {
					obs::warn_malformed_line(self.endpoint, self.line, &e);
				}

				None
			},
		}
	}

	fn poll_line(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
		loop {
			if let Some(pos) = self.buf[self.scanned..].iter().position(|byte| *byte == b'\n') {
				let rest = self.buf.split_off(self.scanned + pos + 1);
				let line = mem::replace(&mut self.buf, rest);

				self.scanned = 0;

				if let Some(item) = self.decode(&line) {
					return Poll::Ready(Some(item));
				}

				continue;
			}

			let Some(body) = self.body.as_mut() else {
				if self.buf.is_empty() {
					return Poll::Ready(None);
				}

				let line = mem::take(&mut self.buf);

				self.scanned = 0;

				if let Some(item) = self.decode(&line) {
					return Poll::Ready(Some(item));
				}

				continue;
			};

			match body.as_mut().poll_next(cx) {
				Poll::Ready(Some(Ok(chunk))) => {
					self.scanned = self.buf.len();
					self.buf.extend_from_slice(&chunk);
				},
				Poll::Ready(Some(Err(e))) => {
					self.stats.record_terminal(ErrorInfo::from(&e));
					self.body = None;
					self.buf.clear();
					self.scanned = 0;

					return Poll::Ready(None);
				},
				Poll::Ready(None) => self.body = None,
				Poll::Pending => return Poll::Pending,
			}
		}
	}
}
impl<T> LazySource<T> for NdjsonStream<T>
where
	T: DeserializeOwned,
{
	fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
		self.poll_line(cx)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use futures::{StreamExt, stream};
	// self
	use super::*;
	use crate::{
		envelope::Items,
		error::{ErrorKind, TransportError},
	};

	#[derive(Debug, PartialEq, Deserialize)]
	struct Move {
		uci: String,
	}

	fn items_from(chunks: Vec<Result<Vec<u8>, TransportError>>) -> (Items<Move>, StreamStats) {
		let body: BodyStream = Box::pin(stream::iter(chunks));
		let items = Items::from_stream(NdjsonStream::<Move>::new("test.moves", body));
		let stats = items.stats().cloned().expect("Stream-backed items must expose stats.");

		(items, stats)
	}

	async fn decode_all(chunks: Vec<&'static str>) -> (Vec<Move>, StreamStats) {
		let (items, stats) =
			items_from(chunks.into_iter().map(|chunk| Ok(chunk.as_bytes().to_vec())).collect());

		(items.collect().await, stats)
	}

	#[tokio::test]
	async fn lines_split_across_chunks_are_reassembled() {
		let (moves, stats) =
			decode_all(vec!["{\"uci\":\"e2", "e4\"}\n{\"uci\"", ":\"e7e5\"}\r\n", "{\"uci\":\"g1f3\"}"])
				.await;

		assert_eq!(
			moves.iter().map(|m| m.uci.as_str()).collect::<Vec<_>>(),
			vec!["e2e4", "e7e5", "g1f3"]
		);
		assert_eq!(stats.yielded(), 3);
		assert_eq!(stats.malformed(), 0);
		assert_eq!(stats.terminal_error(), None);
	}

	#[tokio::test]
	async fn byte_sized_chunks_resume_the_newline_scan() {
		let text = format!(
			"{{\"uci\":\"{}\"}}\n{{\"uci\":\"b1c3\"}}\n\n{{\"uci\":\"g8f6\"}}",
			"e".repeat(4096)
		);
		let chunks =
			text.bytes().map(|byte| Ok::<_, TransportError>(vec![byte])).collect::<Vec<_>>();
		let body: BodyStream = Box::pin(stream::iter(chunks));
		let mut decoder = NdjsonStream::<Move>::new("test.moves", body);
		let moves = stream::poll_fn(|cx| decoder.poll_line(cx)).collect::<Vec<_>>().await;

		assert_eq!(moves.len(), 3);
		assert_eq!(moves[0].uci.len(), 4096);
		assert_eq!(moves[1].uci, "b1c3");
		assert_eq!(moves[2].uci, "g8f6");
		assert_eq!(decoder.scanned, 0);
		assert!(decoder.buf.is_empty());
		assert_eq!(decoder.stats().malformed(), 0);
	}

	#[tokio::test]
	async fn keep_alive_lines_are_not_malformed() {
		let (moves, stats) = decode_all(vec!["\n\n{\"uci\":\"d2d4\"}\n", "\n  \n"]).await;

		assert_eq!(moves.len(), 1);
		assert_eq!(stats.malformed(), 0);
	}

	#[tokio::test]
	async fn malformed_lines_are_counted_and_skipped() {
		let (moves, stats) =
			decode_all(vec!["{\"uci\":\"e2e4\"}\n{not json}\n{\"other\":1}\n{\"uci\":\"c7c5\"}\n"]).await;

		assert_eq!(moves.len(), 2);
		assert_eq!(stats.malformed(), 2);
	}

	#[tokio::test]
	async fn body_errors_end_the_sequence() {
		let (mut items, stats) = items_from(vec![
			Ok(b"{\"uci\":\"e2e4\"}\n{\"uci\":".to_vec()),
			Err(TransportError::from(std::io::Error::other("connection reset"))),
			Ok(b"{\"uci\":\"e7e5\"}\n".to_vec()),
		]);

		assert_eq!(items.next().await, Some(Move { uci: "e2e4".into() }));
		assert_eq!(items.next().await, None);
		assert_eq!(items.next().await, None);
		assert_eq!(stats.yielded(), 1);
		assert_eq!(stats.terminal_error().map(|e| e.kind), Some(ErrorKind::Transport));
	}
}
