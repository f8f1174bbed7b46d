#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use futures::StreamExt;
use httpmock::prelude::*;
// self
use rookline::{
	_preludet::*,
	auth::AccessToken,
	endpoint::catalog,
	envelope::{Items, ResultEnvelope},
	error::ErrorKind,
	pipeline::RequestArgs,
};

#[derive(Debug, Deserialize)]
struct Event {
	#[serde(rename = "type")]
	kind: String,
}

async fn open_stream(server: &MockServer, body: &'static str) -> Items<Event> {
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/stream/event")
				.header("accept", "application/x-ndjson")
				.header("authorization", "Bearer lip_stream");
			then.status(200).header("content-type", "application/x-ndjson").body(body);
		})
		.await;

	let (pipeline, _) = build_test_pipeline(&server.base_url());
	let token = AccessToken::new("lip_stream");
	let envelope = pipeline
		.execute::<Event>(&catalog::STREAM_EVENTS, RequestArgs::new(), Some(&token))
		.await
		.expect("Arguments fit the descriptor.");
	let ResultEnvelope::Many(items) = envelope else { panic!("Stream endpoint must yield Many.") };

	assert!(items.is_stream_backed());

	items
}

#[tokio::test]
async fn well_formed_lines_yield_exactly_that_many_items() {
	let server = MockServer::start_async().await;
	let mut items = open_stream(
		&server,
		"{\"type\":\"challenge\"}\n{\"type\":\"gameStart\"}\n\n{\"type\":\"gameFinish\"}\n",
	)
	.await;
	let stats = items.stats().cloned().expect("Stream-backed items expose stats.");
	let mut kinds = Vec::new();

	while let Some(event) = items.next().await {
		kinds.push(event.kind);
	}

	items.close();

	assert_eq!(kinds, vec!["challenge", "gameStart", "gameFinish"]);
	assert_eq!(stats.yielded(), 3);
	assert_eq!(stats.malformed(), 0);
	assert_eq!(stats.terminal_error(), None);
}

#[tokio::test]
async fn malformed_lines_are_skipped_and_counted() {
	let server = MockServer::start_async().await;
	let items = open_stream(
		&server,
		"{\"type\":\"challenge\"}\n{\"type\":\ngarbage\n{\"type\":\"gameStart\"}\n",
	)
	.await;
	let stats = items.stats().cloned().expect("Stream-backed items expose stats.");
	let events = items.collect::<Vec<_>>().await;

	assert_eq!(events.len(), 2);
	assert_eq!(stats.malformed(), 2);
	assert_eq!(stats.terminal_error(), None);
}

#[tokio::test]
async fn single_malformed_line_between_good_ones() {
	let server = MockServer::start_async().await;
	let items =
		open_stream(&server, "{\"type\":\"challenge\"}\nnot json\n{\"type\":\"gameStart\"}\n").await;
	let stats = items.stats().cloned().expect("Stream-backed items expose stats.");

	assert_eq!(ResultEnvelope::Many(items).count().await, 2);
	assert_eq!(stats.malformed(), 1);
}

#[tokio::test]
async fn closing_early_stops_the_sequence() {
	let server = MockServer::start_async().await;
	let mut items = open_stream(
		&server,
		"{\"type\":\"challenge\"}\n{\"type\":\"gameStart\"}\n{\"type\":\"gameFinish\"}\n",
	)
	.await;

	assert_eq!(items.next().await.map(|event| event.kind).as_deref(), Some("challenge"));

	items.close();

	assert!(items.next().await.is_none());
	assert_eq!(items.stats().map(|stats| stats.yielded()), Some(1));
}

#[tokio::test]
async fn missing_stream_is_none_match_and_rejections_fail() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/board/game/stream/gone");
			then.status(404);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/board/game/stream/locked");
			then.status(403).body("{\"error\":\"Missing scope\"}");
		})
		.await;

	let (pipeline, _) = build_test_pipeline(&server.base_url());
	let token = AccessToken::new("lip_stream");
	let envelope = pipeline
		.execute::<Event>(&catalog::STREAM_BOARD_GAME, RequestArgs::new().path("gameId", "gone"), Some(&token))
		.await
		.expect("Arguments fit the descriptor.");

	assert!(envelope.is_none_match());

	let envelope = pipeline
		.execute::<Event>(
			&catalog::STREAM_BOARD_GAME,
			RequestArgs::new().path("gameId", "locked"),
			Some(&token),
		)
		.await
		.expect("Arguments fit the descriptor.");
	let info = envelope.error().expect("403 must fail.");

	assert_eq!(info.kind, ErrorKind::RemoteRejected);
	assert_eq!(info.status, Some(403));
	assert_eq!(info.message.as_deref(), Some("Missing scope"));
}
