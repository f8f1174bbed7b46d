//! Streams incoming account events as NDJSON and prints the first few before closing the
//! connection.
//!
//! Requires a token with the `challenge:read` scope in `ROOKLINE_TOKEN`.

// std
use std::env;
// crates.io
use color_eyre::{Result, eyre::eyre};
use futures::StreamExt;
// self
use rookline::{
	auth::AccessToken,
	config::ClientConfig,
	endpoint::catalog,
	envelope::ResultEnvelope,
	pipeline::{RequestArgs, RequestPipeline},
};

const MAX_EVENTS: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let token = AccessToken::new(env::var("ROOKLINE_TOKEN")?);
	let pipeline = RequestPipeline::new(ClientConfig::builder().build()?)?;
	let envelope = pipeline
		.execute::<serde_json::Value>(&catalog::STREAM_EVENTS, RequestArgs::new(), Some(&token))
		.await?;
	let mut events = match envelope {
		ResultEnvelope::Many(events) => events,
		ResultEnvelope::NoneMatch => return Err(eyre!("The event stream is not available.")),
		ResultEnvelope::Fail(info) => return Err(eyre!("Could not open the event stream: {info}.")),
		ResultEnvelope::One(_) => return Err(eyre!("Expected a stream, got a single document.")),
	};
	let mut seen = 0;

	while let Some(event) = events.next().await {
		println!("{}", event["type"].as_str().unwrap_or("unknown"));

		seen += 1;

		if seen == MAX_EVENTS {
			break;
		}
	}

	events.close();

	if let Some(stats) = events.stats() {
		println!("Decoded {} events, skipped {} malformed lines.", stats.yielded(), stats.malformed());

		if let Some(info) = stats.terminal_error() {
			println!("Stream ended early: {info}.");
		}
	}

	Ok(())
}
