//! Typed client core for a chess platform web API: a scoped request pipeline with NDJSON streams,
//! plus a loopback PKCE authorizer.
//!
//! Resource wrappers describe each remote operation once with a `const`
//! [`EndpointDescriptor`](endpoint::EndpointDescriptor) and hand it to
//! [`RequestPipeline::execute`](pipeline::RequestPipeline::execute), which reduces every outcome to a
//! [`ResultEnvelope`](envelope::ResultEnvelope). Interactive token acquisition goes through
//! [`PkceAuthorizer::begin`](pkce::PkceAuthorizer::begin).

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod obs;
pub mod pipeline;
pub mod pkce;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		config::ClientConfig,
		pipeline::RequestPipeline,
		transport::{ApiTransport, PreparedRequest, RawResponse, ReqwestTransport, TransportFuture},
	};

	/// Pipeline type alias used by reqwest-backed integration tests.
	pub type CountingPipeline = RequestPipeline<CountingTransport<ReqwestTransport>>;

	/// Transport wrapper that records every request before delegating to the inner transport.
	#[derive(Debug, Default)]
	pub struct CountingTransport<T> {
		inner: T,
		calls: AtomicUsize,
		seen: Mutex<Vec<PreparedRequest>>,
	}
	impl<T> CountingTransport<T> {
		/// Wraps `inner`.
		pub fn new(inner: T) -> Self {
			Self { inner, calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) }
		}

		/// Number of requests handed to the transport so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Snapshot of the requests handed to the transport so far.
		pub fn requests(&self) -> Vec<PreparedRequest> {
			self.seen.lock().clone()
		}
	}
	impl<T> ApiTransport for CountingTransport<T>
	where
		T: ApiTransport,
	{
		fn send(&self, request: PreparedRequest) -> TransportFuture<'_, RawResponse> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.seen.lock().push(request.clone());

			self.inner.send(request)
		}
	}

	/// Builds a reqwest transport that bypasses any system proxy so loopback mocks stay reachable.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.no_proxy()
			.build()
			.expect("Failed to build proxy-free Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Builds a configuration whose site and API both point at `base`.
	pub fn test_config(base: &str) -> ClientConfig {
		ClientConfig::builder()
			.site(base)
			.api(base)
			.user_agent("rookline-tests")
			.build()
			.expect("Failed to build test client configuration.")
	}

	/// Constructs a [`RequestPipeline`] backed by a counting reqwest transport aimed at `base`.
	pub fn build_test_pipeline(base: &str) -> (CountingPipeline, Arc<CountingTransport<ReqwestTransport>>) {
		let transport = Arc::new(CountingTransport::new(test_reqwest_transport()));
		let pipeline = RequestPipeline::with_transport(&test_config(base), transport.clone());

		(pipeline, transport)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use futures;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
