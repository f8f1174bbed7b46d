//! Interactive token acquisition through the OAuth 2.0 Authorization Code flow with PKCE.
//!
//! [`PkceAuthorizer::begin`] binds a loopback listener on an ephemeral port, returns the
//! authorization URL immediately, and hands back a [`PendingToken`] whose background task waits
//! for the browser redirect, validates `state`, and exchanges the code. The whole session is
//! bounded by the caller's timeout and can be cancelled at any point; the listener and any
//! in-flight exchange are dropped before the terminal status becomes observable.

mod exchange;
mod listener;
mod session;

pub use session::PkceStatus;

// crates.io
use tokio::{sync::oneshot, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TokenGrant},
	config::ClientConfig,
	error::{ConfigError, TransportError},
	obs::{self, OpSpan, OperationKind, OperationOutcome},
	pipeline::RequestPipeline,
	transport::ApiTransport,
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;
use exchange::ExchangeRequest;
use listener::{Callback, CallbackListener};
use session::{PkcePair, StatusCell};

/// Starts PKCE sessions for one OAuth client.
pub struct PkceAuthorizer<T>
where
	T: ApiTransport,
{
	transport: Arc<T>,
	config: Arc<ClientConfig>,
	client_id: ClientId,
}
#[cfg(feature = "reqwest")]
impl PkceAuthorizer<ReqwestTransport> {
	/// Builds an authorizer backed by a reqwest client derived from `config`.
	pub fn new(config: ClientConfig, client_id: ClientId) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self { transport: Arc::new(transport), config: Arc::new(config), client_id })
	}
}
impl<T> PkceAuthorizer<T>
where
	T: ApiTransport,
{
	/// Builds an authorizer around a caller-provided transport.
	pub fn with_transport(config: &ClientConfig, client_id: ClientId, transport: Arc<T>) -> Self {
		Self { transport, config: Arc::new(config.clone()), client_id }
	}

	/// Builds an authorizer sharing the pipeline's transport and configuration.
	pub fn from_pipeline(pipeline: &RequestPipeline<T>, client_id: ClientId) -> Self {
		Self::with_transport(pipeline.config(), client_id, pipeline.transport().clone())
	}

	/// OAuth client identifier sent with every session.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Starts a session and returns the authorization URL without waiting for the redirect.
	///
	/// The returned [`PendingToken`] resolves once the redirect arrives and the code exchange
	/// completes, or with the failure that ended the session. `timeout` bounds the whole session,
	/// exchange included. Must be called from within a Tokio runtime.
	pub async fn begin(&self, scopes: ScopeSet, timeout: StdDuration) -> Result<(Url, PendingToken)> {
		let status = StatusCell::new();
		let listener = CallbackListener::bind().await.map_err(TransportError::from)?;
		let redirect_uri = Url::parse(&listener.redirect_uri())
			.map_err(|source| ConfigError::InvalidUrl { field: "redirect_uri", source })?;
		let pkce = PkcePair::generate();
		let state = session::random_string(session::STATE_LEN);
		let authorize_url = session::build_authorize_url(
			&self.config.oauth.authorization,
			&self.client_id,
			&redirect_uri,
			&scopes,
			&state,
			&pkce,
		);

		status.advance(PkceStatus::AwaitingRedirect);

		let (cancel_tx, cancel_rx) = oneshot::channel();
		let session = PkceSession {
			transport: self.transport.clone(),
			config: self.config.clone(),
			client_id: self.client_id.to_string(),
			redirect_uri: redirect_uri.clone(),
			scopes,
			state,
			pkce,
			timeout,
			status: status.clone(),
		};
		let task = tokio::spawn(session.drive(listener, cancel_rx));

		Ok((authorize_url, PendingToken { status, redirect_uri, cancel: Some(cancel_tx), task: Some(task) }))
	}

	/// URL of the web page for creating a personal access token with `scopes` pre-selected.
	pub fn personal_token_url(&self, scopes: &ScopeSet, description: &str) -> Url {
		session::build_personal_token_url(&self.config.oauth.personal_token, scopes, description)
	}
}
impl<T> Debug for PkceAuthorizer<T>
where
	T: ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkceAuthorizer")
			.field("client_id", &self.client_id)
			.field("authorization", &self.config.oauth.authorization.as_str())
			.finish_non_exhaustive()
	}
}

/// Handle to a running PKCE session.
///
/// Dropping the handle cancels the session: the listener is closed and no exchange is issued.
#[derive(Debug)]
pub struct PendingToken {
	status: StatusCell,
	redirect_uri: Url,
	cancel: Option<oneshot::Sender<()>>,
	task: Option<JoinHandle<Result<TokenGrant>>>,
}
impl PendingToken {
	/// Current session status.
	pub fn status(&self) -> PkceStatus {
		self.status.get()
	}

	/// Loopback redirect URI registered for this session.
	pub fn redirect_uri(&self) -> &Url {
		&self.redirect_uri
	}

	/// Waits for the session to end and returns the token or the failure that ended it.
	pub async fn wait(mut self) -> Result<TokenGrant> {
		// Keep the cancel sender alive; dropping it would cancel the session.
		let _cancel = self.cancel.take();
		let Some(task) = self.task.take() else { return Err(Error::Cancelled) };

		task.await.unwrap_or(Err(Error::Cancelled))
	}

	/// Cancels the session and returns once the listener and any in-flight exchange are released.
	pub async fn cancel(mut self) {
		if let Some(cancel) = self.cancel.take() {
			let _ = cancel.send(());
		}
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

/// Everything one session needs once the listener is bound.
struct PkceSession<T>
where
	T: ApiTransport,
{
	transport: Arc<T>,
	config: Arc<ClientConfig>,
	client_id: String,
	redirect_uri: Url,
	scopes: ScopeSet,
	state: String,
	pkce: PkcePair,
	timeout: StdDuration,
	status: StatusCell,
}
impl<T> PkceSession<T>
where
	T: ApiTransport,
{
	async fn drive(
		self,
		listener: CallbackListener,
		cancel: oneshot::Receiver<()>,
	) -> Result<TokenGrant> {
		let span = OpSpan::new(OperationKind::Authorization, "pkce.session");

		obs::record_outcome(OperationKind::Authorization, OperationOutcome::Attempt);

		let outcome = span
			.instrument(async {
				let flow = self.run(listener);

				// Selecting drops the losing branch, so the listener and any exchange in flight are
				// released before the terminal status is published below.
				tokio::select! {
					biased;
					_ = cancel => Err(Error::Cancelled),
					result = tokio::time::timeout(self.timeout, flow) => match result {
						Ok(result) => result,
						Err(_) => Err(Error::Timeout { after: self.timeout }),
					},
				}
			})
			.await;
		let terminal = match &outcome {
			Ok(_) => PkceStatus::Exchanged,
			Err(Error::Cancelled) => PkceStatus::Cancelled,
			Err(Error::Timeout { .. }) => PkceStatus::TimedOut,
			Err(Error::Denied { .. }) => PkceStatus::Denied,
			Err(_) => PkceStatus::Failed,
		};

		self.status.advance(terminal);
		match &outcome {
			Ok(_) => obs::record_outcome(OperationKind::Authorization, OperationOutcome::Success),
			Err(e) => obs::record_failure(OperationKind::Authorization, e.kind()),
		}

		outcome
	}

	async fn run(&self, listener: CallbackListener) -> Result<TokenGrant> {
		let callback = listener.accept_callback(&self.state).await.map_err(TransportError::from)?;

		match callback {
			Callback::Code(code) => {
				self.status.advance(PkceStatus::CodeReceived);

				let request = ExchangeRequest {
					token_url: &self.config.oauth.token,
					client_id: &self.client_id,
					redirect_uri: self.redirect_uri.as_str(),
					verifier: &self.pkce.verifier,
					user_agent: &self.config.user_agent,
					timeout: self.config.request_timeout,
				};

				exchange::exchange_code(self.transport.as_ref(), &request, &code, &self.scopes).await
			},
			Callback::Denied { reason } => Err(Error::Denied { reason }),
			Callback::StateMismatch => Err(Error::StateMismatch),
			Callback::Incomplete => Err(Error::Rejected {
				status: None,
				message: "Authorization redirect carried neither a code nor an error.".into(),
			}),
		}
	}
}
