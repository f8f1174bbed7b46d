// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeSet, obs};

pub(super) const STATE_LEN: usize = 32;

const PKCE_VERIFIER_LEN: usize = 64;
const PKCE_METHOD: &str = "S256";

/// Lifecycle of a PKCE authorization session.
///
/// `Exchanged`, `Denied`, `TimedOut`, `Failed`, and `Cancelled` are terminal; once one is reached
/// the status never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PkceStatus {
	/// Session created; the loopback listener is not bound yet.
	Started,
	/// Listener bound; waiting for the browser redirect.
	AwaitingRedirect,
	/// Redirect carried an authorization code; the exchange is in flight.
	CodeReceived,
	/// Token obtained.
	Exchanged,
	/// The user declined the request.
	Denied,
	/// No usable redirect (or exchange response) arrived before the deadline.
	TimedOut,
	/// State mismatch, malformed redirect, or failed exchange.
	Failed,
	/// The caller cancelled the session or dropped its handle.
	Cancelled,
}
impl PkceStatus {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			PkceStatus::Started => "started",
			PkceStatus::AwaitingRedirect => "awaiting_redirect",
			PkceStatus::CodeReceived => "code_received",
			PkceStatus::Exchanged => "exchanged",
			PkceStatus::Denied => "denied",
			PkceStatus::TimedOut => "timed_out",
			PkceStatus::Failed => "failed",
			PkceStatus::Cancelled => "cancelled",
		}
	}

	/// Returns `true` for states that end the session.
	pub const fn is_terminal(self) -> bool {
		matches!(
			self,
			PkceStatus::Exchanged
				| PkceStatus::Denied
				| PkceStatus::TimedOut
				| PkceStatus::Failed
				| PkceStatus::Cancelled
		)
	}
}
impl Display for PkceStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Shared status cell observed by [`PendingToken`](crate::pkce::PendingToken) and written by the
/// session task.
#[derive(Clone, Debug)]
pub(super) struct StatusCell(Arc<RwLock<PkceStatus>>);
impl StatusCell {
	pub(super) fn new() -> Self {
		Self(Arc::new(RwLock::new(PkceStatus::Started)))
	}

	pub(super) fn get(&self) -> PkceStatus {
		*self.0.read()
	}

	/// Moves to `next` unless a terminal state was already reached.
	pub(super) fn advance(&self, next: PkceStatus) -> bool {
		let mut current = self.0.write();

		if current.is_terminal() {
			return false;
		}

		obs::trace_transition(current.as_str(), next.as_str());

		*current = next;

		true
	}
}

#[derive(Clone)]
pub(super) struct PkcePair {
	pub(super) verifier: String,
	pub(super) challenge: String,
}
impl PkcePair {
	pub(super) fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge }
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.finish()
	}
}

pub(super) fn build_authorize_url(
	authorization: &Url,
	client_id: &str,
	redirect_uri: &Url,
	scopes: &ScopeSet,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	if !scopes.is_empty() {
		pairs.append_pair("scope", &scopes.to_wire(' '));
	}

	pairs.append_pair("code_challenge_method", PKCE_METHOD);
	pairs.append_pair("code_challenge", &pkce.challenge);
	pairs.append_pair("state", state);

	drop(pairs);

	url
}

pub(super) fn build_personal_token_url(page: &Url, scopes: &ScopeSet, description: &str) -> Url {
	let mut url = page.clone();
	let mut pairs = url.query_pairs_mut();

	for scope in scopes {
		pairs.append_pair("scopes[]", scope.as_wire());
	}

	pairs.append_pair("description", description);

	drop(pairs);

	url
}

pub(super) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
