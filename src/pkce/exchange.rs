// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, TokenGrant},
	endpoint::{BodyEncoding, HttpMethod},
	transport::{
		self, ApiTransport, HEADER_ACCEPT, HEADER_CONTENT_TYPE, HEADER_USER_AGENT, PreparedRequest,
	},
};

/// Parameters of the authorization-code exchange.
#[derive(Clone)]
pub(super) struct ExchangeRequest<'a> {
	pub(super) token_url: &'a Url,
	pub(super) client_id: &'a str,
	pub(super) redirect_uri: &'a str,
	pub(super) verifier: &'a str,
	pub(super) user_agent: &'a str,
	pub(super) timeout: Option<StdDuration>,
}
impl ExchangeRequest<'_> {
	fn prepare(&self, code: &str) -> PreparedRequest {
		let body = url::form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", "authorization_code")
			.append_pair("code", code)
			.append_pair("redirect_uri", self.redirect_uri)
			.append_pair("client_id", self.client_id)
			.append_pair("code_verifier", self.verifier)
			.finish();
		let mut request = PreparedRequest::new(HttpMethod::Post, self.token_url.clone())
			.with_header(HEADER_ACCEPT, "application/json")
			.with_header(HEADER_USER_AGENT, self.user_agent)
			.with_header(HEADER_CONTENT_TYPE, BodyEncoding::Form.content_type());

		request.body = Some(body.into_bytes());
		request.timeout = self.timeout;

		request
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default = "default_token_type")]
	token_type: String,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	scope: Option<String>,
}

fn default_token_type() -> String {
	"Bearer".into()
}

/// Trades `code` for a token with one form POST through `transport`.
pub(super) async fn exchange_code<T>(
	transport: &T,
	request: &ExchangeRequest<'_>,
	code: &str,
	requested: &ScopeSet,
) -> Result<TokenGrant>
where
	T: ApiTransport,
{
	let response = transport.send(request.prepare(code)).await?;
	let status = response.status;
	let success = response.is_success();
	let body = response.into_bytes().await?;

	if !success {
		let message = transport::error_message(&body)
			.unwrap_or_else(|| format!("Token endpoint answered with HTTP {status}."));

		return Err(Error::Rejected { status: Some(status), message });
	}

	let mut de = serde_json::Deserializer::from_slice(&body);
	let parsed: TokenResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| Error::Decode { source, status: Some(status) })?;
	let issued_at = OffsetDateTime::now_utc();
	let scope = match parsed.scope.as_deref() {
		Some(granted) if !granted.trim().is_empty() => ScopeSet::parse(granted),
		_ => requested.clone(),
	};

	Ok(TokenGrant {
		access_token: AccessToken::new(parsed.access_token),
		token_type: parsed.token_type,
		scope,
		issued_at,
		expires_at: expiry(issued_at, parsed.expires_in),
	})
}

// Lifetimes past the representable calendar are treated as non-expiring.
fn expiry(issued_at: OffsetDateTime, expires_in: Option<i64>) -> Option<OffsetDateTime> {
	let secs = expires_in.filter(|secs| *secs > 0)?;

	issued_at.checked_add(Duration::seconds(secs))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::transport::{RawResponse, TransportFuture};

	struct CannedToken {
		status: u16,
		body: &'static str,
	}
	impl ApiTransport for CannedToken {
		fn send(&self, _: PreparedRequest) -> TransportFuture<'_, RawResponse> {
			let response = RawResponse::from_bytes(self.status, self.body);

			Box::pin(async move { Ok(response) })
		}
	}

	fn exchange_request(token_url: &Url) -> ExchangeRequest<'_> {
		ExchangeRequest {
			token_url,
			client_id: "rookline-tests",
			redirect_uri: "http://127.0.0.1:9/callback",
			verifier: "verifier",
			user_agent: "rookline-tests",
			timeout: None,
		}
	}

	async fn exchange(status: u16, body: &'static str) -> Result<TokenGrant> {
		let token_url = Url::parse("https://lichess.org/api/token").expect("Token URL should parse.");

		exchange_code(
			&CannedToken { status, body },
			&exchange_request(&token_url),
			"code",
			&ScopeSet::from(crate::auth::Scope::BoardPlay),
		)
		.await
	}

	#[tokio::test]
	async fn lifetimes_set_the_expiry() {
		let grant = exchange(200, r#"{"access_token":"lio_x","expires_in":3600}"#)
			.await
			.expect("Valid token body should exchange.");
		let expires_at = grant.expires_at.expect("Positive lifetime should set an expiry.");

		assert_eq!(expires_at - grant.issued_at, Duration::seconds(3600));
		assert_eq!(grant.token_type, "Bearer");
		assert!(grant.scope.contains(crate::auth::Scope::BoardPlay));
	}

	#[tokio::test]
	async fn out_of_range_lifetimes_do_not_panic() {
		let grant = exchange(200, r#"{"access_token":"lio_x","expires_in":9223372036854775807}"#)
			.await
			.expect("Huge lifetimes should still exchange.");

		assert_eq!(grant.expires_at, None);
		assert_eq!(grant.access_token.expose(), "lio_x");

		let grant = exchange(200, r#"{"access_token":"lio_x","expires_in":-5}"#)
			.await
			.expect("Negative lifetimes should still exchange.");

		assert_eq!(grant.expires_at, None);
	}

	#[tokio::test]
	async fn rejections_carry_the_status() {
		let err = exchange(400, r#"{"error":"invalid_grant"}"#)
			.await
			.expect_err("Non-2xx must fail.");

		assert!(matches!(
			err,
			Error::Rejected { status: Some(400), ref message } if message == "invalid_grant"
		));
	}
}
