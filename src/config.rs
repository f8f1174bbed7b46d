//! Client configuration: base URLs, user agent, and timeouts.
//!
//! [`ClientConfigBuilder`] accepts raw strings so callers can feed values from
//! flags or environment variables; [`ClientConfigBuilder::build`] validates them
//! once and derives the OAuth endpoints used by [`PkceAuthorizer`](crate::pkce::PkceAuthorizer).

// self
use crate::{_prelude::*, error::ConfigError};

const PRODUCTION_SITE: &str = "https://lichess.org";
const DEVELOPMENT_SITE: &str = "https://lichess.dev";
const LOCAL_SITE: &str = "http://localhost:9663";
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// OAuth endpoints derived from the configured site and API base URLs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthEndpoints {
	/// Authorization endpoint the user's browser visits.
	pub authorization: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// Web page for creating personal access tokens.
	pub personal_token: Url,
}

/// Validated client configuration shared by the pipeline, transport, and authorizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Website base URL (authorization pages).
	pub site: Url,
	/// API base URL every endpoint path is resolved against.
	pub api: Url,
	/// OAuth endpoints derived from `site` and `api`.
	pub oauth: OAuthEndpoints,
	/// `User-Agent` header value sent with every request.
	pub user_agent: String,
	/// Overall timeout for buffered requests; streams are never cut short by it.
	pub request_timeout: Option<StdDuration>,
	/// Timeout for establishing connections.
	pub connect_timeout: StdDuration,
}
impl ClientConfig {
	/// Creates a builder seeded with the production site.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Resolves an endpoint path (leading `/` optional) against the API base URL.
	pub fn api_url(&self, path: &str) -> Result<Url, url::ParseError> {
		self.api.join(path.trim_start_matches('/'))
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	/// Website base URL.
	pub site: String,
	/// API base URL; falls back to `site` when unset.
	pub api: Option<String>,
	/// `User-Agent` header value.
	pub user_agent: String,
	/// Overall timeout for buffered requests.
	pub request_timeout: Option<StdDuration>,
	/// Timeout for establishing connections.
	pub connect_timeout: StdDuration,
}
impl ClientConfigBuilder {
	/// Targets the production servers.
	pub fn production(self) -> Self {
		self.site(PRODUCTION_SITE)
	}

	/// Targets the public development servers.
	pub fn development(self) -> Self {
		self.site(DEVELOPMENT_SITE)
	}

	/// Targets a server running on the local machine.
	pub fn local(self) -> Self {
		self.site(LOCAL_SITE)
	}

	/// Sets the website base URL.
	pub fn site(mut self, url: impl Into<String>) -> Self {
		self.site = url.into();

		self
	}

	/// Sets a distinct API base URL.
	pub fn api(mut self, url: impl Into<String>) -> Self {
		self.api = Some(url.into());

		self
	}

	/// Overrides the `User-Agent` header value.
	pub fn user_agent(mut self, value: impl Into<String>) -> Self {
		self.user_agent = value.into();

		self
	}

	/// Overrides the buffered request timeout; `None` waits indefinitely.
	pub fn request_timeout(mut self, timeout: Option<StdDuration>) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the connect timeout.
	pub fn connect_timeout(mut self, timeout: StdDuration) -> Self {
		self.connect_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let site = parse_base("site", &self.site)?;
		let api = match self.api.as_deref() {
			Some(raw) => parse_base("api", raw)?,
			None => site.clone(),
		};
		let oauth = OAuthEndpoints {
			authorization: join("site", &site, "oauth")?,
			token: join("api", &api, "api/token")?,
			personal_token: join("site", &site, "account/oauth/token/create")?,
		};

		Ok(ClientConfig {
			site,
			api,
			oauth,
			user_agent: self.user_agent,
			request_timeout: self.request_timeout,
			connect_timeout: self.connect_timeout,
		})
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		Self {
			site: PRODUCTION_SITE.into(),
			api: None,
			user_agent: DEFAULT_USER_AGENT.into(),
			request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
		}
	}
}

fn parse_base(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let mut url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::UnsupportedScheme { field, url: url.to_string() });
	}
	if url.cannot_be_a_base() || url.query().is_some() || url.fragment().is_some() {
		return Err(ConfigError::NotABase { field, url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}

fn join(field: &'static str, base: &Url, path: &str) -> Result<Url, ConfigError> {
	base.join(path).map_err(|source| ConfigError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn production_defaults_derive_oauth_endpoints() {
		let config = ClientConfig::builder().build().expect("Default configuration should build.");

		assert_eq!(config.site.as_str(), "https://lichess.org/");
		assert_eq!(config.api, config.site);
		assert_eq!(config.oauth.authorization.as_str(), "https://lichess.org/oauth");
		assert_eq!(config.oauth.token.as_str(), "https://lichess.org/api/token");
		assert_eq!(
			config.oauth.personal_token.as_str(),
			"https://lichess.org/account/oauth/token/create"
		);
		assert!(config.user_agent.starts_with("rookline/"));
	}

	#[test]
	fn nested_base_paths_keep_their_prefix() {
		let config = ClientConfig::builder()
			.local()
			.api("http://127.0.0.1:8080/proxy")
			.build()
			.expect("Local configuration should build.");

		assert_eq!(config.site.as_str(), "http://localhost:9663/");
		assert_eq!(config.oauth.token.as_str(), "http://127.0.0.1:8080/proxy/api/token");
		assert_eq!(
			config.api_url("/api/account").expect("API path should resolve.").as_str(),
			"http://127.0.0.1:8080/proxy/api/account"
		);
	}

	#[test]
	fn invalid_bases_are_rejected() {
		let err = ClientConfig::builder().site("not a url").build().expect_err("Garbage must fail.");

		assert!(matches!(err, ConfigError::InvalidUrl { field: "site", .. }));

		let err = ClientConfig::builder()
			.site("ftp://lichess.org")
			.build()
			.expect_err("Non-HTTP schemes must fail.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { field: "site", .. }));

		let err = ClientConfig::builder()
			.api("https://lichess.org/?x=1")
			.build()
			.expect_err("Bases with queries must fail.");

		assert!(matches!(err, ConfigError::NotABase { field: "api", .. }));
	}

	#[test]
	fn config_serializes_round_trip() {
		let config = ClientConfig::builder().development().build().expect("Config should build.");
		let json = serde_json::to_string(&config).expect("Config should serialize.");
		let parsed: ClientConfig = serde_json::from_str(&json).expect("Config should deserialize.");

		assert_eq!(parsed, config);
	}
}
