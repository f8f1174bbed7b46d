//! Bearer credentials and the grants that carry them.

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Redacted bearer token wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token string, such as a personal access token.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the `Authorization` header value.
	pub(crate) fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Token issued by the token endpoint at the end of a PKCE exchange.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Bearer credential for subsequent requests.
	pub access_token: AccessToken,
	/// Token type reported by the server (normally `Bearer`).
	pub token_type: String,
	/// Scopes granted by the server, or the requested scopes when the server omits them.
	pub scope: ScopeSet,
	/// Instant the grant was received.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from `expires_in`, when the server reported one.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenGrant {
	/// Returns `true` if the grant has an expiry at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}

	/// Returns `true` if the grant is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::Scope;

	#[test]
	fn secret_formatters_redact() {
		let token = AccessToken::new("lip_super-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
		assert_eq!(token.bearer(), "Bearer lip_super-secret");
	}

	#[test]
	fn grant_expiry_is_optional() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let mut grant = TokenGrant {
			access_token: AccessToken::new("lio_token"),
			token_type: "Bearer".into(),
			scope: ScopeSet::from(Scope::BoardPlay),
			issued_at: issued,
			expires_at: None,
		};

		assert!(!grant.is_expired_at(issued + Duration::days(3650)));

		grant.expires_at = Some(issued + Duration::hours(1));

		assert!(!grant.is_expired_at(issued + Duration::minutes(59)));
		assert!(grant.is_expired_at(issued + Duration::hours(1)));
		assert!(!format!("{grant:?}").contains("lio_token"));
	}
}
