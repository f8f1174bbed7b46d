//! A representative set of descriptors for commonly used remote operations.
//!
//! Resource wrappers are free to declare their own descriptors; these exist so callers and demos
//! have ready-made values for the operations exercised most often.

// self
use crate::{
	auth::Scope,
	endpoint::{EmptyBody, EndpointDescriptor},
};

/// Stream of incoming events (challenges, game starts) for the authenticated account.
pub const STREAM_EVENTS: EndpointDescriptor =
	EndpointDescriptor::get("stream.events", "/api/stream/event").stream().scope(Scope::ChallengeRead);

/// Stream of board state updates for one game.
pub const STREAM_BOARD_GAME: EndpointDescriptor =
	EndpointDescriptor::get("board.game.stream", "/api/board/game/stream/{gameId}")
		.stream()
		.scope(Scope::BoardPlay);

/// Email address of the authenticated account.
pub const ACCOUNT_EMAIL: EndpointDescriptor =
	EndpointDescriptor::get("account.email", "/api/account/email").scope(Scope::EmailRead);

/// Online, playing, and streaming status of up to 100 users (`ids` query parameter).
pub const USERS_STATUS: EndpointDescriptor =
	EndpointDescriptor::get("users.status", "/api/users/status").list();

/// Current TV channels.
pub const TV_CHANNELS: EndpointDescriptor = EndpointDescriptor::get("tv.channels", "/api/tv/channels");

/// Challenge another player.
pub const CHALLENGE_CREATE: EndpointDescriptor =
	EndpointDescriptor::post("challenge.create", "/api/challenge/{username}").scope(Scope::ChallengeWrite);

/// Accept an incoming challenge.
pub const CHALLENGE_ACCEPT: EndpointDescriptor =
	EndpointDescriptor::post("challenge.accept", "/api/challenge/{challengeId}/accept")
		.scope(Scope::ChallengeWrite);

/// Decline an incoming challenge, optionally with a `reason` form field.
pub const CHALLENGE_DECLINE: EndpointDescriptor =
	EndpointDescriptor::post("challenge.decline", "/api/challenge/{challengeId}/decline")
		.scope(Scope::ChallengeWrite);

/// Cancel an outgoing challenge.
pub const CHALLENGE_CANCEL: EndpointDescriptor =
	EndpointDescriptor::post("challenge.cancel", "/api/challenge/{challengeId}/cancel")
		.scope(Scope::ChallengeWrite);

/// Search teams by name, one page at a time.
pub const TEAM_SEARCH: EndpointDescriptor =
	EndpointDescriptor::get("team.search", "/api/team/search").paginated("nextPage", "page");

/// Join a team, optionally with a `message` and `password` form field.
pub const TEAM_JOIN: EndpointDescriptor =
	EndpointDescriptor::post("team.join", "/team/{teamId}/join").scope(Scope::TeamWrite);

/// Leave a team.
pub const TEAM_QUIT: EndpointDescriptor =
	EndpointDescriptor::post("team.quit", "/team/{teamId}/quit").scope(Scope::TeamWrite);

/// Remove a member from a team the account leads.
pub const TEAM_KICK: EndpointDescriptor =
	EndpointDescriptor::post("team.kick", "/api/team/{teamId}/kick/{userId}").scope(Scope::TeamWrite);

/// Pending join requests of a team the account leads.
pub const TEAM_REQUESTS: EndpointDescriptor =
	EndpointDescriptor::get("team.requests", "/api/team/{teamId}/requests").list().scope(Scope::TeamRead);

/// Revoke the token used to make the request.
pub const TOKEN_REVOKE: EndpointDescriptor =
	EndpointDescriptor::delete("token.revoke", "/api/token").empty_body(EmptyBody::Null);
