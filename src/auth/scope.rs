//! Permission scopes recognized by the remote API and their wire strings.

// std
use std::{collections::BTreeSet, slice::Iter};
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// A named permission grant limiting what an access token may be used for.
///
/// The wire form replaces the `_` separator of the symbolic name with `:`
/// (`preference_read` ↔ `preference:read`); the wildcard travels as `*`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
	/// Read account preferences.
	PreferenceRead,
	/// Write account preferences.
	PreferenceWrite,
	/// Read the account email address.
	EmailRead,
	/// Read incoming challenges.
	ChallengeRead,
	/// Create, accept, and decline challenges.
	ChallengeWrite,
	/// Create, delete, and query bulk pairings.
	ChallengeBulk,
	/// Read private studies and broadcasts.
	StudyRead,
	/// Create, update, and delete studies and broadcasts.
	StudyWrite,
	/// Create tournaments.
	TournamentWrite,
	/// Read puzzle activity.
	PuzzleRead,
	/// Read private team information.
	TeamRead,
	/// Join, leave, and manage teams.
	TeamWrite,
	/// Send private messages to other players.
	MsgWrite,
	/// Play with the Board API.
	BoardPlay,
	/// Play with the Bot API; bot accounts only.
	BotPlay,
	/// Follow and unfollow players.
	FollowWrite,
	/// Create authenticated website sessions; grants full access.
	WebLogin,
	/// Moderator access.
	WebMod,
	/// Wildcard matching every scope.
	Any,
}
impl Scope {
	/// Every scope, in declaration order.
	pub const ALL: [Scope; 19] = [
		Scope::PreferenceRead,
		Scope::PreferenceWrite,
		Scope::EmailRead,
		Scope::ChallengeRead,
		Scope::ChallengeWrite,
		Scope::ChallengeBulk,
		Scope::StudyRead,
		Scope::StudyWrite,
		Scope::TournamentWrite,
		Scope::PuzzleRead,
		Scope::TeamRead,
		Scope::TeamWrite,
		Scope::MsgWrite,
		Scope::BoardPlay,
		Scope::BotPlay,
		Scope::FollowWrite,
		Scope::WebLogin,
		Scope::WebMod,
		Scope::Any,
	];

	/// Returns the wire string sent to and received from the remote API.
	pub const fn as_wire(self) -> &'static str {
		match self {
			Scope::PreferenceRead => "preference:read",
			Scope::PreferenceWrite => "preference:write",
			Scope::EmailRead => "email:read",
			Scope::ChallengeRead => "challenge:read",
			Scope::ChallengeWrite => "challenge:write",
			Scope::ChallengeBulk => "challenge:bulk",
			Scope::StudyRead => "study:read",
			Scope::StudyWrite => "study:write",
			Scope::TournamentWrite => "tournament:write",
			Scope::PuzzleRead => "puzzle:read",
			Scope::TeamRead => "team:read",
			Scope::TeamWrite => "team:write",
			Scope::MsgWrite => "msg:write",
			Scope::BoardPlay => "board:play",
			Scope::BotPlay => "bot:play",
			Scope::FollowWrite => "follow:write",
			Scope::WebLogin => "web:login",
			Scope::WebMod => "web:mod",
			Scope::Any => "*",
		}
	}

	/// Parses a wire string; unknown scopes yield `None` so newer server vocabularies never fail
	/// older clients.
	pub fn from_wire(wire: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|scope| scope.as_wire() == wire)
	}
}
impl Display for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_wire())
	}
}
impl Serialize for Scope {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_wire())
	}
}
impl<'de> Deserialize<'de> for Scope {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let wire = String::deserialize(deserializer)?;

		Scope::from_wire(&wire).ok_or_else(|| DeError::custom(format!("unknown scope `{wire}`")))
	}
}

/// Normalized, deduplicated, ordered set of [`Scope`] values.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeSet {
	scopes: Arc<[Scope]>,
}
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I>(scopes: I) -> Self
	where
		I: IntoIterator<Item = Scope>,
	{
		let set = scopes.into_iter().collect::<BTreeSet<_>>();

		Self { scopes: Arc::from(set.into_iter().collect::<Vec<_>>()) }
	}

	/// Parses a space- or comma-delimited wire string, skipping scopes this client does not know.
	pub fn parse(wire: &str) -> Self {
		Self::new(
			wire.split(|c: char| c == ',' || c.is_whitespace())
				.filter(|value| !value.is_empty())
				.filter_map(Scope::from_wire),
		)
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the set literally contains `scope`.
	pub fn contains(&self, scope: Scope) -> bool {
		self.scopes.binary_search(&scope).is_ok()
	}

	/// Returns true if a token holding this set may be used where `scope` is required.
	pub fn covers(&self, scope: Scope) -> bool {
		self.contains(Scope::Any) || self.contains(scope)
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
		self.scopes.iter().copied()
	}

	/// Joins the wire strings with `delimiter`.
	pub fn to_wire(&self, delimiter: char) -> String {
		let mut buf = String::new();

		for (idx, scope) in self.scopes.iter().enumerate() {
			if idx > 0 {
				buf.push(delimiter);
			}

			buf.push_str(scope.as_wire());
		}

		buf
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.to_wire(' '))
	}
}
impl FromIterator<Scope> for ScopeSet {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = Scope>,
	{
		Self::new(iter)
	}
}
impl From<Scope> for ScopeSet {
	fn from(scope: Scope) -> Self {
		Self::new([scope])
	}
}

/// Iterator over the scopes of a [`ScopeSet`].
pub struct ScopeIter<'a> {
	inner: Iter<'a, Scope>,
}
impl Iterator for ScopeIter<'_> {
	type Item = Scope;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().copied()
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = ScopeIter<'a>;
	type Item = Scope;

	fn into_iter(self) -> Self::IntoIter {
		ScopeIter { inner: self.scopes.iter() }
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope.as_wire())?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		Ok(values.iter().filter_map(|value| Scope::from_wire(value)).collect())
	}
}
