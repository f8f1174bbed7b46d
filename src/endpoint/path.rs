// std
use std::collections::BTreeSet;
// self
use crate::{_prelude::*, endpoint::EndpointDescriptor, error::ConfigError};

/// Resolves `descriptor.path` against `base`, substituting every `{name}` placeholder.
///
/// Values are percent-encoded as single path segments, so a value containing `/`, `?`, or `#` can
/// never escape its segment. Values that would leave a `.` or `..` segment are rejected, since URL
/// normalization would drop them and point the request at a different endpoint.
pub(crate) fn resolve_url(
	base: &Url,
	descriptor: &EndpointDescriptor,
	args: &[(String, String)],
) -> Result<Url, ConfigError> {
	let mut url = base.clone();
	let mut used = BTreeSet::new();

	{
		let mut segments = url
			.path_segments_mut()
			.map_err(|_| ConfigError::NotABase { field: "api", url: base.to_string() })?;

		segments.pop_if_empty();

		for raw in descriptor.path.trim_start_matches('/').split('/') {
			let segment = substitute(descriptor.name, raw, args, &mut used)?;

			segments.push(&segment);
		}
	}

	if let Some((name, _)) = args.iter().find(|(name, _)| !used.contains(name.as_str())) {
		return Err(ConfigError::UnexpectedPathArgument {
			endpoint: descriptor.name,
			name: name.clone(),
		});
	}

	Ok(url)
}

pub(crate) fn placeholders(template: &'static str) -> Vec<&'static str> {
	let mut names = Vec::new();
	let mut rest = template;

	while let Some(open) = rest.find('{') {
		let Some(len) = rest[open + 1..].find('}') else { break };

		names.push(&rest[open + 1..open + 1 + len]);

		rest = &rest[open + len + 2..];
	}

	names
}

fn substitute<'a>(
	endpoint: &'static str,
	segment: &str,
	args: &'a [(String, String)],
	used: &mut BTreeSet<&'a str>,
) -> Result<String, ConfigError> {
	let mut out = String::with_capacity(segment.len());
	let mut rest = segment;
	let mut last = None;

	while let Some(open) = rest.find('{') {
		out.push_str(&rest[..open]);

		let tail = &rest[open + 1..];
		let close = tail.find('}').ok_or(ConfigError::MalformedTemplate { endpoint })?;
		let name = &tail[..close];

		if name.is_empty() || name.contains('{') {
			return Err(ConfigError::MalformedTemplate { endpoint });
		}

		let (key, value) = args
			.iter()
			.find(|(key, _)| key == name)
			.ok_or_else(|| ConfigError::MissingPathArgument { endpoint, name: name.to_owned() })?;

		used.insert(key.as_str());
		out.push_str(value);

		last = Some(name);

		rest = &tail[close + 1..];
	}

	if rest.contains('}') {
		return Err(ConfigError::MalformedTemplate { endpoint });
	}

	out.push_str(rest);

	if let (Some(name), "." | "..") = (last, out.as_str()) {
		return Err(ConfigError::DotSegmentArgument { endpoint, name: name.to_owned() });
	}

	Ok(out)
}
