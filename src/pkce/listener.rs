// std
use std::{io, net::SocketAddr};
// crates.io
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::{TcpListener, TcpStream},
};
// self
use crate::_prelude::*;

pub(super) const CALLBACK_PATH: &str = "/callback";

const MAX_HEAD_LEN: usize = 8 * 1024;
const HEAD_READ_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// What the browser redirect reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Callback {
	/// Authorization code with a matching `state`.
	Code(String),
	/// The user (or the server) declined the request.
	Denied { reason: String },
	/// `state` was missing or belongs to another session.
	StateMismatch,
	/// Matching `state` but neither `code` nor `error`.
	Incomplete,
}

/// Loopback listener accepting the single authorization redirect of one session.
#[derive(Debug)]
pub(super) struct CallbackListener {
	listener: TcpListener,
	addr: SocketAddr,
}
impl CallbackListener {
	/// Binds an ephemeral port on the IPv4 loopback interface.
	pub(super) async fn bind() -> io::Result<Self> {
		let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
		let addr = listener.local_addr()?;

		Ok(Self { listener, addr })
	}

	pub(super) fn redirect_uri(&self) -> String {
		format!("http://{}{CALLBACK_PATH}", self.addr)
	}

	/// Serves requests until one hits the callback path, then closes the listener.
	///
	/// Requests on other paths (favicons, probes) get a `404` and do not consume the session.
	/// Connections that never send a request head are abandoned after a short read deadline.
	pub(super) async fn accept_callback(self, expected_state: &str) -> io::Result<Callback> {
		loop {
			let (mut stream, _) = self.listener.accept().await?;
			let Some(target) = read_request_target(&mut stream).await else {
				continue;
			};
			let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));

			if path != CALLBACK_PATH {
				respond(&mut stream, "404 Not Found", "").await;

				continue;
			}

			let callback = evaluate(query, expected_state);

			respond(&mut stream, "200 OK", &confirmation_page(&callback)).await;

			return Ok(callback);
		}
	}
}

async fn read_request_target(stream: &mut TcpStream) -> Option<String> {
	let mut head = Vec::with_capacity(1024);
	let mut chunk = [0_u8; 1024];
	let read = async {
		while !head.windows(4).any(|window| window == b"\r\n\r\n") && head.len() < MAX_HEAD_LEN {
			let n = stream.read(&mut chunk).await.ok()?;

			if n == 0 {
				break;
			}

			head.extend_from_slice(&chunk[..n]);
		}

		Some(())
	};

	tokio::time::timeout(HEAD_READ_TIMEOUT, read).await.ok()??;

	let head = String::from_utf8_lossy(&head);
	let mut parts = head.lines().next()?.split_whitespace();
	let _method = parts.next()?;

	parts.next().map(ToOwned::to_owned)
}

fn evaluate(query: &str, expected_state: &str) -> Callback {
	let mut params = BTreeMap::new();

	for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
		params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
	}

	if params.get("state").map(String::as_str) != Some(expected_state) {
		return Callback::StateMismatch;
	}
	if let Some(error) = params.get("error") {
		let reason = params.get("error_description").unwrap_or(error).clone();

		return Callback::Denied { reason };
	}

	match params.remove("code") {
		Some(code) if !code.is_empty() => Callback::Code(code),
		_ => Callback::Incomplete,
	}
}

fn confirmation_page(callback: &Callback) -> String {
	let (title, detail) = match callback {
		Callback::Code(_) => ("Authorization received", "You can close this window and return to the application."),
		Callback::Denied { .. } => ("Authorization declined", "The application was not granted access."),
		Callback::StateMismatch =>
			("Authorization rejected", "This response does not belong to a pending sign-in."),
		Callback::Incomplete => ("Authorization incomplete", "The response did not include an authorization code."),
	};

	format!(
		"<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
		 <body><h1>{title}</h1><p>{detail}</p></body></html>"
	)
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
	let response = format!(
		"HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\nCache-Control: no-store\r\n\r\n{body}",
		body.len()
	);

	// The browser may already be gone; the outcome does not depend on delivery.
	let _ = stream.write_all(response.as_bytes()).await;
	let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn state_is_checked_before_anything_else() {
		assert_eq!(evaluate("code=abc&state=other", "expected"), Callback::StateMismatch);
		assert_eq!(evaluate("code=abc", "expected"), Callback::StateMismatch);
		assert_eq!(evaluate("error=access_denied", "expected"), Callback::StateMismatch);
	}

	#[test]
	fn matching_state_yields_code_or_denial() {
		assert_eq!(evaluate("code=abc&state=s1", "s1"), Callback::Code("abc".into()));
		assert_eq!(
			evaluate("error=access_denied&error_description=user+cancelled&state=s1", "s1"),
			Callback::Denied { reason: "user cancelled".into() }
		);
		assert_eq!(
			evaluate("error=access_denied&state=s1", "s1"),
			Callback::Denied { reason: "access_denied".into() }
		);
		assert_eq!(evaluate("state=s1&code=", "s1"), Callback::Incomplete);
	}

	#[tokio::test]
	async fn other_paths_get_not_found_and_keep_waiting() {
		let listener = CallbackListener::bind().await.expect("Loopback bind should succeed.");
		let redirect = listener.redirect_uri();
		let addr = listener.addr;
		let server = tokio::spawn(listener.accept_callback("s1"));
		let mut probe = TcpStream::connect(addr).await.expect("Probe should connect.");

		probe
			.write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
			.await
			.expect("Probe should write.");

		let mut reply = String::new();

		probe.read_to_string(&mut reply).await.expect("Probe should read the reply.");

		assert!(reply.starts_with("HTTP/1.1 404"), "{reply}");
		assert!(redirect.ends_with("/callback"));

		let mut browser = TcpStream::connect(addr).await.expect("Redirect should connect.");

		browser
			.write_all(b"GET /callback?code=c0de&state=s1 HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
			.await
			.expect("Redirect should write.");

		let callback = server
			.await
			.expect("Listener task should not panic.")
			.expect("Listener should accept the redirect.");

		assert_eq!(callback, Callback::Code("c0de".into()));

		let mut page = String::new();

		browser.read_to_string(&mut page).await.expect("Browser should read the page.");

		assert!(page.starts_with("HTTP/1.1 200 OK"));
		assert!(page.contains("Authorization received"));
		assert!(TcpStream::connect(addr).await.is_err());
	}
}
