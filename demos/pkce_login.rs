//! Walks through an interactive PKCE login: print the authorization URL, wait for the browser
//! redirect on the loopback listener, and use the resulting token for one scoped call.
//!
//! Set `ROOKLINE_SITE` to target another server (for example `http://localhost:9663`).

// std
use std::{env, time::Duration};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use rookline::{
	auth::{ClientId, Scope, ScopeSet},
	config::ClientConfig,
	endpoint::catalog,
	pipeline::{RequestArgs, RequestPipeline},
	pkce::PkceAuthorizer,
};

#[derive(Debug, serde::Deserialize)]
struct Email {
	email: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let mut builder = ClientConfig::builder();

	if let Ok(site) = env::var("ROOKLINE_SITE") {
		builder = builder.site(site);
	}

	let config = builder.build()?;
	let pipeline = RequestPipeline::new(config)?;
	let authorizer = PkceAuthorizer::from_pipeline(&pipeline, ClientId::new("rookline-demo")?);
	let scopes = ScopeSet::new([Scope::EmailRead, Scope::ChallengeRead]);

	println!(
		"Prefer a personal token instead? Create one at {}.",
		authorizer.personal_token_url(&scopes, "rookline demo")
	);

	let (url, pending) = authorizer.begin(scopes, Duration::from_secs(120)).await?;

	println!("Open {url} in a browser to grant access.");
	println!("Waiting for the redirect on {}.", pending.redirect_uri());

	let grant = pending.wait().await?;

	println!("Received {grant:?}.");

	let email = pipeline
		.execute::<Email>(&catalog::ACCOUNT_EMAIL, RequestArgs::new(), Some(&grant.access_token))
		.await?
		.into_one()
		.map_err(|info| eyre!("Email lookup failed: {info}."))?;

	println!("Signed in as {}.", email.email);

	Ok(())
}
