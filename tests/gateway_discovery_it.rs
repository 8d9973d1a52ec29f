mod common;

// crates.io
use httpmock::{Method::HEAD, prelude::*};
use url::Url;
// self
use cf_access::token::{AppInfo, AppInfoError, AppInfoResolver, FetchError, TokenFetcher};

const LOGIN_REDIRECT: &str =
	"https://team.cloudflareaccess.com/cdn-cgi/access/login/app.example.com?kid=aud-discovery";

fn parse(raw: &str) -> Url {
	Url::parse(raw).expect("Mock server URL should parse.")
}

#[tokio::test]
async fn discovery_sends_identifying_user_agent() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(HEAD).path("/app").header("user-agent", "discovery-it/2.0");
			then.status(302)
				.header("location", LOGIN_REDIRECT)
				.header("cf-access-domain", "app.example.com/app");
		})
		.await;
	let resolver = common::test_resolver().with_user_agent("discovery-it/2.0");
	let info = resolver
		.resolve(&parse(&server.url("/app")))
		.await
		.expect("Login redirect should resolve.");

	assert_eq!(
		info,
		AppInfo::new("team.cloudflareaccess.com", "aud-discovery", "app.example.com/app")
	);

	mock.assert_async().await;
}

#[tokio::test]
async fn unprotected_origin_is_reported() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(HEAD).path("/");
			then.status(200);
		})
		.await;
	let resolver = common::test_resolver();
	let err = resolver
		.resolve(&parse(&server.url("/")))
		.await
		.expect_err("Plain origin should not resolve.");

	assert!(matches!(err, AppInfoError::NotProtected { .. }));

	mock.assert_async().await;
}

#[tokio::test]
async fn exchange_without_cookie_reports_status() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/").header("cf-access-client-id", "svc-id");
			then.status(403).body("denied");
		})
		.await;
	let fetcher = common::test_fetcher("svc-id", "wrong-secret");
	let app = AppInfo::new("team.example.com", "aud", "127.0.0.1");
	let err = fetcher
		.fetch(&parse(&server.url("/")), &app)
		.await
		.expect_err("Rejected exchange should fail.");

	assert!(matches!(err, FetchError::MissingAuthorization { status: 403 }));

	mock.assert_async().await;
}
