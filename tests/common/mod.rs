//! Helpers shared by the reqwest-backed integration tests.

#![allow(dead_code)]

// crates.io
use cf_access::{
	reqwest::{Client, redirect::Policy},
	token::{GatewayAppInfoResolver, ServiceTokenFetcher},
	transport::ReqwestHttpClient,
};

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Same as [`test_reqwest_http_client`], but hands 3xx responses back untouched as discovery
/// and the service-token exchange require.
pub fn test_reqwest_http_client_without_redirects() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build insecure non-redirecting Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Gateway discovery over the non-redirecting test client.
pub fn test_resolver() -> GatewayAppInfoResolver<ReqwestHttpClient> {
	GatewayAppInfoResolver::with_http_client(test_reqwest_http_client_without_redirects())
}

/// Service-token exchange over the non-redirecting test client.
pub fn test_fetcher(
	client_id: &str,
	client_secret: &str,
) -> ServiceTokenFetcher<ReqwestHttpClient> {
	ServiceTokenFetcher::with_http_client(
		test_reqwest_http_client_without_redirects(),
		client_id,
		client_secret,
	)
}
