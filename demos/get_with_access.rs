//! Fetches a Cloudflare Access protected page with whatever token the local cache holds and
//! prints the body.

// crates.io
use color_eyre::Report;
// self
use cf_access::get_with_access;

#[tokio::main]
async fn main() {
	const APP_URL: &str = "https://access-tester.pages.dev";

	match get_with_access(APP_URL, &[]).await {
		Ok(body) => println!("Response: {}", String::from_utf8_lossy(&body)),
		Err(e) => println!("Error: {:#}", Report::new(e)),
	}
}
