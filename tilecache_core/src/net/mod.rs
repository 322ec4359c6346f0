//! Network side of the cache: the HTTP client capability, the network availability
//! probe and the revalidation & fetch delegate built on top of them.

mod downloader;
mod reqwest_client;

pub use downloader::{Freshness, TileDownloader};
pub use reqwest_client::ReqwestClient;

use crate::{Blob, TransportError};
use async_trait::async_trait;

/// Tells whether it is worth trying the network at all.
pub trait NetworkAvailability: Send + Sync {
	fn is_network_available(&self) -> bool;
}

impl<F: Fn() -> bool + Send + Sync> NetworkAvailability for F {
	fn is_network_available(&self) -> bool {
		self()
	}
}

/// A probe that always reports the network as available.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysOnline;

impl NetworkAvailability for AlwaysOnline {
	fn is_network_available(&self) -> bool {
		true
	}
}

/// Status, headers and (for successful responses) body of an HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	pub status: u16,
	pub headers: Vec<(String, String)>,
	pub body: Blob,
}

impl HttpResponse {
	/// First value of the header `name`, compared case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self
			.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Performs HTTP GET requests with extra request headers.
///
/// Implementations buffer the whole body of `2xx` responses. Failures to connect must be
/// reported as [`TransportError::Connect`], everything else (timeouts, broken bodies) as
/// [`TransportError::Other`].
#[async_trait]
pub trait TileHttpClient: Send + Sync {
	async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn header_lookup_ignores_case() {
		let response = HttpResponse {
			status: 200,
			headers: vec![("ETag".to_string(), "\"v1\"".to_string())],
			body: Blob::new_empty(),
		};
		assert_eq!(response.header("etag"), Some("\"v1\""));
		assert_eq!(response.header("ETAG"), Some("\"v1\""));
		assert_eq!(response.header("content-type"), None);
	}

	#[test]
	fn closures_are_network_probes() {
		let offline = || false;
		assert!(!offline.is_network_available());
		assert!(AlwaysOnline.is_network_available());
	}
}
