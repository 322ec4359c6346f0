//! [`TileHttpClient`] on top of `reqwest`.

use super::{HttpResponse, TileHttpClient};
use crate::{Blob, CacheConfig, TransportError};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// HTTP client used for all tile downloads.
///
/// Sends every request with the configured `User-Agent` and gives up after the configured
/// request timeout.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
	client: Client,
}

impl ReqwestClient {
	pub fn new(user_agent: &str, timeout: Duration) -> Result<ReqwestClient> {
		let client = Client::builder()
			.user_agent(user_agent)
			.timeout(timeout)
			.tcp_keepalive(Duration::from_secs(600))
			.build()?;
		Ok(ReqwestClient { client })
	}

	pub fn from_config(config: &CacheConfig) -> Result<ReqwestClient> {
		ReqwestClient::new(&config.user_agent, config.request_timeout)
	}
}

#[async_trait]
impl TileHttpClient for ReqwestClient {
	async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
		let mut request = self.client.get(url);
		for (name, value) in headers {
			request = request.header(*name, *value);
		}

		let response = request.send().await.map_err(classify)?;
		let status = response.status();
		let response_headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
			.collect();

		// only successful bodies are of interest, error pages are dropped unread
		let body = if status.is_success() {
			Blob::from(response.bytes().await.map_err(classify)?.to_vec())
		} else {
			Blob::new_empty()
		};

		Ok(HttpResponse {
			status: status.as_u16(),
			headers: response_headers,
			body,
		})
	}
}

fn classify(error: reqwest::Error) -> TransportError {
	let message = error_chain(&error);
	if error.is_connect() && !error.is_timeout() {
		TransportError::Connect(message)
	} else {
		TransportError::Other(message)
	}
}

fn error_chain(error: &dyn std::error::Error) -> String {
	let mut message = error.to_string();
	let mut source = error.source();
	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}
	message
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn refused_connection_is_a_connect_error() {
		// bind and drop a listener to get a port nobody listens on
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();
		drop(listener);

		let client = ReqwestClient::new("tilecache-test", Duration::from_secs(5)).unwrap();
		let error = client
			.get(&format!("http://127.0.0.1:{port}/0/0/0.png"), &[])
			.await
			.unwrap_err();
		assert!(matches!(error, TransportError::Connect(_)), "{error:?}");
	}

	#[tokio::test]
	async fn malformed_url_is_another_transport_error() {
		let client = ReqwestClient::new("tilecache-test", Duration::from_secs(5)).unwrap();
		let error = client.get("not a url", &[]).await.unwrap_err();
		assert!(matches!(error, TransportError::Other(_)), "{error:?}");
	}
}
