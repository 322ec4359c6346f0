//! Test doubles for the tile source, the HTTP client and the network probe.
//!
//! Compiled for the crate's own tests and, with the `test` feature, for dependent crates.

use crate::{
	Blob, DecodeError, TileKey, TransportError,
	net::{HttpResponse, NetworkAvailability, TileHttpClient},
	source::TileSource,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
	path::PathBuf,
	sync::atomic::{AtomicBool, Ordering},
};

/// A tile source whose "images" are the raw tile bytes.
///
/// Tiles are stored below `{layer}/{level}/{x}/{y}` and fetched from
/// `http://tiles.test/{layer}/{level}/{x}/{y}` unless configured otherwise.
#[derive(Clone, Debug)]
pub struct MockTileSource {
	base_url: Option<String>,
	decode_error: Option<DecodeError>,
}

impl MockTileSource {
	#[must_use]
	pub fn new() -> Self {
		MockTileSource {
			base_url: Some("http://tiles.test/".to_string()),
			decode_error: None,
		}
	}

	#[must_use]
	pub fn with_base_url(mut self, base_url: &str) -> Self {
		self.base_url = Some(base_url.to_string());
		self
	}

	/// A source that has no URL for any tile.
	#[must_use]
	pub fn without_url(mut self) -> Self {
		self.base_url = None;
		self
	}

	/// A source whose decoder always fails with `error`.
	#[must_use]
	pub fn with_decode_error(mut self, error: DecodeError) -> Self {
		self.decode_error = Some(error);
		self
	}
}

impl Default for MockTileSource {
	fn default() -> Self {
		Self::new()
	}
}

impl TileSource for MockTileSource {
	type Image = Blob;

	fn name(&self) -> &str {
		"mock"
	}

	fn url_for(&self, key: &TileKey) -> Option<String> {
		let base = self.base_url.as_ref()?;
		Some(format!("{base}{}/{}/{}/{}", key.layer, key.level, key.x, key.y))
	}

	fn relative_path_for(&self, key: &TileKey) -> PathBuf {
		[
			key.layer.clone(),
			key.level.to_string(),
			key.x.to_string(),
			key.y.to_string(),
		]
		.iter()
		.collect()
	}

	fn decode(&self, content: &Blob) -> Result<Blob, DecodeError> {
		match &self.decode_error {
			Some(error) => Err(error.clone()),
			None => Ok(content.clone()),
		}
	}
}

/// One request seen by [`MockHttpClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
	pub url: String,
	pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
	pub fn header(&self, name: &str) -> Option<&str> {
		self
			.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

type Handler = dyn Fn(&RecordedRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Scripted HTTP client that records every request.
pub struct MockHttpClient {
	handler: Box<Handler>,
	requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
	pub fn new(handler: impl Fn(&RecordedRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static) -> Self {
		MockHttpClient {
			handler: Box::new(handler),
			requests: Mutex::new(Vec::new()),
		}
	}

	/// Answers every request with the same response.
	pub fn always(status: u16, etag: Option<&str>, body: &[u8]) -> Self {
		let response = response(status, etag, body);
		MockHttpClient::new(move |_| Ok(response.clone()))
	}

	/// Fails every request with `error`.
	pub fn failing(error: TransportError) -> Self {
		MockHttpClient::new(move |_| Err(error.clone()))
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}

	pub fn request_count(&self) -> usize {
		self.requests.lock().len()
	}
}

#[async_trait]
impl TileHttpClient for MockHttpClient {
	async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
		let request = RecordedRequest {
			url: url.to_string(),
			headers: headers
				.iter()
				.map(|(name, value)| ((*name).to_string(), (*value).to_string()))
				.collect(),
		};
		let result = (self.handler)(&request);
		self.requests.lock().push(request);
		result
	}
}

/// Builds a response with an optional `ETag` header.
pub fn response(status: u16, etag: Option<&str>, body: &[u8]) -> HttpResponse {
	HttpResponse {
		status,
		headers: etag
			.map(|etag| vec![("ETag".to_string(), etag.to_string())])
			.unwrap_or_default(),
		body: Blob::from(body),
	}
}

/// Network probe that can be switched on and off.
#[derive(Debug)]
pub struct SwitchableNetwork(AtomicBool);

impl SwitchableNetwork {
	pub fn new(online: bool) -> Self {
		SwitchableNetwork(AtomicBool::new(online))
	}

	pub fn set_online(&self, online: bool) {
		self.0.store(online, Ordering::SeqCst);
	}
}

impl NetworkAvailability for SwitchableNetwork {
	fn is_network_available(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}
