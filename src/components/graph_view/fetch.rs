use std::future::Future;

use log::{debug, info};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestCache, RequestInit, Response};

use super::error::{LoadError, js_message};
use super::types::{GraphDocument, parse_document};

/// Retrieves and parses a graph document.
pub trait DocumentFetcher {
	fn fetch(&self, path: &str) -> impl Future<Output = Result<GraphDocument, LoadError>>;
}

/// Turns a completed response into a document or a load error.
pub fn interpret_response(path: &str, status: u16, body: &str) -> Result<GraphDocument, LoadError> {
	if !(200..300).contains(&status) {
		return Err(LoadError::Fetch {
			path: path.to_string(),
			status: Some(status),
			reason: format!("HTTP {status}"),
		});
	}
	let document = parse_document(body)?;
	info!(
		"Fetched {path}: {} nodes, {} edges",
		document.nodes.len(),
		document.edges.len()
	);
	Ok(document)
}

/// Fetches documents over HTTP from the page's origin, bypassing the cache.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
	async fn fetch_text(path: &str) -> Result<(u16, String), LoadError> {
		let failed = |reason: String| LoadError::Fetch {
			path: path.to_string(),
			status: None,
			reason,
		};

		let init = RequestInit::new();
		init.set_method("GET");
		init.set_cache(RequestCache::NoStore);
		let request = Request::new_with_str_and_init(path, &init).map_err(|e| failed(js_message(&e)))?;
		let window = web_sys::window().ok_or_else(|| failed("no window".to_string()))?;

		let response: Response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(|e| failed(js_message(&e)))?
			.dyn_into()
			.map_err(|e| failed(js_message(&e)))?;
		let status = response.status();
		debug!("GET {path} -> {status}");
		if !response.ok() {
			return Ok((status, String::new()));
		}

		let text = response.text().map_err(|e| failed(js_message(&e)))?;
		let body = JsFuture::from(text)
			.await
			.map_err(|e| failed(js_message(&e)))?
			.as_string()
			.unwrap_or_default();
		Ok((status, body))
	}
}

impl DocumentFetcher for HttpFetcher {
	async fn fetch(&self, path: &str) -> Result<GraphDocument, LoadError> {
		let (status, body) = Self::fetch_text(path).await?;
		interpret_response(path, status, &body)
	}
}
