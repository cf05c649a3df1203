use crate::{
	api::{Method, Transport},
	error::{Error, Result},
};
use async_trait::async_trait;
use gloo_net::http::Request;
use tracing::{instrument, trace};
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlInputElement, RequestCredentials};

/// `fetch` with PaiePro's AJAX conventions: JSON content type, `X-Requested-With`,
/// same-origin credentials and the Django CSRF token when the page carries one.
#[derive(Debug, Clone)]
pub struct BrowserTransport {
	document: Document,
}

impl BrowserTransport {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}

	fn csrf_token(&self) -> Option<String> {
		let input = self.document.query_selector("[name=csrfmiddlewaretoken]").ok()??;
		Some(input.dyn_into::<HtmlInputElement>().ok()?.value())
	}
}

#[async_trait(?Send)]
impl Transport for BrowserTransport {
	#[instrument(skip(self, body))]
	async fn request(&self, method: Method, url: &str, body: Option<String>) -> Result<String> {
		let builder = match method {
			Method::Get => Request::get(url),
			Method::Post => Request::post(url),
		}
		.header("Content-Type", "application/json")
		.header("X-Requested-With", "XMLHttpRequest")
		.credentials(RequestCredentials::SameOrigin);
		let builder = match self.csrf_token() {
			Some(token) => builder.header("X-CSRFToken", &token),
			None => builder,
		};

		let response = match body {
			Some(body) if method != Method::Get => builder.body(body).map_err(Error::transport)?.send().await,
			_ => builder.send().await,
		}
		.map_err(Error::transport)?;

		let status = response.status();
		trace!(status, "Response received.");
		match status {
			401 => Err(Error::Unauthorized),
			403 => {
				let body = response.text().await.unwrap_or_default();
				Err(Error::forbidden_from_body(&body))
			}
			_ if !response.ok() => Err(Error::Status {
				status,
				status_text: response.status_text(),
			}),
			_ => response.text().await.map_err(Error::transport),
		}
	}
}
