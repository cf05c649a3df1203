use thiserror::Error;
use wasm_bindgen::JsValue;

/// Everything that can go wrong between this crate and the browser or the PaiePro API.
///
/// Callers at the public surface rarely see this type: permission loading degrades to cached
/// or empty state, and disposal failures are logged per resource. It exists so the layers below
/// can propagate with `?` and so authorization failures stay distinguishable from the rest.
#[derive(Debug, Error)]
pub enum Error {
	#[error("transport failure: {0}")]
	Transport(String),
	#[error("not authenticated (HTTP 401)")]
	Unauthorized,
	#[error("access denied (HTTP 403): {}", .message.as_deref().unwrap_or("no message"))]
	Forbidden { message: Option<String> },
	#[error("HTTP {status}: {status_text}")]
	Status { status: u16, status_text: String },
	#[error("server answered without `success: true`")]
	Unsuccessful,
	#[error("malformed response body: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("DOM operation failed: {0}")]
	Dom(String),
	#[error("resource disposal failed: {0}")]
	Dispose(String),
}

impl Error {
	/// `true` for 401 and 403, which take the dedicated denial path instead of generic error display.
	#[must_use]
	pub fn is_auth(&self) -> bool {
		matches!(self, Self::Unauthorized | Self::Forbidden { .. })
	}

	pub(crate) fn dom(error: &JsValue) -> Self {
		Self::Dom(format!("{:?}", error))
	}

	pub(crate) fn transport(error: impl core::fmt::Debug) -> Self {
		Self::Transport(format!("{:?}", error))
	}

	/// Builds [`Error::Forbidden`] from a 403 response body, picking up its `message` field if present.
	#[must_use]
	pub fn forbidden_from_body(body: &str) -> Self {
		#[derive(serde::Deserialize)]
		struct DenialBody {
			message: Option<String>,
		}

		let message = serde_json::from_str::<DenialBody>(body).ok().and_then(|body| body.message);
		Self::Forbidden { message }
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
