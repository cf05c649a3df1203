use crate::{
	error::{Error, Result},
	snapshot::SessionStore,
};
use tracing::warn;
use web_sys::{Storage, Window};

/// `window.sessionStorage`, or nothing where the browser refuses access to it.
#[derive(Debug, Clone)]
pub struct BrowserSessionStore(Option<Storage>);

impl BrowserSessionStore {
	#[must_use]
	pub fn new(window: &Window) -> Self {
		match window.session_storage() {
			Ok(Some(storage)) => Self(Some(storage)),
			Ok(None) => {
				warn!("Session storage is unavailable; permission snapshots won't survive reloads.");
				Self(None)
			}
			Err(error) => {
				warn!("Session storage access denied: {:?}", error);
				Self(None)
			}
		}
	}
}

impl SessionStore for BrowserSessionStore {
	fn get_item(&self, key: &str) -> Option<String> {
		match self.0.as_ref()?.get_item(key) {
			Ok(value) => value,
			Err(error) => {
				warn!("Could not read {:?} from session storage: {:?}", key, error);
				None
			}
		}
	}

	fn set_item(&self, key: &str, value: &str) -> Result<()> {
		match &self.0 {
			Some(storage) => storage.set_item(key, value).map_err(|error| Error::dom(&error)),
			None => Err(Error::Dom("session storage unavailable".to_owned())),
		}
	}
}
