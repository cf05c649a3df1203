use crate::error::{Error, Result};
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Event, EventTarget};

/// Keeps Rust event handlers alive for as long as they are attached, and detaches them on drop.
#[derive(Default)]
pub struct ListenerSet {
	bindings: Vec<(EventTarget, String, Closure<dyn FnMut(Event)>)>,
}

impl ListenerSet {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn listen(&mut self, target: &EventTarget, event: &str, handler: impl FnMut(Event) + 'static) -> Result<()> {
		let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
		target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()).map_err(|error| Error::dom(&error))?;
		trace!("Attached {:?} listener.", event);
		self.bindings.push((target.clone(), event.to_owned(), closure));
		Ok(())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}
}

impl Drop for ListenerSet {
	fn drop(&mut self) {
		for (target, event, closure) in self.bindings.drain(..) {
			if let Err(error) = target.remove_event_listener_with_callback(&event, closure.as_ref().unchecked_ref()) {
				error!("Failed to remove {:?} listener: {:?}", event, error);
			}
		}
	}
}
