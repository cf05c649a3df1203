use crate::{
	error::{Error, Result},
	registry::ResourceHost,
	spa::PageView,
};
use core::any::Any;
use js_sys::{Function, Object, Reflect};
use tracing::{error, trace};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CustomEvent, CustomEventInit, Document, EventTarget, Window};

/// Browser resources: charts are JS objects with a `destroy` method, intervals are `setInterval` ids.
///
/// Variables are arbitrary Rust values. JS values are stored as `Box<JsValue>`.
#[derive(Debug, Clone)]
pub struct BrowserHost {
	window: Window,
}

impl BrowserHost {
	#[must_use]
	pub fn new(window: Window) -> Self {
		Self { window }
	}
}

impl ResourceHost for BrowserHost {
	type Chart = JsValue;
	type Target = EventTarget;
	type Handler = Function;
	type Value = Box<dyn Any>;

	fn dispose_chart(&self, chart: JsValue) -> Result<()> {
		let destroy = Reflect::get(&chart, &JsValue::from_str("destroy")).map_err(|error| Error::Dispose(format!("{:?}", error)))?;
		match destroy.dyn_ref::<Function>() {
			Some(destroy) => {
				destroy.call0(&chart).map_err(|error| Error::Dispose(format!("{:?}", error)))?;
			}
			None => trace!("Chart handle has no `destroy` method; dropping it."),
		}
		Ok(())
	}

	fn clear_interval(&self, id: i32) {
		self.window.clear_interval_with_handle(id);
	}

	fn attach_listener(&self, target: &EventTarget, event: &str, handler: &Function) -> Result<()> {
		target.add_event_listener_with_callback(event, handler).map_err(|error| Error::dom(&error))
	}

	fn detach_listener(&self, target: &EventTarget, event: &str, handler: &Function) -> Result<()> {
		target.remove_event_listener_with_callback(event, handler).map_err(|error| Error::dom(&error))
	}
}

/// Renders fragments with `innerHTML` and announces them as `spa:pageLoaded` on the document.
#[derive(Debug, Clone)]
pub struct DomPageView {
	document: Document,
}

impl DomPageView {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}

	fn dispatch_loaded(&self, page: &str, url: &str) -> Result<()> {
		let detail = Object::new();
		Reflect::set(&detail, &JsValue::from_str("pageName"), &JsValue::from_str(page)).map_err(|error| Error::dom(&error))?;
		Reflect::set(&detail, &JsValue::from_str("url"), &JsValue::from_str(url)).map_err(|error| Error::dom(&error))?;
		let init = CustomEventInit::new();
		init.set_detail(&detail);
		let event = CustomEvent::new_with_event_init_dict(PAGE_LOADED_EVENT, &init).map_err(|error| Error::dom(&error))?;
		self.document.dispatch_event(&event).map_err(|error| Error::dom(&error))?;
		Ok(())
	}
}

/// Dispatched on the document after a fragment was swapped in. `detail` is `{pageName, url}`.
pub const PAGE_LOADED_EVENT: &str = "spa:pageLoaded";

impl PageView for DomPageView {
	fn render(&self, target: &str, html: &str) -> Result<()> {
		let container = self
			.document
			.query_selector(target)
			.map_err(|error| Error::dom(&error))?
			.ok_or_else(|| Error::Dom(format!("no element matches {:?}", target)))?;
		container.set_inner_html(html);
		Ok(())
	}

	fn announce_loaded(&self, page: &str, url: &str) {
		if let Err(error) = self.dispatch_loaded(page, url) {
			error!("Could not announce page {:?}: {}", page, error);
		}
	}
}
