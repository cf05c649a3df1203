//! Page bootstrap: constructs the gate and the SPA manager, wires them to the document,
//! and exposes thin JS adapters for page scripts.

use super::{
	dom::{apply_user_header, DomGate},
	fetch::BrowserTransport,
	host::{BrowserHost, DomPageView, PAGE_LOADED_EVENT},
	listeners::ListenerSet,
	navigation::{self, BrowserSpa},
	notify::BootstrapNotifier,
	storage::BrowserSessionStore,
};
use crate::{
	config::{GateConfig, SpaConfig},
	error::{Error, Result},
	gate::PermissionGate,
	registry::PageResourceRegistry,
	spa::SpaManager,
};
use core::cell::RefCell;
use gloo_timers::callback::Interval;
use js_sys::{Function, Object, Reflect};
use serde::Serialize;
use std::{rc::Rc, sync::Once};
use tracing::{error, info, instrument};
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{CustomEvent, Document, Event, EventTarget};

pub type BrowserGate = PermissionGate<BrowserTransport, BrowserSessionStore, BootstrapNotifier>;

/// Everything the page runs on. Dropping it detaches all listeners and stops the refresh timer.
pub struct App {
	pub gate: Rc<BrowserGate>,
	pub dom: Rc<DomGate<BrowserGate>>,
	pub spa: Rc<BrowserSpa>,
	document: Document,
	_listeners: ListenerSet,
	_refresh: Interval,
}

impl core::fmt::Debug for App {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("App").field("gate", &self.gate).field("dom", &self.dom).field("spa", &self.spa).finish_non_exhaustive()
	}
}

impl Drop for App {
	fn drop(&mut self) {
		let released = self.spa.teardown();
		info!("Front-end stopped; released {} resource(s) of the current page.", released);
	}
}

impl App {
	/// Re-runs the DOM permission pass and the user header.
	pub fn reapply(&self) {
		self.dom.apply();
		apply_user_header(&self.document, &self.gate.user_info());
	}
}

/// [`start_with`] the default configuration.
pub fn start() -> Result<App> {
	start_with(GateConfig::default(), SpaConfig::default())
}

#[instrument]
pub fn start_with(gate_config: GateConfig, spa_config: SpaConfig) -> Result<App> {
	let window = web_sys::window().ok_or_else(|| Error::Dom("no window".to_owned()))?;
	let document = window.document().ok_or_else(|| Error::Dom("no document".to_owned()))?;

	let refresh_interval_ms = gate_config.refresh_interval_ms;
	let gate = Rc::new(PermissionGate::new(
		BrowserTransport::new(document.clone()),
		BrowserSessionStore::new(&window),
		BootstrapNotifier::new(window.clone(), document.clone()),
		gate_config,
	));
	let dom = Rc::new(DomGate::new(Rc::clone(&gate), document.clone()));
	let spa = Rc::new(SpaManager::new(
		BrowserHost::new(window.clone()),
		BrowserTransport::new(document.clone()),
		DomPageView::new(document.clone()),
		spa_config,
	));

	let mut listeners = ListenerSet::new();
	let window_target: &EventTarget = &window;
	let document_target: &EventTarget = &document;
	for (target, event) in [(window_target, "hashchange"), (document_target, "contentUpdated"), (document_target, PAGE_LOADED_EVENT)] {
		let dom = Rc::clone(&dom);
		listeners.listen(target, event, move |_| {
			dom.apply();
		})?;
	}
	{
		let gate = Rc::clone(&gate);
		listeners.listen(&document, "ajaxError", move |event: Event| {
			let detail = match event.dyn_ref::<CustomEvent>() {
				Some(event) => event.detail(),
				None => return,
			};
			let status = Reflect::get(&detail, &JsValue::from_str("status")).ok().and_then(|status| status.as_f64());
			if status == Some(403.0) {
				let message = Reflect::get(&detail, &JsValue::from_str("response"))
					.ok()
					.filter(|response| response.is_object())
					.and_then(|response| Reflect::get(&response, &JsValue::from_str("message")).ok())
					.and_then(|message| message.as_string());
				gate.handle_permission_denied(message.as_deref());
			}
		})?;
	}
	navigation::install(&spa, &window, &document, &mut listeners)?;

	let refresh = {
		let gate = Rc::clone(&gate);
		let dom = Rc::clone(&dom);
		Interval::new(refresh_interval_ms, move || {
			let gate = Rc::clone(&gate);
			let dom = Rc::clone(&dom);
			spawn_local(async move {
				gate.refresh().await;
				dom.apply();
			});
		})
	};

	{
		let gate = Rc::clone(&gate);
		let dom = Rc::clone(&dom);
		let document = document.clone();
		spawn_local(async move {
			gate.initialize().await;
			dom.apply();
			apply_user_header(&document, &gate.user_info());
		});
	}

	info!("PaiePro front-end started.");
	Ok(App {
		gate,
		dom,
		spa,
		document,
		_listeners: listeners,
		_refresh: refresh,
	})
}

thread_local! {
	static APP: RefCell<Option<App>> = RefCell::new(None);
}

static LOGGING: Once = Once::new();

fn with_app<R>(f: impl FnOnce(&App) -> R) -> Option<R> {
	APP.with(|app| app.borrow().as_ref().map(f))
}

fn js_error(error: &Error) -> JsValue {
	JsValue::from_str(&error.to_string())
}

/// Starts the front-end. Call once from the page after the module loaded.
///
/// Calling it again replaces the running instance, detaching the previous one's listeners.
#[wasm_bindgen]
pub fn boot() -> Result<(), JsValue> {
	LOGGING.call_once(tracing_wasm::set_as_global_default);
	let app = start().map_err(|error| js_error(&error))?;
	let previous = APP.with(|slot| slot.borrow_mut().replace(app));
	drop(previous);
	Ok(())
}

#[wasm_bindgen(js_name = hasPermission)]
pub fn has_permission(permission: &str) -> bool {
	with_app(|app| app.gate.has_permission(permission)).unwrap_or(false)
}

#[wasm_bindgen(js_name = isAdmin)]
pub fn is_admin() -> bool {
	with_app(|app| app.gate.is_admin()).unwrap_or(false)
}

#[wasm_bindgen(js_name = isRH)]
pub fn is_rh() -> bool {
	with_app(|app| app.gate.is_rh()).unwrap_or(false)
}

#[wasm_bindgen(js_name = isEmployee)]
pub fn is_employee() -> bool {
	with_app(|app| app.gate.is_employee()).unwrap_or(false)
}

#[wasm_bindgen(js_name = isManager)]
pub fn is_manager() -> bool {
	with_app(|app| app.gate.is_manager()).unwrap_or(false)
}

/// Re-runs the DOM pass, e.g. after a script inserted permission-annotated markup.
#[wasm_bindgen(js_name = applyPermissions)]
pub fn apply_permissions() {
	with_app(App::reapply);
}

#[wasm_bindgen(js_name = checkPermissionRemote)]
pub async fn check_permission_remote(permission: String, target_id: Option<String>, target_type: Option<String>) -> bool {
	let gate = match with_app(|app| Rc::clone(&app.gate)) {
		Some(gate) => gate,
		None => return false,
	};
	let target = target_id.map(|id| {
		let target = crate::api::TargetObject::new(id);
		match target_type {
			Some(kind) => target.with_kind(kind),
			None => target,
		}
	});
	gate.check_permission_remote(&permission, target.as_ref()).await
}

#[wasm_bindgen(js_name = loadPage)]
pub fn load_page(url: String, target: Option<String>) {
	let spa = match with_app(|app| Rc::clone(&app.spa)) {
		Some(spa) => spa,
		None => return error!("`loadPage` called before `boot`."),
	};
	spawn_local(async move {
		match target {
			Some(target) => spa.navigate(&url, &target).await,
			None => spa.navigate_default(&url).await,
		};
	});
}

/// Runs `f` on the running instance's registry.
///
/// Logs instead of panicking when a chart `destroy` hook re-enters while the registry is borrowed.
fn with_registry<R>(adapter: &str, f: impl FnOnce(&mut PageResourceRegistry<BrowserHost>) -> R) -> Option<R> {
	with_app(|app| match app.spa.try_registry() {
		Some(mut registry) => Some(f(&mut registry)),
		None => {
			error!("`{}` re-entered the page registry while it was busy; ignoring the call.", adapter);
			None
		}
	})
	.flatten()
}

#[wasm_bindgen(js_name = registerChart)]
pub fn register_chart(page: &str, name: &str, chart: JsValue) {
	with_registry("registerChart", |registry| registry.register_chart(page, name, chart));
}

#[wasm_bindgen(js_name = registerInterval)]
pub fn register_interval(page: &str, name: &str, id: i32) {
	with_registry("registerInterval", |registry| registry.register_interval(page, name, id));
}

#[wasm_bindgen(js_name = registerEventListener)]
pub fn register_event_listener(page: &str, target: EventTarget, event: &str, handler: Function) -> Result<(), JsValue> {
	with_registry("registerEventListener", |registry| registry.register_listener(page, target, event, handler))
		.unwrap_or_else(|| Err(Error::Dom("page registry unavailable".to_owned())))
		.map_err(|error| js_error(&error))
}

#[wasm_bindgen(js_name = setVariable)]
pub fn set_variable(page: &str, name: &str, value: JsValue) {
	with_registry("setVariable", |registry| registry.set_variable(page, name, Box::new(value)));
}

#[wasm_bindgen(js_name = getVariable)]
pub fn get_variable(page: &str, name: &str) -> JsValue {
	with_registry("getVariable", |registry| registry.get_variable(page, name).and_then(|value| value.downcast_ref::<JsValue>()).cloned())
		.flatten()
		.unwrap_or(JsValue::UNDEFINED)
}

#[wasm_bindgen(js_name = cleanupSPAPage)]
pub fn cleanup_page(page: &str) -> usize {
	with_app(|app| Rc::clone(&app.spa)).map_or(0, |spa| spa.dispose_page(page))
}

#[wasm_bindgen(js_name = isSPAPageInitialized)]
pub fn is_page_initialized(page: &str) -> bool {
	with_registry("isSPAPageInitialized", |registry| registry.is_initialized(page)).unwrap_or(false)
}

/// Lets page scripts guard their one-time setup: `if (isSPAPageInitialized(p)) return; … markSPAPageInitialized(p);`
#[wasm_bindgen(js_name = markSPAPageInitialized)]
pub fn mark_page_initialized(page: &str) {
	with_registry("markSPAPageInitialized", |registry| registry.mark_initialized(page));
}

/// The role code (`"ADMIN"`, `"RH"`, `"EMPLOYE"`), or `undefined` when unknown.
#[wasm_bindgen(js_name = getUserRole)]
pub fn get_user_role() -> Option<String> {
	with_app(|app| app.gate.user_role().code()).flatten().map(str::to_owned)
}

#[wasm_bindgen(js_name = getUserInfo)]
pub fn get_user_info() -> Result<JsValue, JsValue> {
	with_app(|app| to_js(&app.gate.user_info())).unwrap_or(Ok(JsValue::NULL)).map_err(|error| js_error(&error))
}

#[wasm_bindgen(js_name = getAllPermissions)]
pub fn get_all_permissions() -> Result<JsValue, JsValue> {
	with_app(|app| to_js(&app.gate.all_permissions())).unwrap_or_else(|| Ok(Object::new().into())).map_err(|error| js_error(&error))
}

fn to_js(value: &impl Serialize) -> Result<JsValue> {
	let json = serde_json::to_string(value)?;
	js_sys::JSON::parse(&json).map_err(|error| Error::dom(&error))
}
