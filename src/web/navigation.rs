//! Browser wiring for [`SpaManager`]: link interception, history, tab teardown and the dashboard auto-refresh.

use super::{
	fetch::BrowserTransport,
	host::{BrowserHost, DomPageView, PAGE_LOADED_EVENT},
	listeners::ListenerSet,
};
use crate::{
	api::{Method, Transport},
	error::{Error, Result},
	spa::SpaManager,
};
use serde::Deserialize;
use std::rc::{Rc, Weak};
use tracing::{error, info, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{CustomEvent, Document, Element, Event, Window};

pub type BrowserSpa = SpaManager<BrowserHost, BrowserTransport, DomPageView>;

/// Links handled by the SPA manager instead of the browser.
pub const SPA_LINK_SELECTOR: &str = r#"a[href^="/spa/"], .spa-link"#;
pub const DASHBOARD_PAGE: &str = "dashboard";
pub const DASHBOARD_REFRESH_NAME: &str = "auto-refresh";

/// Attaches every navigation listener to `listeners`.
pub fn install(spa: &Rc<BrowserSpa>, window: &Window, document: &Document, listeners: &mut ListenerSet) -> Result<()> {
	intercept_links(spa, window, document, listeners)?;
	follow_history(spa, window, listeners)?;
	teardown_on_unload(spa, window, listeners)?;
	schedule_dashboard_refresh(spa, document, listeners)?;
	Ok(())
}

fn intercept_links(spa: &Rc<BrowserSpa>, window: &Window, document: &Document, listeners: &mut ListenerSet) -> Result<()> {
	let spa = Rc::clone(spa);
	let window = window.clone();
	let menu_document = document.clone();
	listeners.listen(document, "click", move |event: Event| {
		let link = match event.target().and_then(|target| target.dyn_into::<Element>().ok()).map(|target| target.closest(SPA_LINK_SELECTOR)) {
			Some(Ok(Some(link))) => link,
			Some(Err(error)) => return error!("SPA link lookup failed: {:?}", error),
			_ => return,
		};
		let url = match link.get_attribute("href") {
			Some(url) => url,
			None => return warn!("SPA link without `href`; ignoring."),
		};
		event.prevent_default();

		let target = link.get_attribute("data-target").unwrap_or_else(|| spa.config().default_target.clone());
		match window.history() {
			Ok(history) => {
				if let Err(error) = history.push_state_with_url(&JsValue::NULL, "", Some(&url)) {
					warn!("Could not push {:?} onto the history: {:?}", url, error);
				}
			}
			Err(error) => warn!("History unavailable: {:?}", error),
		}

		let spa = Rc::clone(&spa);
		spawn_local(async move {
			spa.navigate(&url, &target).await;
		});
		update_active_menu(&menu_document, &link);
	})
}

fn follow_history(spa: &Rc<BrowserSpa>, window: &Window, listeners: &mut ListenerSet) -> Result<()> {
	let spa = Rc::clone(spa);
	let location = window.location();
	listeners.listen(window, "popstate", move |_| {
		let path = match location.pathname() {
			Ok(path) => path,
			Err(error) => return error!("Could not read the location: {:?}", error),
		};
		if path.starts_with("/spa/") {
			let spa = Rc::clone(&spa);
			spawn_local(async move {
				spa.navigate_default(&path).await;
			});
		}
	})
}

fn teardown_on_unload(spa: &Rc<BrowserSpa>, window: &Window, listeners: &mut ListenerSet) -> Result<()> {
	let spa = Rc::clone(spa);
	listeners.listen(window, "beforeunload", move |_| {
		let released = spa.teardown();
		trace!("Released {} resource(s) before unload.", released);
	})
}

#[instrument(skip(document, link))]
fn update_active_menu(document: &Document, link: &Element) {
	if let Ok(active) = document.query_selector_all(".nav-link, .sidebar-link") {
		for i in 0..active.length() {
			if let Some(item) = active.get(i).and_then(|node| node.dyn_into::<Element>().ok()) {
				if let Err(error) = item.class_list().remove_1("active") {
					error!("Could not clear `active`: {:?}", error);
				}
			}
		}
	}

	if let Err(error) = link.class_list().add_1("active") {
		error!("Could not mark the link active: {:?}", error);
	}

	if let Ok(Some(nav_item)) = link.closest(".nav-item") {
		if let Ok(links) = nav_item.query_selector_all(".nav-link") {
			for i in 0..links.length() {
				if let Some(item) = links.get(i).and_then(|node| node.dyn_into::<Element>().ok()) {
					if let Err(error) = item.class_list().add_1("active") {
						error!("Could not mark the parent link active: {:?}", error);
					}
				}
			}
		}
	}
}

fn schedule_dashboard_refresh(spa: &Rc<BrowserSpa>, document: &Document, listeners: &mut ListenerSet) -> Result<()> {
	let weak = Rc::downgrade(spa);
	let stats_document = document.clone();
	listeners.listen(document, PAGE_LOADED_EVENT, move |event: Event| {
		let page = event
			.dyn_ref::<CustomEvent>()
			.and_then(|event| js_sys::Reflect::get(&event.detail(), &JsValue::from_str("pageName")).ok())
			.and_then(|page| page.as_string());
		if page.as_deref() != Some(DASHBOARD_PAGE) {
			return;
		}
		if let Err(error) = register_dashboard_refresh(&weak, &stats_document) {
			error!("Could not schedule the dashboard refresh: {}", error);
		}
	})
}

/// Registers a periodic stats refresh under the dashboard page, so leaving the page clears it.
///
/// The callback is stored as a page variable and dropped with the page after the interval is cleared.
fn register_dashboard_refresh(weak: &Weak<BrowserSpa>, document: &Document) -> Result<()> {
	let spa = weak.upgrade().ok_or_else(|| Error::Dom("SPA manager dropped".to_owned()))?;
	let window = web_sys::window().ok_or_else(|| Error::Dom("no window".to_owned()))?;

	let tick_spa = Weak::clone(weak);
	let tick_document = document.clone();
	let callback = Closure::wrap(Box::new(move || {
		let spa = match tick_spa.upgrade() {
			Some(spa) => spa,
			None => return,
		};
		if spa.current_page().as_deref() != Some(DASHBOARD_PAGE) {
			return;
		}
		let document = tick_document.clone();
		spawn_local(async move {
			refresh_dashboard_stats(&spa, &document).await;
		});
	}) as Box<dyn FnMut()>);

	let mut registry = spa.try_registry().ok_or_else(|| Error::Dom("page registry busy".to_owned()))?;
	let id = window
		.set_interval_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), i32::try_from(spa.config().dashboard_refresh_ms).unwrap_or(i32::MAX))
		.map_err(|error| Error::dom(&error))?;
	registry.register_interval(DASHBOARD_PAGE, DASHBOARD_REFRESH_NAME, id);
	registry.set_variable(DASHBOARD_PAGE, "auto-refresh.callback", Box::new(callback));
	info!("Dashboard auto-refresh every {} ms.", spa.config().dashboard_refresh_ms);
	Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DashboardStats {
	employees_count: Option<u64>,
}

async fn refresh_dashboard_stats(spa: &BrowserSpa, document: &Document) {
	let url = spa.config().dashboard_stats_url.clone();
	let stats = match spa.transport().request(Method::Get, &url, None).await {
		Ok(body) => serde_json::from_str::<DashboardStats>(&body).map_err(Error::from),
		Err(error) => Err(error),
	};
	match stats {
		Ok(DashboardStats { employees_count: Some(count) }) => {
			if let Ok(Some(kpi)) = document.query_selector("#total-employees .kpi-value") {
				kpi.set_text_content(Some(&count.to_string()));
			}
		}
		Ok(_) => trace!("Dashboard stats carried no employee count."),
		Err(error) => warn!("Dashboard stats refresh failed: {}", error),
	}
}
