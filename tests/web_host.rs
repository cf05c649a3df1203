#![cfg(target_arch = "wasm32")]

use js_sys::{Function, Object, Reflect};
use paie_dom::{
	registry::{PageResourceRegistry, ResourceHost},
	spa::PageView,
	web::{BrowserHost, DomPageView, ListenerSet, PAGE_LOADED_EVENT},
};
use std::{cell::Cell, rc::Rc};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, CustomEvent, Event, EventTarget};

wasm_bindgen_test_configure!(run_in_browser);

/// Counts its own `destroy` calls in `destroyed`, like a Chart.js handle would be torn down.
fn chart() -> JsValue {
	let chart = Object::new();
	Reflect::set(&chart, &"destroyed".into(), &0.into()).unwrap();
	let destroy = Function::new_no_args("this.destroyed += 1;");
	Reflect::set(&chart, &"destroy".into(), &destroy).unwrap();
	chart.into()
}

fn destroyed(chart: &JsValue) -> f64 {
	Reflect::get(chart, &"destroyed".into()).unwrap().as_f64().unwrap()
}

#[wasm_bindgen_test]
fn charts_are_destroyed_once() {
	let _ = tracing_wasm::try_set_as_global_default();
	let mut registry = PageResourceRegistry::new(BrowserHost::new(window().unwrap()));
	let headcount = chart();

	registry.register_chart("dashboard", "headcount", headcount.clone());
	assert_eq!(registry.dispose_page("dashboard"), 1);
	assert_eq!(registry.dispose_page("dashboard"), 0);
	assert_eq!(destroyed(&headcount), 1.0);
}

#[wasm_bindgen_test]
fn chart_without_destroy_is_dropped() {
	let host = BrowserHost::new(window().unwrap());
	assert!(host.dispose_chart(Object::new().into()).is_ok());
}

#[wasm_bindgen_test]
fn throwing_destroy_is_reported() {
	let host = BrowserHost::new(window().unwrap());
	let chart = Object::new();
	Reflect::set(&chart, &"destroy".into(), &Function::new_no_args("throw new Error('boom');")).unwrap();
	assert!(host.dispose_chart(chart.into()).is_err());
}

#[wasm_bindgen_test]
fn listeners_are_detached_on_dispose() {
	let window = window().unwrap();
	let document = window.document().unwrap();
	let target: EventTarget = document.create_element("div").unwrap().into();
	let handler = Function::new_no_args("this.dataset.clicks = (Number(this.dataset.clicks) || 0) + 1;");

	let mut registry = PageResourceRegistry::new(BrowserHost::new(window));
	registry.register_listener("leave", target.clone(), "ping", handler).unwrap();
	let clicks = || target.unchecked_ref::<web_sys::Element>().get_attribute("data-clicks");

	target.dispatch_event(&Event::new("ping").unwrap()).unwrap();
	assert_eq!(clicks().as_deref(), Some("1"));

	registry.dispose_page("leave");
	target.dispatch_event(&Event::new("ping").unwrap()).unwrap();
	assert_eq!(clicks().as_deref(), Some("1"));
}

#[wasm_bindgen_test]
fn page_view_renders_and_announces() {
	let document = window().unwrap().document().unwrap();
	document.body().unwrap().set_inner_html(r#"<main id="main-content"></main>"#);
	let view = DomPageView::new(document.clone());

	let announced = Rc::new(Cell::new(false));
	let mut listeners = ListenerSet::new();
	{
		let announced = Rc::clone(&announced);
		listeners
			.listen(&document, PAGE_LOADED_EVENT, move |event: Event| {
				let detail = event.unchecked_into::<CustomEvent>().detail();
				let page = Reflect::get(&detail, &"pageName".into()).unwrap().as_string();
				announced.set(page.as_deref() == Some("leave"));
			})
			.unwrap();
	}

	view.render("#main-content", "<p id=\"fragment\">Congés</p>").unwrap();
	assert!(document.query_selector("#fragment").unwrap().is_some());
	assert!(view.render("#nowhere", "<p>").is_err());

	view.announce_loaded("leave", "/spa/leave/");
	assert!(announced.get());

	drop(listeners);
	announced.set(false);
	view.announce_loaded("leave", "/spa/leave/");
	assert!(!announced.get());
}
