use paie_dom::registry::PageResourceRegistry;
use std::rc::Rc;

mod fakes_;
use fakes_::{journal, FakeChart, FakeHost};

fn registry() -> PageResourceRegistry<FakeHost> {
	PageResourceRegistry::new(FakeHost::new(journal()))
}

#[test]
fn dispose_releases_everything() {
	let mut registry = registry();
	registry.register_chart("dashboard", "headcount", FakeChart::new("headcount"));
	registry.register_chart("dashboard", "payroll", FakeChart::new("payroll"));
	registry.register_interval("dashboard", "auto-refresh", 7);
	registry.register_listener("dashboard", "window", "resize", 1).unwrap();
	registry.set_variable("dashboard", "period", "2026-10".to_owned());
	registry.mark_initialized("dashboard");

	let resources = registry.resources("dashboard").unwrap();
	assert_eq!(resources.chart_count(), 2);
	assert_eq!(resources.interval_count(), 1);
	assert_eq!(resources.listener_count(), 1);
	assert_eq!(resources.variable_count(), 1);

	assert_eq!(registry.dispose_page("dashboard"), 5);

	let host = registry.host();
	assert_eq!(host.count("dispose headcount"), 1);
	assert_eq!(host.count("dispose payroll"), 1);
	assert_eq!(host.count("clear 7"), 1);
	assert_eq!(host.count("detach window resize 1"), 1);
	assert!(!registry.has_resources("dashboard"));
	assert!(!registry.is_initialized("dashboard"));
	assert_eq!(registry.get_variable("dashboard", "period"), None);
	assert_eq!(registry.page_names().count(), 0);
}

#[test]
fn a_failing_chart_does_not_stop_the_rest() {
	let mut registry = registry();
	registry.register_chart("payroll", "broken", FakeChart::failing("broken"));
	registry.register_chart("payroll", "fine", FakeChart::new("fine"));
	registry.register_interval("payroll", "poll", 3);

	assert_eq!(registry.dispose_page("payroll"), 3);
	let host = registry.host();
	assert_eq!(host.count("dispose broken"), 1);
	assert_eq!(host.count("dispose fine"), 1);
	assert_eq!(host.count("clear 3"), 1);
}

#[test]
fn a_failing_detach_does_not_stop_the_rest() {
	let mut registry = PageResourceRegistry::new(FakeHost {
		refuse_detach: true,
		..FakeHost::default()
	});
	registry.register_listener("leave", "document", "click", 1).unwrap();
	registry.register_listener("leave", "window", "scroll", 2).unwrap();

	assert_eq!(registry.dispose_page("leave"), 2);
	assert_eq!(registry.host().count("detach document click 1"), 1);
	assert_eq!(registry.host().count("detach window scroll 2"), 1);
}

#[test]
fn disposal_is_idempotent() {
	let mut registry = registry();
	registry.register_interval("dashboard", "auto-refresh", 11);

	assert_eq!(registry.dispose_page("dashboard"), 1);
	assert_eq!(registry.dispose_page("dashboard"), 0);
	assert_eq!(registry.host().count("clear 11"), 1);
}

#[test]
fn disposing_an_unknown_page_is_a_no_op() {
	let mut registry = registry();
	assert_eq!(registry.dispose_page("nowhere"), 0);
	assert!(registry.host().journal.borrow().is_empty());
}

#[test]
fn pages_are_isolated() {
	let mut registry = registry();
	registry.register_interval("dashboard", "auto-refresh", 1);
	registry.register_interval("leave", "auto-refresh", 2);

	registry.dispose_page("dashboard");
	assert_eq!(registry.host().count("clear 2"), 0);
	assert_eq!(registry.resource_count("leave"), 1);
}

#[test]
fn re_registering_releases_the_replaced_handle() {
	let mut registry = registry();
	registry.register_chart("dashboard", "headcount", FakeChart::new("old"));
	registry.register_chart("dashboard", "headcount", FakeChart::new("new"));
	assert_eq!(registry.host().count("dispose old"), 1);
	assert_eq!(registry.resources("dashboard").unwrap().chart_count(), 1);

	registry.register_interval("dashboard", "auto-refresh", 4);
	registry.register_interval("dashboard", "auto-refresh", 4);
	assert_eq!(registry.host().count("clear 4"), 0);
	registry.register_interval("dashboard", "auto-refresh", 5);
	assert_eq!(registry.host().count("clear 4"), 1);

	registry.dispose_page("dashboard");
	assert_eq!(registry.host().count("dispose new"), 1);
	assert_eq!(registry.host().count("clear 5"), 1);
}

#[test]
fn failed_attach_is_not_recorded() {
	let mut registry = PageResourceRegistry::new(FakeHost {
		refuse_attach: true,
		..FakeHost::default()
	});
	assert!(registry.register_listener("leave", "document", "click", 1).is_err());
	assert_eq!(registry.resource_count("leave"), 0);
	assert_eq!(registry.dispose_page("leave"), 0);
	assert_eq!(registry.host().count("detach document click 1"), 0);
}

#[test]
fn variables_and_initialization() {
	let mut registry = registry();
	assert!(!registry.is_initialized("leave"));
	registry.mark_initialized("leave");
	assert!(registry.is_initialized("leave"));

	registry.set_variable("leave", "filter", "pending".to_owned());
	registry.set_variable("leave", "filter", "approved".to_owned());
	assert_eq!(registry.get_variable("leave", "filter").map(String::as_str), Some("approved"));
	assert_eq!(registry.get_variable("leave", "missing"), None);
	assert_eq!(registry.get_variable("payroll", "filter"), None);
	assert_eq!(registry.resource_count("leave"), 1);
}

#[test]
fn dropping_the_registry_releases_every_page() {
	let journal = journal();
	{
		let mut registry = PageResourceRegistry::new(FakeHost::new(Rc::clone(&journal)));
		registry.register_interval("dashboard", "auto-refresh", 9);
		registry.register_chart("dashboard", "headcount", FakeChart::new("headcount"));
		registry.register_listener("leave", "window", "resize", 1).unwrap();
		registry.dispose_page("payroll");
	}

	let journal = journal.borrow();
	for entry in ["clear 9", "dispose headcount", "detach window resize 1"] {
		assert_eq!(journal.iter().filter(|logged| logged.as_str() == entry).count(), 1, "{}", entry);
	}
}

#[test]
fn detached_pages_release_outside_the_registry() {
	let mut registry = registry();
	registry.register_interval("dashboard", "auto-refresh", 21);
	registry.mark_initialized("dashboard");

	let detached = registry.detach_page("dashboard").unwrap();
	assert_eq!(detached.page(), "dashboard");
	assert!(!registry.is_initialized("dashboard"));
	assert!(!registry.has_resources("dashboard"));
	assert_eq!(registry.host().count("clear 21"), 0);

	assert_eq!(detached.release(), 1);
	assert_eq!(registry.host().count("clear 21"), 1);
	assert!(registry.detach_page("dashboard").is_none());
}
