//! Per-page ownership of disposable browser resources.

use crate::error::Result;
use core::fmt;
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{info, instrument, trace, trace_span, warn};

/// The environment resources are created in and released back to.
///
/// In the browser, charts are opaque JS objects with a `destroy` method, intervals are `setInterval` ids
/// and listeners are `(EventTarget, type, Function)` triples.
pub trait ResourceHost {
	type Chart;
	type Target;
	type Handler;
	type Value;

	fn dispose_chart(&self, chart: Self::Chart) -> Result<()>;
	fn clear_interval(&self, id: i32);
	fn attach_listener(&self, target: &Self::Target, event: &str, handler: &Self::Handler) -> Result<()>;
	fn detach_listener(&self, target: &Self::Target, event: &str, handler: &Self::Handler) -> Result<()>;
}

pub struct ListenerRegistration<H: ResourceHost> {
	pub target: H::Target,
	pub event: String,
	pub handler: H::Handler,
}

/// Everything one logical page created. Discarded as a whole.
pub struct PageResourceSet<H: ResourceHost> {
	charts: HashMap<String, H::Chart>,
	intervals: HashMap<String, i32>,
	listeners: Vec<ListenerRegistration<H>>,
	variables: HashMap<String, H::Value>,
}

impl<H: ResourceHost> Default for PageResourceSet<H> {
	fn default() -> Self {
		Self {
			charts: HashMap::new(),
			intervals: HashMap::new(),
			listeners: Vec::new(),
			variables: HashMap::new(),
		}
	}
}

impl<H: ResourceHost> PageResourceSet<H> {
	#[must_use]
	pub fn len(&self) -> usize {
		self.charts.len() + self.intervals.len() + self.listeners.len() + self.variables.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	#[must_use]
	pub fn chart_count(&self) -> usize {
		self.charts.len()
	}

	#[must_use]
	pub fn interval_count(&self) -> usize {
		self.intervals.len()
	}

	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	#[must_use]
	pub fn variable_count(&self) -> usize {
		self.variables.len()
	}
}

impl<H: ResourceHost> fmt::Debug for PageResourceSet<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PageResourceSet")
			.field("charts", &self.charts.keys().collect::<Vec<_>>())
			.field("intervals", &self.intervals)
			.field("listeners.len()", &self.listeners.len())
			.field("variables", &self.variables.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Owns every resource handed to it, keyed by logical page name, and releases a page's resources exactly once.
///
/// Callers must not release registered handles themselves. Pages still registered when the registry is dropped
/// are released then.
pub struct PageResourceRegistry<H: ResourceHost> {
	host: Rc<H>,
	pages: HashMap<String, PageResourceSet<H>>,
	initialized: HashSet<String>,
}

impl<H: ResourceHost> fmt::Debug for PageResourceRegistry<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PageResourceRegistry").field("pages", &self.pages).field("initialized", &self.initialized).finish_non_exhaustive()
	}
}

impl<H: ResourceHost> PageResourceRegistry<H> {
	pub fn new(host: H) -> Self {
		Self {
			host: Rc::new(host),
			pages: HashMap::new(),
			initialized: HashSet::new(),
		}
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	fn page_mut(&mut self, page: &str) -> &mut PageResourceSet<H> {
		self.pages.entry(page.to_owned()).or_default()
	}

	/// Takes ownership of `chart`. A chart already registered under the same name is disposed right away.
	#[instrument(skip(self, chart))]
	pub fn register_chart(&mut self, page: &str, name: &str, chart: H::Chart) {
		if let Some(replaced) = self.page_mut(page).charts.insert(name.to_owned(), chart) {
			warn!("Chart {:?} re-registered on page {:?}; disposing the previous instance.", name, page);
			if let Err(error) = self.host.dispose_chart(replaced) {
				warn!("Failed to dispose replaced chart {:?}: {}", name, error);
			}
		}
	}

	/// Takes ownership of interval `id`. An interval already registered under the same name is cleared right away.
	#[instrument(skip(self))]
	pub fn register_interval(&mut self, page: &str, name: &str, id: i32) {
		if let Some(replaced) = self.page_mut(page).intervals.insert(name.to_owned(), id) {
			if replaced != id {
				warn!("Interval {:?} re-registered on page {:?}; clearing {}.", name, page, replaced);
				self.host.clear_interval(replaced);
			}
		}
	}

	/// Attaches `handler` to `target` and records it for detachment. Nothing is recorded if attaching fails.
	#[instrument(skip(self, target, handler))]
	pub fn register_listener(&mut self, page: &str, target: H::Target, event: &str, handler: H::Handler) -> Result<()> {
		self.host.attach_listener(&target, event, &handler)?;
		self.page_mut(page).listeners.push(ListenerRegistration {
			target,
			event: event.to_owned(),
			handler,
		});
		Ok(())
	}

	pub fn set_variable(&mut self, page: &str, name: &str, value: H::Value) {
		self.page_mut(page).variables.insert(name.to_owned(), value);
	}

	#[must_use]
	pub fn get_variable(&self, page: &str, name: &str) -> Option<&H::Value> {
		self.pages.get(page)?.variables.get(name)
	}

	pub fn mark_initialized(&mut self, page: &str) {
		self.initialized.insert(page.to_owned());
	}

	#[must_use]
	pub fn is_initialized(&self, page: &str) -> bool {
		self.initialized.contains(page)
	}

	#[must_use]
	pub fn resources(&self, page: &str) -> Option<&PageResourceSet<H>> {
		self.pages.get(page)
	}

	#[must_use]
	pub fn has_resources(&self, page: &str) -> bool {
		self.pages.get(page).map_or(false, |set| !set.is_empty())
	}

	#[must_use]
	pub fn resource_count(&self, page: &str) -> usize {
		self.pages.get(page).map_or(0, PageResourceSet::len)
	}

	pub fn page_names(&self) -> impl Iterator<Item = &str> {
		self.pages.keys().map(String::as_str)
	}

	/// Removes `page` and everything it owns from the registry without releasing anything yet.
	///
	/// The page is marked uninitialized. Release the result with [`DetachedPage::release`] once no borrow of
	/// the registry is held any more, so that `destroy` hooks may call back into it.
	pub fn detach_page(&mut self, page: &str) -> Option<DetachedPage<H>> {
		self.initialized.remove(page);
		let set = self.pages.remove(page);
		if set.is_none() {
			trace!("Nothing registered for page {:?}.", page);
		}
		set.map(|set| DetachedPage {
			host: Rc::clone(&self.host),
			page: page.to_owned(),
			set,
		})
	}

	/// Releases everything `page` owns and marks it uninitialized.
	///
	/// Failures are logged per resource and never stop the rest from being released.
	/// Disposing an unknown or already disposed page does nothing.
	/// Returns the number of resources released.
	pub fn dispose_page(&mut self, page: &str) -> usize {
		self.detach_page(page).map_or(0, DetachedPage::release)
	}
}

impl<H: ResourceHost> Drop for PageResourceRegistry<H> {
	fn drop(&mut self) {
		let pages: Vec<String> = self.pages.keys().cloned().collect();
		for page in pages {
			self.dispose_page(&page);
		}
	}
}

/// A page's resources, taken out of the registry and awaiting release.
#[must_use = "dropping a detached page leaks its intervals and listeners"]
pub struct DetachedPage<H: ResourceHost> {
	host: Rc<H>,
	page: String,
	set: PageResourceSet<H>,
}

impl<H: ResourceHost> DetachedPage<H> {
	#[must_use]
	pub fn page(&self) -> &str {
		&self.page
	}

	/// Disposes charts, clears intervals, detaches listeners and drops variables, in that order.
	///
	/// Returns the number of resources released.
	pub fn release(self) -> usize {
		let Self { host, page, set } = self;
		let released = set.len();

		for (name, chart) in set.charts {
			let span = trace_span!("Disposing chart", name = name.as_str());
			let _enter = span.enter();
			if let Err(error) = host.dispose_chart(chart) {
				warn!("Failed to dispose chart {:?} of page {:?}: {}", name, page, error);
			}
		}

		for (name, id) in set.intervals {
			trace!("Clearing interval {:?} ({}).", name, id);
			host.clear_interval(id);
		}

		for ListenerRegistration { target, event, handler } in set.listeners {
			let span = trace_span!("Detaching listener", event = event.as_str());
			let _enter = span.enter();
			if let Err(error) = host.detach_listener(&target, &event, &handler) {
				warn!("Failed to detach {:?} listener of page {:?}: {}", event, page, error);
			}
		}

		drop(set.variables);

		info!("Disposed page {:?} ({} resource(s)).", page, released);
		released
	}
}
