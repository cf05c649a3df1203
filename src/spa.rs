//! Fragment navigation that releases the outgoing page's resources before the next page is requested.

use crate::{
	api::{Method, Transport},
	config::SpaConfig,
	error::Result,
	registry::{DetachedPage, PageResourceRegistry, ResourceHost},
};
use core::cell::{Cell, Ref, RefCell, RefMut};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, instrument};

/// Page name used when a fragment URL doesn't follow `/spa/<name>/`.
pub const UNKNOWN_PAGE: &str = "unknown";

// ASCII word characters only, so page keys agree with the ones page scripts derive in JS.
static PAGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"/spa/([A-Za-z0-9_-]+)/?").expect("static pattern"));

/// The logical page name of a fragment URL: `/spa/leave-balances/` is `leave-balances`.
#[must_use]
pub fn page_name_from_url(url: &str) -> &str {
	PAGE_NAME.captures(url).and_then(|captures| captures.get(1)).map_or(UNKNOWN_PAGE, |name| name.as_str())
}

/// Where fragments end up.
pub trait PageView {
	/// Replaces the content of the container matching `target`.
	fn render(&self, target: &str, html: &str) -> Result<()>;
	/// Announces that `page` was swapped in, for page-specific initialization.
	fn announce_loaded(&self, page: &str, url: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
	Loaded(String),
	/// The fragment could not be fetched or inserted. No page is current.
	Failed,
	/// Another load was in flight. Nothing happened.
	Rejected,
}

/// Clears the loading flag on every exit path.
struct LoadingGuard<'a>(&'a Cell<bool>);

impl<'a> LoadingGuard<'a> {
	fn engage(flag: &'a Cell<bool>) -> Self {
		flag.set(true);
		Self(flag)
	}
}

impl Drop for LoadingGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

/// Swaps HTML fragments into containers and keeps the current page's resources in a [`PageResourceRegistry`].
///
/// The current page is always disposed before the next fragment is requested.
/// Navigation while a load is in flight is dropped, not queued.
pub struct SpaManager<H: ResourceHost, T, V> {
	registry: RefCell<PageResourceRegistry<H>>,
	current_page: RefCell<Option<String>>,
	is_loading: Cell<bool>,
	transport: T,
	view: V,
	config: SpaConfig,
}

impl<H: ResourceHost, T, V> core::fmt::Debug for SpaManager<H, T, V> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("SpaManager")
			.field("registry", &self.registry)
			.field("current_page", &self.current_page)
			.field("is_loading", &self.is_loading.get())
			.finish_non_exhaustive()
	}
}

impl<H: ResourceHost, T: Transport, V: PageView> SpaManager<H, T, V> {
	pub fn new(host: H, transport: T, view: V, config: SpaConfig) -> Self {
		Self {
			registry: RefCell::new(PageResourceRegistry::new(host)),
			current_page: RefCell::new(None),
			is_loading: Cell::new(false),
			transport,
			view,
			config,
		}
	}

	/// Disposes the current page, then loads `url` into the container matching `target`.
	#[instrument(skip(self))]
	pub async fn navigate(&self, url: &str, target: &str) -> Navigation {
		if self.is_loading.get() {
			info!("Load in flight; ignoring navigation to {:?}.", url);
			return Navigation::Rejected;
		}
		let _loading = LoadingGuard::engage(&self.is_loading);

		let outgoing = self.current_page.take();
		if let Some(outgoing) = outgoing {
			self.dispose_page(&outgoing);
		}

		if let Err(error) = self.view.render(target, &self.config.loading_html) {
			error!("Could not render the loading placeholder into {:?}: {}", target, error);
		}

		let inserted = match self.transport.request(Method::Get, url, None).await {
			Ok(html) => self.view.render(target, &html),
			Err(error) => Err(error),
		};
		if let Err(error) = inserted {
			error!("Loading {:?} failed: {}", url, error);
			if let Err(error) = self.view.render(target, &self.config.error_html) {
				error!("Could not render the error banner into {:?}: {}", target, error);
			}
			return Navigation::Failed;
		}

		let page = page_name_from_url(url).to_owned();
		*self.current_page.borrow_mut() = Some(page.clone());
		self.registry.borrow_mut().mark_initialized(&page);
		info!("Loaded SPA page {:?}.", page);
		self.view.announce_loaded(&page, url);
		Navigation::Loaded(page)
	}

	/// [`navigate`](`SpaManager::navigate`) into the configured default container.
	pub async fn navigate_default(&self, url: &str) -> Navigation {
		let target = self.config.default_target.clone();
		self.navigate(url, &target).await
	}
}

impl<H: ResourceHost, T, V> SpaManager<H, T, V> {
	/// Best-effort disposal of whatever page is current, for tab shutdown.
	#[instrument(skip(self))]
	pub fn teardown(&self) -> usize {
		match self.current_page.take() {
			Some(page) => self.dispose_page(&page),
			None => 0,
		}
	}

	/// Releases `page` with the registry borrow already dropped, so chart `destroy` hooks may re-enter it.
	pub fn dispose_page(&self, page: &str) -> usize {
		let detached = self.registry.borrow_mut().detach_page(page);
		detached.map_or(0, DetachedPage::release)
	}

	/// Mutable access for page scripts registering resources. Don't hold it across an `.await`.
	pub fn registry(&self) -> RefMut<'_, PageResourceRegistry<H>> {
		self.registry.borrow_mut()
	}

	/// [`registry`](`SpaManager::registry`), or [`None`] while the registry is already borrowed.
	pub fn try_registry(&self) -> Option<RefMut<'_, PageResourceRegistry<H>>> {
		self.registry.try_borrow_mut().ok()
	}

	pub fn try_registry_ref(&self) -> Option<Ref<'_, PageResourceRegistry<H>>> {
		self.registry.try_borrow().ok()
	}

	pub fn registry_ref(&self) -> Ref<'_, PageResourceRegistry<H>> {
		self.registry.borrow()
	}

	#[must_use]
	pub fn current_page(&self) -> Option<String> {
		self.current_page.borrow().clone()
	}

	#[must_use]
	pub fn is_loading(&self) -> bool {
		self.is_loading.get()
	}

	pub fn config(&self) -> &SpaConfig {
		&self.config
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}
}
