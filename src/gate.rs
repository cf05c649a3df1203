//! [`PermissionGate`]: fetching, caching and answering permission questions for the current user.

use crate::{
	api::{CheckPermissionRequest, CheckPermissionResponse, PermissionApi, TargetObject, Transport},
	config::GateConfig,
	error::{Error, Result},
	requirement::PermissionSource,
	snapshot::{PermissionSnapshot, Role, SessionStore, UserInfo},
	ttl_cache::{PermissionCache, GLOBAL_SCOPE},
};
use core::cell::{Cell, Ref, RefCell};
use hashbrown::HashMap;
use tracing::{error, info, instrument, warn};

/// Fallback text of the denial modal when a 403 body carries no `message`.
pub const DEFAULT_DENIAL_MESSAGE: &str = "Accès refusé";

/// User-visible side effects of the gate. Presentation is up to the implementation.
pub trait Notifier {
	/// A blocked control was activated.
	fn permission_denied(&self, permission: &str);
	/// The server answered 403.
	fn access_denied(&self, message: &str, role_display: &str);
	/// Neither the server nor the session copy produced a snapshot. Non-fatal.
	fn permissions_unavailable(&self);
	/// The server answered 401.
	fn redirect_to_login(&self, login_url: &str);
	/// Initialization settled, whichever way.
	fn ready(&self, snapshot: &PermissionSnapshot);
}

/// How the current snapshot was obtained by the last load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
	Fetched,
	SessionFallback,
	/// Nothing usable was found. The previous snapshot (empty on first load) stays in place.
	Unavailable,
}

/// Result of a server-verified check.
///
/// [`Undetermined`](`RemoteCheck::Undetermined`) covers transport, status and parse failures,
/// which the boolean [`PermissionGate::check_permission_remote`] reports as `false` just like a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCheck {
	Granted,
	Denied,
	Undetermined,
}

impl RemoteCheck {
	fn from_grant(granted: bool) -> Self {
		if granted {
			Self::Granted
		} else {
			Self::Denied
		}
	}
}

/// Holds the permission snapshot of the current user and answers questions against it.
///
/// All failures are non-fatal and degrade towards denial.
/// Interior mutability only; share it as `Rc<PermissionGate<…>>`.
pub struct PermissionGate<T, S, N> {
	api: PermissionApi<T>,
	store: S,
	notifier: N,
	config: GateConfig,
	snapshot: RefCell<PermissionSnapshot>,
	cache: RefCell<PermissionCache>,
	clock: Box<dyn Fn() -> f64>,
	initialized: Cell<bool>,
}

impl<T, S, N> core::fmt::Debug for PermissionGate<T, S, N> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("PermissionGate")
			.field("snapshot", &self.snapshot)
			.field("cache.len()", &self.cache.borrow().len())
			.field("initialized", &self.initialized.get())
			.finish_non_exhaustive()
	}
}

impl<T: Transport, S: SessionStore, N: Notifier> PermissionGate<T, S, N> {
	/// Reads time from `Date.now()`. Use [`with_clock`](`PermissionGate::with_clock`) off the browser.
	pub fn new(transport: T, store: S, notifier: N, config: GateConfig) -> Self {
		Self {
			api: PermissionApi::new(transport, &config),
			store,
			notifier,
			cache: RefCell::new(PermissionCache::new(config.cache_ttl_ms)),
			config,
			snapshot: RefCell::default(),
			clock: Box::new(js_sys::Date::now),
			initialized: Cell::new(false),
		}
	}

	/// Replaces the millisecond clock used for remote check expiry.
	#[must_use]
	pub fn with_clock(mut self, clock: impl Fn() -> f64 + 'static) -> Self {
		self.clock = Box::new(clock);
		self
	}

	/// Loads the snapshot, falling back to the session copy and then to an empty one,
	/// and emits the ready signal once settled.
	#[instrument(skip(self))]
	pub async fn initialize(&self) -> LoadOutcome {
		info!("Initializing permissions.");
		let outcome = self.load().await;
		if outcome == LoadOutcome::Unavailable {
			self.notifier.permissions_unavailable();
		}
		self.initialized.set(true);
		info!(?outcome, "Permissions ready.");
		self.notifier.ready(&self.snapshot.borrow());
		outcome
	}

	/// Same load path as [`initialize`](`PermissionGate::initialize`), without the ready signal.
	#[instrument(skip(self))]
	pub async fn refresh(&self) -> LoadOutcome {
		let outcome = self.load().await;
		info!(?outcome, "Permissions refreshed.");
		outcome
	}

	async fn load(&self) -> LoadOutcome {
		match self.fetch().await {
			Ok(snapshot) => {
				if let Err(error) = snapshot.persist(&self.store, &self.config.permissions_storage_key, &self.config.user_storage_key) {
					warn!("Could not persist the permission snapshot: {}", error);
				}
				*self.snapshot.borrow_mut() = snapshot;
				LoadOutcome::Fetched
			}
			Err(error) => {
				warn!("Loading permissions failed ({}); trying the session copy.", error);
				self.handle_auth_failure(&error);
				match PermissionSnapshot::restore(&self.store, &self.config.permissions_storage_key, &self.config.user_storage_key) {
					Some(snapshot) => {
						*self.snapshot.borrow_mut() = snapshot;
						LoadOutcome::SessionFallback
					}
					None => LoadOutcome::Unavailable,
				}
			}
		}
	}

	async fn fetch(&self) -> Result<PermissionSnapshot> {
		let response = self.api.user_permissions().await?;
		if !response.success {
			return Err(Error::Unsuccessful);
		}
		Ok(PermissionSnapshot::new(response.permissions, response.user))
	}

	/// Re-reads only the user record from the user-info endpoint, keeping the permission map.
	#[instrument(skip(self))]
	pub async fn reload_user_info(&self) -> Option<UserInfo> {
		let fetched = match self.api.user_info().await {
			Ok(response) if response.success => response.user,
			Ok(_) => {
				warn!("User info endpoint reported failure.");
				return None;
			}
			Err(error) => {
				warn!("Loading user info failed: {}", error);
				self.handle_auth_failure(&error);
				return None;
			}
		};
		self.snapshot.borrow_mut().user = fetched.clone();
		Some(fetched)
	}

	fn handle_auth_failure(&self, error: &Error) {
		match error {
			Error::Unauthorized => self.notifier.redirect_to_login(&self.config.login_url),
			Error::Forbidden { message } => self.handle_permission_denied(message.as_deref()),
			_ => (),
		}
	}

	/// Raises the denial modal, e.g. for a 403 observed elsewhere on the page.
	pub fn handle_permission_denied(&self, message: Option<&str>) {
		let role_display = self.snapshot.borrow().user.role_display.clone();
		self.notifier.access_denied(message.unwrap_or(DEFAULT_DENIAL_MESSAGE), &role_display);
	}

	/// Synchronous lookup: snapshot, then role default, then deny.
	pub fn has_permission(&self, permission: &str) -> bool {
		self.snapshot.borrow().has_permission(permission)
	}

	/// Server-verified check for object-scoped permissions.
	///
	/// Answers from the cache when an identical check succeeded within the TTL.
	/// Only successful answers are cached.
	#[instrument(skip(self))]
	pub async fn check_remote(&self, permission: &str, target: Option<&TargetObject>) -> RemoteCheck {
		let key = (permission.to_owned(), target.map_or(GLOBAL_SCOPE, |target| target.id.as_str()).to_owned());
		let cached = self.cache.borrow().get(&key, (self.clock)()).copied();
		if let Some(granted) = cached {
			return RemoteCheck::from_grant(granted);
		}

		match self.api.check_permission(&CheckPermissionRequest::new(permission, target)).await {
			Ok(CheckPermissionResponse { success: true, has_permission }) => {
				let mut cache = self.cache.borrow_mut();
				let now = (self.clock)();
				cache.purge(now);
				cache.insert(key, has_permission, now);
				RemoteCheck::from_grant(has_permission)
			}
			Ok(CheckPermissionResponse { success: false, .. }) => {
				warn!("Remote check of {:?} reported failure.", permission);
				RemoteCheck::Undetermined
			}
			Err(error @ Error::Forbidden { .. }) => {
				self.handle_auth_failure(&error);
				RemoteCheck::Denied
			}
			Err(error) => {
				error!("Remote check of {:?} failed: {}", permission, error);
				self.handle_auth_failure(&error);
				RemoteCheck::Undetermined
			}
		}
	}

	/// [`check_remote`](`PermissionGate::check_remote`) as a boolean.
	///
	/// `false` means "denied or could not be determined".
	pub async fn check_permission_remote(&self, permission: &str, target: Option<&TargetObject>) -> bool {
		self.check_remote(permission, target).await == RemoteCheck::Granted
	}
}

impl<T, S, N> PermissionGate<T, S, N> {
	#[must_use]
	pub fn is_initialized(&self) -> bool {
		self.initialized.get()
	}

	pub fn snapshot(&self) -> Ref<'_, PermissionSnapshot> {
		self.snapshot.borrow()
	}

	pub fn notifier(&self) -> &N {
		&self.notifier
	}

	pub fn config(&self) -> &GateConfig {
		&self.config
	}

	#[must_use]
	pub fn is_admin(&self) -> bool {
		self.snapshot.borrow().user.is_admin
	}

	#[must_use]
	pub fn is_rh(&self) -> bool {
		self.snapshot.borrow().user.is_rh
	}

	#[must_use]
	pub fn is_employee(&self) -> bool {
		self.snapshot.borrow().user.is_employe
	}

	#[must_use]
	pub fn is_manager(&self) -> bool {
		self.snapshot.borrow().user.is_manager
	}

	#[must_use]
	pub fn user_role(&self) -> Role {
		self.snapshot.borrow().user.role
	}

	#[must_use]
	pub fn user_info(&self) -> UserInfo {
		self.snapshot.borrow().user.clone()
	}

	#[must_use]
	pub fn all_permissions(&self) -> HashMap<String, bool> {
		self.snapshot.borrow().permissions.clone()
	}
}

impl<T: Transport, S: SessionStore, N: Notifier> PermissionSource for PermissionGate<T, S, N> {
	fn has_permission(&self, permission: &str) -> bool {
		PermissionGate::has_permission(self, permission)
	}

	fn on_denied(&self, permission: &str) {
		warn!("Permission denied: {:?}", permission);
		self.notifier.permission_denied(permission);
	}
}
