//! The coarse, locally cached permission state and its resolution order.

use crate::error::Result;
use core::fmt;
use hashbrown::HashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{trace, warn};

/// A PaiePro user role as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
	Admin,
	Rh,
	Employe,
	/// Missing or unrecognised. Has no role defaults.
	Unknown,
}

impl Role {
	#[must_use]
	pub fn from_code(code: &str) -> Self {
		match code {
			"ADMIN" => Self::Admin,
			"RH" => Self::Rh,
			"EMPLOYE" => Self::Employe,
			_ => Self::Unknown,
		}
	}

	#[must_use]
	pub fn code(self) -> Option<&'static str> {
		match self {
			Self::Admin => Some("ADMIN"),
			Self::Rh => Some("RH"),
			Self::Employe => Some("EMPLOYE"),
			Self::Unknown => None,
		}
	}

	/// Static fallback grants, consulted only for names the snapshot doesn't contain.
	#[must_use]
	pub fn defaults(self) -> &'static [&'static str] {
		match self {
			Self::Admin => &[
				"manage_users",
				"view_all_employees",
				"edit_employees",
				"delete_employees",
				"view_all_payroll",
				"calculate_payroll",
				"validate_payroll",
				"approve_leaves",
				"edit_system_settings",
			],
			Self::Rh => &[
				"manage_users",
				"view_all_employees",
				"edit_employees",
				"view_all_payroll",
				"calculate_payroll",
				"approve_leaves",
				"validate_timesheet",
			],
			Self::Employe => &["view_own_data", "request_leaves", "view_own_payroll", "view_own_timesheet"],
			Self::Unknown => &[],
		}
	}

	#[must_use]
	pub fn default_for(self, permission: &str) -> Option<bool> {
		self.defaults().iter().any(|&granted| granted == permission).then_some(true)
	}

	/// Bootstrap badge class for the user header.
	#[must_use]
	pub fn badge_class(self) -> &'static str {
		match self {
			Self::Admin => "badge-danger",
			Self::Rh => "badge-warning",
			Self::Employe => "badge-info",
			Self::Unknown => "badge-secondary",
		}
	}
}

impl Default for Role {
	fn default() -> Self {
		Self::Unknown
	}
}

impl Serialize for Role {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.code().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Role {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(Option::<String>::deserialize(deserializer)?.as_deref().map_or(Self::Unknown, Self::from_code))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
	pub role: Role,
	pub role_display: String,
	pub full_name: String,
	pub username: String,
	pub avatar: Option<String>,
	pub is_admin: bool,
	pub is_rh: bool,
	pub is_employe: bool,
	pub is_manager: bool,
}

impl UserInfo {
	/// `full_name`, or `username` if the former is empty.
	#[must_use]
	pub fn display_name(&self) -> &str {
		if self.full_name.is_empty() {
			&self.username
		} else {
			&self.full_name
		}
	}
}

/// Where a [`PermissionSnapshot::resolve`] answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	Snapshot(bool),
	RoleDefault(bool),
	/// Neither source knows the name.
	Denied,
}

impl Resolution {
	#[must_use]
	pub fn is_granted(self) -> bool {
		match self {
			Self::Snapshot(granted) | Self::RoleDefault(granted) => granted,
			Self::Denied => false,
		}
	}
}

/// Permission name to grant mapping plus the user it belongs to.
///
/// UX-only: nothing here is a security boundary.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PermissionSnapshot {
	pub permissions: HashMap<String, bool>,
	pub user: UserInfo,
}

impl fmt::Debug for PermissionSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			f.debug_struct("PermissionSnapshot").field("permissions", &self.permissions).field("user", &self.user).finish()
		} else {
			f.debug_struct("PermissionSnapshot")
				.field("permissions.len()", &self.permissions.len())
				.field("role", &self.user.role)
				.finish_non_exhaustive()
		}
	}
}

impl PermissionSnapshot {
	#[must_use]
	pub fn new(permissions: HashMap<String, bool>, user: UserInfo) -> Self {
		Self { permissions, user }
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.permissions.is_empty()
	}

	/// Snapshot value, then role default, then deny. This order is authoritative.
	#[must_use]
	pub fn resolve(&self, permission: &str) -> Resolution {
		if let Some(&granted) = self.permissions.get(permission) {
			return Resolution::Snapshot(granted);
		}
		if let Some(granted) = self.user.role.default_for(permission) {
			return Resolution::RoleDefault(granted);
		}
		Resolution::Denied
	}

	/// [`resolve`](`PermissionSnapshot::resolve`) collapsed to a boolean, logging names nobody knows.
	#[must_use]
	pub fn has_permission(&self, permission: &str) -> bool {
		let resolution = self.resolve(permission);
		match resolution {
			Resolution::Denied => warn!("Unknown permission {:?}; denying.", permission),
			_ => trace!(permission, ?resolution),
		}
		resolution.is_granted()
	}

	/// Writes both halves as JSON under their own keys.
	pub fn persist(&self, store: &dyn SessionStore, permissions_key: &str, user_key: &str) -> Result<()> {
		store.set_item(permissions_key, &serde_json::to_string(&self.permissions)?)?;
		store.set_item(user_key, &serde_json::to_string(&self.user)?)?;
		Ok(())
	}

	/// Reads back what [`persist`](`PermissionSnapshot::persist`) wrote.
	///
	/// Returns [`None`] unless both keys are present and parse.
	#[must_use]
	pub fn restore(store: &dyn SessionStore, permissions_key: &str, user_key: &str) -> Option<Self> {
		let permissions = store.get_item(permissions_key)?;
		let user = store.get_item(user_key)?;
		let parsed = serde_json::from_str(&permissions).and_then(|permissions| Ok(Self::new(permissions, serde_json::from_str(&user)?)));
		match parsed {
			Ok(snapshot) => Some(snapshot),
			Err(error) => {
				warn!("Discarding unreadable session copy of the permission snapshot: {}", error);
				None
			}
		}
	}
}

/// Session-scoped key-value persistence, `window.sessionStorage` in the browser.
pub trait SessionStore {
	fn get_item(&self, key: &str) -> Option<String>;
	fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: SessionStore + ?Sized> SessionStore for std::rc::Rc<T> {
	fn get_item(&self, key: &str) -> Option<String> {
		(**self).get_item(key)
	}

	fn set_item(&self, key: &str, value: &str) -> Result<()> {
		(**self).set_item(key, value)
	}
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
	fn get_item(&self, key: &str) -> Option<String> {
		(**self).get_item(key)
	}

	fn set_item(&self, key: &str, value: &str) -> Result<()> {
		(**self).set_item(key, value)
	}
}
