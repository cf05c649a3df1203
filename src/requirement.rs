//! Declarative permission requirements as carried by `data-permission` attributes.

use core::fmt;

/// How the names of a [`Requirement`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
	/// At least one name must be granted. The default.
	Any,
	/// Every name must be granted (`data-require-all`).
	All,
}

/// A set of permission names and how to combine them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
	pub permissions: Vec<String>,
	pub combinator: Combinator,
}

impl Requirement {
	/// Parses a `data-permission` value: one name or a comma-separated list.
	///
	/// Entries are trimmed and empty entries dropped.
	#[must_use]
	pub fn parse(attribute: &str, require_all: bool) -> Self {
		Self {
			permissions: attribute.split(',').map(str::trim).filter(|name| !name.is_empty()).map(str::to_owned).collect(),
			combinator: if require_all { Combinator::All } else { Combinator::Any },
		}
	}

	/// A requirement without names is never satisfied, under either combinator.
	pub fn is_satisfied_by(&self, source: &(impl PermissionSource + ?Sized)) -> bool {
		if self.permissions.is_empty() {
			return false;
		}
		match self.combinator {
			Combinator::Any => self.permissions.iter().any(|name| source.has_permission(name)),
			Combinator::All => self.permissions.iter().all(|name| source.has_permission(name)),
		}
	}
}

impl fmt::Display for Requirement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.permissions.join(", "))
	}
}

/// Anything that answers synchronous permission lookups.
pub trait PermissionSource {
	fn has_permission(&self, permission: &str) -> bool;

	/// Called when the user runs into a blocked control.
	fn on_denied(&self, _permission: &str) {}
}

impl PermissionSource for crate::snapshot::PermissionSnapshot {
	fn has_permission(&self, permission: &str) -> bool {
		crate::snapshot::PermissionSnapshot::has_permission(self, permission)
	}
}

/// Permissions that keep the actions column of data tables visible. Holding either suffices.
pub const ACTIONS_COLUMN_PERMISSIONS: [&str; 2] = ["edit_employees", "delete_employees"];

#[must_use]
pub fn actions_column_visible(source: &(impl PermissionSource + ?Sized)) -> bool {
	ACTIONS_COLUMN_PERMISSIONS.iter().any(|name| source.has_permission(name))
}
