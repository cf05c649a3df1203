use hashbrown::HashMap;
use paie_dom::{
	requirement::{actions_column_visible, Combinator, PermissionSource, Requirement},
	snapshot::{PermissionSnapshot, Resolution, Role, UserInfo},
	ttl_cache::TtlHashMap,
};

mod fakes_;
use fakes_::MemoryStore;

fn snapshot(permissions: &[(&str, bool)], role: Role) -> PermissionSnapshot {
	PermissionSnapshot::new(
		permissions.iter().map(|&(name, granted)| (name.to_owned(), granted)).collect::<HashMap<_, _>>(),
		UserInfo { role, ..UserInfo::default() },
	)
}

#[test]
fn resolution_order() {
	let employee = snapshot(&[("request_leaves", false), ("export_payroll", true)], Role::Employe);

	assert_eq!(employee.resolve("request_leaves"), Resolution::Snapshot(false));
	assert_eq!(employee.resolve("export_payroll"), Resolution::Snapshot(true));
	assert_eq!(employee.resolve("view_own_payroll"), Resolution::RoleDefault(true));
	assert_eq!(employee.resolve("manage_users"), Resolution::Denied);

	assert!(!employee.has_permission("request_leaves"));
	assert!(employee.has_permission("view_own_payroll"));
	assert!(!employee.has_permission("manage_users"));
}

#[test]
fn unknown_role_has_no_defaults() {
	let nobody = snapshot(&[], Role::Unknown);
	for role in [Role::Admin, Role::Rh, Role::Employe] {
		for permission in role.defaults() {
			assert_eq!(nobody.resolve(permission), Resolution::Denied);
		}
	}
}

#[test]
fn role_defaults() {
	let admin = snapshot(&[], Role::Admin);
	assert!(admin.has_permission("edit_system_settings"));
	assert!(admin.has_permission("delete_employees"));
	assert!(!admin.has_permission("validate_timesheet"));

	let rh = snapshot(&[], Role::Rh);
	assert!(rh.has_permission("validate_timesheet"));
	assert!(!rh.has_permission("delete_employees"));
}

#[test]
fn role_wire_format() {
	let user: UserInfo = serde_json::from_str(r#"{"role": "ADMIN"}"#).unwrap();
	assert_eq!(user.role, Role::Admin);
	let user: UserInfo = serde_json::from_str(r#"{"role": "STAGIAIRE"}"#).unwrap();
	assert_eq!(user.role, Role::Unknown);
	let user: UserInfo = serde_json::from_str(r#"{"role": null}"#).unwrap();
	assert_eq!(user.role, Role::Unknown);
	let user: UserInfo = serde_json::from_str("{}").unwrap();
	assert_eq!(user.role, Role::Unknown);

	assert_eq!(serde_json::to_value(Role::Rh).unwrap(), serde_json::json!("RH"));
	assert_eq!(serde_json::to_value(Role::Unknown).unwrap(), serde_json::Value::Null);
}

#[test]
fn session_copy_round_trips() {
	let store = MemoryStore::default();
	let original = snapshot(&[("view_all_payroll", true), ("edit_employees", false)], Role::Rh);
	original.persist(&store, "p", "u").unwrap();

	assert_eq!(PermissionSnapshot::restore(&store, "p", "u"), Some(original));
	assert_eq!(PermissionSnapshot::restore(&store, "p", "missing"), None);
}

#[test]
fn unreadable_session_copy_is_discarded() {
	use paie_dom::snapshot::SessionStore;

	let store = MemoryStore::default();
	store.set_item("p", "{not json").unwrap();
	store.set_item("u", "{}").unwrap();
	assert_eq!(PermissionSnapshot::restore(&store, "p", "u"), None);
}

#[test]
fn requirement_parsing() {
	let requirement = Requirement::parse(" edit_employees , delete_employees,, ", false);
	assert_eq!(requirement.permissions, ["edit_employees", "delete_employees"]);
	assert_eq!(requirement.combinator, Combinator::Any);
	assert_eq!(requirement.to_string(), "edit_employees, delete_employees");

	assert_eq!(Requirement::parse("approve_leaves", true).combinator, Combinator::All);
	assert!(Requirement::parse(" , ", false).permissions.is_empty());
}

#[test]
fn require_all() {
	let requirement = Requirement::parse("a,b", true);
	assert!(!requirement.is_satisfied_by(&snapshot(&[("a", true), ("b", false)], Role::Unknown)));
	assert!(requirement.is_satisfied_by(&snapshot(&[("a", true), ("b", true)], Role::Unknown)));
}

#[test]
fn require_any() {
	let requirement = Requirement::parse("a,b", false);
	assert!(requirement.is_satisfied_by(&snapshot(&[("a", false), ("b", true)], Role::Unknown)));
	assert!(!requirement.is_satisfied_by(&snapshot(&[("a", false)], Role::Unknown)));
}

#[test]
fn empty_requirement_is_never_satisfied() {
	let everything = snapshot(&[("", true)], Role::Admin);
	assert!(!Requirement::parse("", false).is_satisfied_by(&everything));
	assert!(!Requirement::parse("", true).is_satisfied_by(&everything));
}

#[test]
fn actions_column() {
	assert!(actions_column_visible(&snapshot(&[], Role::Rh)));
	assert!(actions_column_visible(&snapshot(&[("delete_employees", true)], Role::Employe)));
	assert!(!actions_column_visible(&snapshot(&[], Role::Employe)));
	assert!(!actions_column_visible(&snapshot(&[("edit_employees", false)], Role::Employe)));

	let source: &dyn PermissionSource = &snapshot(&[], Role::Admin);
	assert!(actions_column_visible(source));
}

#[test]
fn ttl_expiry_and_purge() {
	let mut cache = TtlHashMap::<String, bool>::new(100);
	cache.insert("a".to_owned(), true, 0.0);
	cache.insert("b".to_owned(), false, 50.0);

	assert_eq!(cache.get("a", 99.0), Some(&true));
	assert_eq!(cache.get("a", 100.0), None);
	assert_eq!(cache.get("b", 100.0), Some(&false));
	assert_eq!(cache.len(), 2);

	assert_eq!(cache.purge(120.0), 1);
	assert_eq!(cache.len(), 1);
	assert_eq!(cache.get("b", 120.0), Some(&false));

	cache.insert("b".to_owned(), true, 200.0);
	assert_eq!(cache.get("b", 250.0), Some(&true));

	cache.clear();
	assert!(cache.is_empty());
}
