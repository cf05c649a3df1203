//! `web-sys` implementations of the crate's seams, and the page bootstrap.

mod app;
pub mod dom;
mod fetch;
mod host;
mod listeners;
pub mod navigation;
mod notify;
mod storage;

pub use app::{
	apply_permissions, boot, check_permission_remote, cleanup_page, get_all_permissions, get_user_info, get_user_role, get_variable, has_permission, is_admin, is_employee, is_manager,
	is_page_initialized, is_rh, load_page, mark_page_initialized, register_chart, register_event_listener, register_interval, set_variable, start, start_with, App, BrowserGate,
};
pub use dom::{apply_user_header, ApplyReport, DomGate};
pub use fetch::BrowserTransport;
pub use host::{BrowserHost, DomPageView, PAGE_LOADED_EVENT};
pub use listeners::ListenerSet;
pub use navigation::BrowserSpa;
pub use notify::BootstrapNotifier;
pub use storage::BrowserSessionStore;
