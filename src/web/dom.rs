use crate::{
	requirement::{actions_column_visible, PermissionSource, Requirement},
	snapshot::UserInfo,
};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Document, Element, Event, HtmlElement, HtmlImageElement, Node, NodeList};

/// Marker class of elements hidden for lack of permission, for CSS and re-queries.
pub const HIDDEN_CLASS: &str = "permission-hidden";
pub const PERMISSION_ATTRIBUTE: &str = "data-permission";
pub const REQUIRE_ALL_ATTRIBUTE: &str = "data-require-all";
/// Elements matching this are blocked instead of hidden.
pub const ACTION_SELECTOR: &str = ".btn";
/// Elements matching this also hide their enclosing `li`.
pub const NAV_SELECTOR: &str = ".nav-link";
pub const ACTIONS_COLUMN_SELECTOR: &str = ".table th.actions-column";

/// What one [`DomGate::apply`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
	pub checked: usize,
	pub hidden: usize,
	pub blocked: usize,
	pub hidden_columns: usize,
}

/// A control disabled by the previous pass, with enough state to undo exactly what was done to it.
struct BlockedControl {
	element: HtmlElement,
	interceptor: Closure<dyn FnMut(Event)>,
	had_disabled_attribute: bool,
	had_disabled_class: bool,
	title: Option<String>,
}

/// Applies permission requirements declared in `data-permission` attributes to the document.
///
/// Plain elements are hidden (`display: none` plus [`HIDDEN_CLASS`]); action buttons stay visible but are
/// disabled and intercept clicks with a denial notification. Every pass first undoes the blocking of the
/// previous one, so applying twice equals applying once.
pub struct DomGate<G: PermissionSource + 'static> {
	source: Rc<G>,
	document: Document,
	blocked: RefCell<Vec<BlockedControl>>,
}

impl<G: PermissionSource + 'static> core::fmt::Debug for DomGate<G> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("DomGate").field("blocked.len()", &self.blocked.borrow().len()).finish_non_exhaustive()
	}
}

impl<G: PermissionSource + 'static> DomGate<G> {
	pub fn new(source: Rc<G>, document: Document) -> Self {
		Self {
			source,
			document,
			blocked: RefCell::default(),
		}
	}

	pub fn source(&self) -> &Rc<G> {
		&self.source
	}

	/// Number of controls currently blocked.
	#[must_use]
	pub fn blocked_count(&self) -> usize {
		self.blocked.borrow().len()
	}

	#[instrument(skip(self))]
	pub fn apply(&self) -> ApplyReport {
		self.release_blocked();

		let mut report = ApplyReport::default();
		let elements = match self.document.query_selector_all(&format!("[{}]", PERMISSION_ATTRIBUTE)) {
			Ok(elements) => elements,
			Err(error) => {
				error!("Permission scan failed: {:?}", error);
				return report;
			}
		};

		for element in html_elements(&elements) {
			report.checked += 1;
			let requirement = Requirement::parse(&element.get_attribute(PERMISSION_ATTRIBUTE).unwrap_or_default(), element.has_attribute(REQUIRE_ALL_ATTRIBUTE));
			let span = trace_span!("Applying requirement", %requirement);
			let _enter = span.enter();
			if requirement.permissions.is_empty() {
				warn!("Empty `{}` attribute; treating the element as denied.", PERMISSION_ATTRIBUTE);
			}
			let granted = requirement.is_satisfied_by(&*self.source);
			trace!(granted);

			if element.matches(ACTION_SELECTOR).unwrap_or(false) {
				show(&element);
				if !granted {
					self.block(&element, &requirement);
					report.blocked += 1;
				}
				continue;
			}

			if granted {
				show(&element);
			} else {
				hide(&element);
				report.hidden += 1;
			}

			if element.matches(NAV_SELECTOR).unwrap_or(false) {
				match element.closest("li") {
					Ok(Some(item)) => {
						if let Some(item) = item.dyn_ref::<HtmlElement>() {
							if granted {
								unhide_marked(item);
							} else {
								hide(item);
							}
						}
					}
					Ok(None) => (),
					Err(error) => error!("Nav item lookup failed: {:?}", error),
				}
			}
		}

		report.hidden_columns = self.apply_actions_columns();
		info!("Checked {} element(s) for permissions: {:?}", report.checked, report);
		report
	}

	/// Hides the actions column of data tables, header and body cells by position, unless edit or delete is held.
	fn apply_actions_columns(&self) -> usize {
		let visible = actions_column_visible(&*self.source);
		let headers = match self.document.query_selector_all(ACTIONS_COLUMN_SELECTOR) {
			Ok(headers) => headers,
			Err(error) => {
				error!("Actions column scan failed: {:?}", error);
				return 0;
			}
		};

		let mut hidden = 0;
		for header in html_elements(&headers) {
			let index = match column_index(&header) {
				Some(index) => index,
				None => {
					warn!("Actions column header has no parent row; skipping.");
					continue;
				}
			};
			set_marked_visibility(&header, visible);

			let table = match header.closest("table") {
				Ok(Some(table)) => table,
				Ok(None) => continue,
				Err(error) => {
					error!("Table lookup failed: {:?}", error);
					continue;
				}
			};
			let rows = match table.query_selector_all("tbody tr") {
				Ok(rows) => rows,
				Err(error) => {
					error!("Table row scan failed: {:?}", error);
					continue;
				}
			};
			for i in 0..rows.length() {
				let cell = rows.get(i).and_then(|row| row.dyn_into::<Element>().ok()).and_then(|row| row.children().item(index));
				if let Some(cell) = cell.as_ref().and_then(|cell| cell.dyn_ref::<HtmlElement>()) {
					set_marked_visibility(cell, visible);
				}
			}
			if !visible {
				hidden += 1;
			}
		}
		hidden
	}

	fn block(&self, element: &HtmlElement, requirement: &Requirement) {
		let permission = requirement.to_string();
		let source = Rc::clone(&self.source);
		let denied = permission.clone();
		let interceptor = Closure::wrap(Box::new(move |event: Event| {
			event.prevent_default();
			event.stop_propagation();
			source.on_denied(&denied);
		}) as Box<dyn FnMut(Event)>);

		let class_list = element.class_list();
		let blocked = BlockedControl {
			element: element.clone(),
			had_disabled_attribute: element.has_attribute("disabled"),
			had_disabled_class: class_list.contains("disabled"),
			title: element.get_attribute("title"),
			interceptor,
		};

		if let Err(error) = class_list.add_1("disabled") {
			error!("Could not add `disabled` class: {:?}", error);
		}
		if let Err(error) = element.set_attribute("disabled", "disabled") {
			error!("Could not set `disabled`: {:?}", error);
		}
		if let Err(error) = element.set_attribute("title", &format!("Permission requise: {}", permission)) {
			error!("Could not set `title`: {:?}", error);
		}
		if let Err(error) = element.add_event_listener_with_callback("click", blocked.interceptor.as_ref().unchecked_ref()) {
			error!("Could not attach click interceptor: {:?}", error);
		}

		self.blocked.borrow_mut().push(blocked);
	}

	fn release_blocked(&self) {
		for blocked in self.blocked.borrow_mut().drain(..) {
			let element = &blocked.element;
			if let Err(error) = element.remove_event_listener_with_callback("click", blocked.interceptor.as_ref().unchecked_ref()) {
				error!("Could not detach click interceptor: {:?}", error);
			}
			if !blocked.had_disabled_class {
				if let Err(error) = element.class_list().remove_1("disabled") {
					error!("Could not remove `disabled` class: {:?}", error);
				}
			}
			if !blocked.had_disabled_attribute {
				if let Err(error) = element.remove_attribute("disabled") {
					error!("Could not remove `disabled`: {:?}", error);
				}
			}
			let restored = match &blocked.title {
				Some(title) => element.set_attribute("title", title),
				None => element.remove_attribute("title"),
			};
			if let Err(error) = restored {
				error!("Could not restore `title`: {:?}", error);
			}
		}
	}
}

impl<G: PermissionSource + 'static> Drop for DomGate<G> {
	fn drop(&mut self) {
		self.release_blocked();
	}
}

/// Writes the user's name, role badge and avatar into the page header.
#[instrument(skip(document, user))]
pub fn apply_user_header(document: &Document, user: &UserInfo) {
	if let Ok(Some(name)) = document.query_selector(".user-name") {
		name.set_text_content(Some(user.display_name()));
	}

	if let Ok(Some(role)) = document.query_selector(".user-role") {
		role.set_text_content(Some(&user.role_display));
		role.set_class_name(&format!("badge {}", user.role.badge_class()));
	}

	if let Some(avatar) = user.avatar.as_deref().filter(|avatar| !avatar.is_empty()) {
		match document.query_selector(".user-avatar") {
			Ok(Some(element)) => match element.dyn_ref::<HtmlImageElement>() {
				Some(image) => image.set_src(avatar),
				None => warn!("`.user-avatar` is not an <img>."),
			},
			Ok(None) => (),
			Err(error) => error!("Avatar lookup failed: {:?}", error),
		}
	}
}

fn html_elements(list: &NodeList) -> impl Iterator<Item = HtmlElement> + '_ {
	(0..list.length()).filter_map(move |i| list.get(i)?.dyn_into::<HtmlElement>().ok())
}

fn column_index(header: &Element) -> Option<u32> {
	let row = header.parent_element()?;
	let header: &Node = header;
	let cells = row.children();
	(0..cells.length()).find(|&i| cells.item(i).map_or(false, |cell| cell.is_same_node(Some(header))))
}

fn show(element: &HtmlElement) {
	if let Err(error) = element.style().remove_property("display") {
		error!("Could not reset `display`: {:?}", error);
	}
	if let Err(error) = element.class_list().remove_1(HIDDEN_CLASS) {
		error!("Could not remove `{}`: {:?}", HIDDEN_CLASS, error);
	}
}

fn hide(element: &HtmlElement) {
	if let Err(error) = element.style().set_property("display", "none") {
		error!("Could not set `display: none`: {:?}", error);
	}
	if let Err(error) = element.class_list().add_1(HIDDEN_CLASS) {
		error!("Could not add `{}`: {:?}", HIDDEN_CLASS, error);
	}
}

/// Shows `element` only if this crate hid it, leaving author styles alone otherwise.
fn unhide_marked(element: &HtmlElement) {
	if element.class_list().contains(HIDDEN_CLASS) {
		show(element);
	}
}

fn set_marked_visibility(element: &HtmlElement, visible: bool) {
	if visible {
		unhide_marked(element);
	} else {
		hide(element);
	}
}
