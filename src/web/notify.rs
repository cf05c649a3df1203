use crate::{
	error::{Error, Result},
	gate::Notifier,
	snapshot::PermissionSnapshot,
};
use js_sys::{Array, Function, Reflect};
use tracing::{error, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CustomEvent, CustomEventInit, Document, Element, Window};

const MODAL_ID: &str = "permissionDeniedModal";

const MODAL_HTML: &str = r#"<div class="modal-dialog modal-dialog-centered">
	<div class="modal-content">
		<div class="modal-header bg-warning text-dark">
			<h5 class="modal-title"><i class="fas fa-exclamation-triangle me-2"></i>Accès refusé</h5>
			<button type="button" class="btn-close" data-bs-dismiss="modal"></button>
		</div>
		<div class="modal-body">
			<p class="permission-denied-message"></p>
			<div class="alert alert-info">
				<strong>Votre rôle actuel:</strong>
				<span class="badge bg-info ms-2 permission-denied-role"></span>
			</div>
		</div>
		<div class="modal-footer">
			<button type="button" class="btn btn-secondary" data-bs-dismiss="modal">Fermer</button>
		</div>
	</div>
</div>"#;

const TOAST_HTML: &str = r#"<div class="d-flex">
	<div class="toast-body"><strong class="toast-title"></strong><br><span class="toast-message"></span></div>
	<button type="button" class="btn-close btn-close-white me-2 m-auto" data-bs-dismiss="toast"></button>
</div>"#;

/// Presents gate notifications with Bootstrap toasts and modals, falling back to `alert` where
/// Bootstrap isn't loaded. Server-provided text is only ever inserted as text content.
#[derive(Debug, Clone)]
pub struct BootstrapNotifier {
	window: Window,
	document: Document,
}

impl BootstrapNotifier {
	#[must_use]
	pub fn new(window: Window, document: Document) -> Self {
		Self { window, document }
	}

	/// `window.bootstrap[component]`, if that's a constructor.
	fn bootstrap_component(&self, component: &str) -> Option<Function> {
		let bootstrap = Reflect::get(&self.window, &JsValue::from_str("bootstrap")).ok()?;
		if bootstrap.is_undefined() {
			return None;
		}
		Reflect::get(&bootstrap, &JsValue::from_str(component)).ok()?.dyn_into().ok()
	}

	fn show_component(&self, component: &Function, element: &Element) -> Result<()> {
		let instance = Reflect::construct(component, &Array::of1(element)).map_err(|error| Error::dom(&error))?;
		let show: Function = Reflect::get(&instance, &JsValue::from_str("show")).map_err(|error| Error::dom(&error))?.dyn_into().map_err(|error| Error::dom(&error))?;
		show.call0(&instance).map_err(|error| Error::dom(&error))?;
		Ok(())
	}

	fn set_text(parent: &Element, selector: &str, text: &str) -> Result<()> {
		let element = parent
			.query_selector(selector)
			.map_err(|error| Error::dom(&error))?
			.ok_or_else(|| Error::Dom(format!("{:?} missing from template", selector)))?;
		element.set_text_content(Some(text));
		Ok(())
	}

	fn toast(&self, title: &str, message: &str, kind: &str) -> Result<()> {
		let toast_component = match self.bootstrap_component("Toast") {
			Some(component) => component,
			None => {
				return self.window.alert_with_message(message).map_err(|error| Error::dom(&error));
			}
		};

		let body = self.document.body().ok_or_else(|| Error::Dom("document has no body".to_owned()))?;
		let container = match self.document.query_selector(".toast-container").map_err(|error| Error::dom(&error))? {
			Some(container) => container,
			None => {
				let container = self.document.create_element("div").map_err(|error| Error::dom(&error))?;
				container.set_class_name("toast-container position-fixed top-0 end-0 p-3");
				body.append_child(&container).map_err(|error| Error::dom(&error))?;
				container
			}
		};

		let toast = self.document.create_element("div").map_err(|error| Error::dom(&error))?;
		toast.set_class_name(&format!("toast align-items-center text-bg-{} border-0", kind));
		toast.set_attribute("role", "alert").map_err(|error| Error::dom(&error))?;
		toast.set_inner_html(TOAST_HTML);
		Self::set_text(&toast, ".toast-title", title)?;
		Self::set_text(&toast, ".toast-message", message)?;
		container.append_child(&toast).map_err(|error| Error::dom(&error))?;

		self.show_component(&toast_component, &toast)
	}

	fn modal(&self, message: &str, role_display: &str) -> Result<()> {
		if let Some(existing) = self.document.get_element_by_id(MODAL_ID) {
			existing.remove();
		}

		let body = self.document.body().ok_or_else(|| Error::Dom("document has no body".to_owned()))?;
		let modal = self.document.create_element("div").map_err(|error| Error::dom(&error))?;
		modal.set_id(MODAL_ID);
		modal.set_class_name("modal fade");
		modal.set_attribute("tabindex", "-1").map_err(|error| Error::dom(&error))?;
		modal.set_inner_html(MODAL_HTML);
		Self::set_text(&modal, ".permission-denied-message", message)?;
		Self::set_text(&modal, ".permission-denied-role", role_display)?;
		body.append_child(&modal).map_err(|error| Error::dom(&error))?;

		match self.bootstrap_component("Modal") {
			Some(component) => self.show_component(&component, &modal),
			None => self.window.alert_with_message(message).map_err(|error| Error::dom(&error)),
		}
	}

	fn dispatch_ready(&self, snapshot: &PermissionSnapshot) -> Result<()> {
		let detail = serde_json::json!({
			"permissions": snapshot.permissions,
			"userInfo": snapshot.user,
		});
		let detail = js_sys::JSON::parse(&detail.to_string()).map_err(|error| Error::dom(&error))?;
		let init = CustomEventInit::new();
		init.set_detail(&detail);
		let event = CustomEvent::new_with_event_init_dict("permissionsReady", &init).map_err(|error| Error::dom(&error))?;
		self.window.dispatch_event(&event).map_err(|error| Error::dom(&error))?;
		Ok(())
	}
}

impl Notifier for BootstrapNotifier {
	fn permission_denied(&self, permission: &str) {
		let message = format!("Vous n'avez pas la permission \"{}\" pour effectuer cette action.", permission);
		if let Err(error) = self.toast("Accès refusé", &message, "warning") {
			error!("Could not show the denial toast: {}", error);
		}
	}

	fn access_denied(&self, message: &str, role_display: &str) {
		warn!("Access denied: {}", message);
		if let Err(error) = self.modal(message, role_display) {
			error!("Could not show the denial modal: {}", error);
		}
	}

	fn permissions_unavailable(&self) {
		if let Err(error) = self.toast(
			"Erreur Permissions",
			"Impossible de charger les permissions. Certaines fonctionnalités peuvent être limitées.",
			"danger",
		) {
			error!("Could not show the permission load failure toast: {}", error);
		}
	}

	fn redirect_to_login(&self, login_url: &str) {
		info!("Session expired; redirecting to {:?}.", login_url);
		if let Err(error) = self.window.location().set_href(login_url) {
			error!("Redirect to {:?} failed: {:?}", login_url, error);
		}
	}

	fn ready(&self, snapshot: &PermissionSnapshot) {
		if let Err(error) = self.dispatch_ready(snapshot) {
			error!("Could not dispatch `permissionsReady`: {}", error);
		}
	}
}
