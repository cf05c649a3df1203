#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::oneshot;
use paie_dom::{
	api::{Method, Transport},
	gate::Notifier,
	registry::ResourceHost,
	snapshot::{PermissionSnapshot, SessionStore},
	spa::PageView,
	Error, Result,
};
use std::{
	cell::RefCell,
	collections::{HashMap, VecDeque},
	rc::Rc,
};

/// Ordered record of side effects shared between fakes, for sequencing assertions.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
	Rc::default()
}

pub struct FakeTransport {
	responder: Box<dyn Fn(Method, &str) -> Result<String>>,
	journal: Journal,
	pub requests: RefCell<Vec<(Method, String, Option<String>)>>,
}

impl FakeTransport {
	pub fn new(responder: impl Fn(Method, &str) -> Result<String> + 'static) -> Rc<Self> {
		Self::with_journal(journal(), responder)
	}

	pub fn with_journal(journal: Journal, responder: impl Fn(Method, &str) -> Result<String> + 'static) -> Rc<Self> {
		Rc::new(Self {
			responder: Box::new(responder),
			journal,
			requests: RefCell::default(),
		})
	}

	pub fn request_count(&self) -> usize {
		self.requests.borrow().len()
	}

	pub fn last_body(&self) -> Option<String> {
		self.requests.borrow().last().and_then(|(_, _, body)| body.clone())
	}
}

#[async_trait(?Send)]
impl Transport for FakeTransport {
	async fn request(&self, method: Method, url: &str, body: Option<String>) -> Result<String> {
		self.journal.borrow_mut().push(format!("{} {}", method.as_str(), url));
		self.requests.borrow_mut().push((method, url.to_owned(), body));
		(self.responder)(method, url)
	}
}

/// Holds every request open until the test answers it through the returned sender.
#[derive(Default)]
pub struct GatedTransport {
	pending: RefCell<VecDeque<oneshot::Receiver<Result<String>>>>,
}

impl GatedTransport {
	pub fn gate(&self) -> oneshot::Sender<Result<String>> {
		let (sender, receiver) = oneshot::channel();
		self.pending.borrow_mut().push_back(receiver);
		sender
	}
}

#[async_trait(?Send)]
impl Transport for GatedTransport {
	async fn request(&self, _method: Method, _url: &str, _body: Option<String>) -> Result<String> {
		let receiver = self.pending.borrow_mut().pop_front();
		match receiver {
			Some(receiver) => receiver.await.unwrap_or_else(|_| Err(Error::Transport("sender dropped".to_owned()))),
			None => Err(Error::Transport("no response scheduled".to_owned())),
		}
	}
}

#[derive(Default)]
pub struct MemoryStore(RefCell<HashMap<String, String>>);

impl SessionStore for MemoryStore {
	fn get_item(&self, key: &str) -> Option<String> {
		self.0.borrow().get(key).cloned()
	}

	fn set_item(&self, key: &str, value: &str) -> Result<()> {
		self.0.borrow_mut().insert(key.to_owned(), value.to_owned());
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
	PermissionDenied(String),
	AccessDenied { message: String, role_display: String },
	Unavailable,
	Redirect(String),
	Ready(usize),
}

#[derive(Default)]
pub struct RecordingNotifier(pub RefCell<Vec<Notice>>);

impl RecordingNotifier {
	pub fn notices(&self) -> Vec<Notice> {
		self.0.borrow().clone()
	}
}

impl Notifier for RecordingNotifier {
	fn permission_denied(&self, permission: &str) {
		self.0.borrow_mut().push(Notice::PermissionDenied(permission.to_owned()));
	}

	fn access_denied(&self, message: &str, role_display: &str) {
		self.0.borrow_mut().push(Notice::AccessDenied {
			message: message.to_owned(),
			role_display: role_display.to_owned(),
		});
	}

	fn permissions_unavailable(&self) {
		self.0.borrow_mut().push(Notice::Unavailable);
	}

	fn redirect_to_login(&self, login_url: &str) {
		self.0.borrow_mut().push(Notice::Redirect(login_url.to_owned()));
	}

	fn ready(&self, snapshot: &PermissionSnapshot) {
		self.0.borrow_mut().push(Notice::Ready(snapshot.permissions.len()));
	}
}

/// A chart handle whose disposal can be made to fail.
#[derive(Debug)]
pub struct FakeChart {
	pub name: &'static str,
	pub fails: bool,
}

impl FakeChart {
	pub fn new(name: &'static str) -> Self {
		Self { name, fails: false }
	}

	pub fn failing(name: &'static str) -> Self {
		Self { name, fails: true }
	}
}

/// Records every host call into a [`Journal`].
#[derive(Default)]
pub struct FakeHost {
	pub journal: Journal,
	pub refuse_attach: bool,
	pub refuse_detach: bool,
	/// Runs inside every chart disposal, like a chart library's teardown hook calling back into page code.
	pub on_dispose: Rc<RefCell<Option<Box<dyn Fn()>>>>,
}

impl FakeHost {
	pub fn new(journal: Journal) -> Self {
		Self {
			journal,
			..Self::default()
		}
	}

	pub fn count(&self, entry: &str) -> usize {
		self.journal.borrow().iter().filter(|logged| logged.as_str() == entry).count()
	}
}

impl ResourceHost for FakeHost {
	type Chart = FakeChart;
	type Target = &'static str;
	type Handler = u32;
	type Value = String;

	fn dispose_chart(&self, chart: FakeChart) -> Result<()> {
		self.journal.borrow_mut().push(format!("dispose {}", chart.name));
		if let Some(hook) = self.on_dispose.borrow().as_ref() {
			hook();
		}
		if chart.fails {
			Err(Error::Dispose(format!("{} exploded", chart.name)))
		} else {
			Ok(())
		}
	}

	fn clear_interval(&self, id: i32) {
		self.journal.borrow_mut().push(format!("clear {}", id));
	}

	fn attach_listener(&self, target: &&'static str, event: &str, handler: &u32) -> Result<()> {
		if self.refuse_attach {
			return Err(Error::Dom("attach refused".to_owned()));
		}
		self.journal.borrow_mut().push(format!("attach {} {} {}", target, event, handler));
		Ok(())
	}

	fn detach_listener(&self, target: &&'static str, event: &str, handler: &u32) -> Result<()> {
		self.journal.borrow_mut().push(format!("detach {} {} {}", target, event, handler));
		if self.refuse_detach {
			Err(Error::Dom("detach refused".to_owned()))
		} else {
			Ok(())
		}
	}
}

/// Records what was rendered where, and announcements.
pub struct RecordingView {
	pub journal: Journal,
	pub missing_target: Option<&'static str>,
}

impl RecordingView {
	pub fn new(journal: Journal) -> Self {
		Self { journal, missing_target: None }
	}
}

impl PageView for RecordingView {
	fn render(&self, target: &str, html: &str) -> Result<()> {
		if self.missing_target == Some(target) {
			return Err(Error::Dom(format!("no element matches {:?}", target)));
		}
		self.journal.borrow_mut().push(format!("render {} {}", target, html));
		Ok(())
	}

	fn announce_loaded(&self, page: &str, url: &str) {
		self.journal.borrow_mut().push(format!("loaded {} {}", page, url));
	}
}
