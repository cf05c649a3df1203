//! The PaiePro permission endpoints and the transport they travel over.

use crate::{config::GateConfig, error::Result, snapshot::UserInfo};
use async_trait::async_trait;
use hashbrown::HashMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::rc::Rc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
}

impl Method {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}
}

/// Moves request bodies to the server and response bodies back.
///
/// Implementations resolve to the body text of 2xx responses and map statuses as follows:
/// 401 to [`Error::Unauthorized`](`crate::Error::Unauthorized`),
/// 403 to [`Error::Forbidden`](`crate::Error::Forbidden`) (see [`Error::forbidden_from_body`](`crate::Error::forbidden_from_body`)),
/// anything else outside 2xx to [`Error::Status`](`crate::Error::Status`).
#[async_trait(?Send)]
pub trait Transport {
	async fn request(&self, method: Method, url: &str, body: Option<String>) -> Result<String>;
}

#[async_trait(?Send)]
impl<T: Transport + ?Sized> Transport for Rc<T> {
	async fn request(&self, method: Method, url: &str, body: Option<String>) -> Result<String> {
		(**self).request(method, url, body).await
	}
}

#[async_trait(?Send)]
impl<T: Transport + ?Sized> Transport for &T {
	async fn request(&self, method: Method, url: &str, body: Option<String>) -> Result<String> {
		(**self).request(method, url, body).await
	}
}

/// Body of `GET /paie/api/user-permissions/` and `GET /paie/api/user-info/`.
///
/// Missing and `null` members both read as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PermissionsResponse {
	pub success: bool,
	#[serde(deserialize_with = "null_as_default")]
	pub permissions: HashMap<String, bool>,
	#[serde(deserialize_with = "null_as_default")]
	pub user: UserInfo,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An object a fine-grained check is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetObject {
	pub id: String,
	/// Defaults to `"employee"` on the wire.
	pub kind: Option<String>,
}

impl TargetObject {
	#[must_use]
	pub fn new(id: impl Into<String>) -> Self {
		Self { id: id.into(), kind: None }
	}

	#[must_use]
	pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
		self.kind = Some(kind.into());
		self
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckPermissionRequest<'a> {
	pub permission: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_object_id: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_object_type: Option<&'a str>,
}

impl<'a> CheckPermissionRequest<'a> {
	#[must_use]
	pub fn new(permission: &'a str, target: Option<&'a TargetObject>) -> Self {
		Self {
			permission,
			target_object_id: target.map(|target| target.id.as_str()),
			target_object_type: target.map(|target| target.kind.as_deref().unwrap_or("employee")),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct CheckPermissionResponse {
	pub success: bool,
	pub has_permission: bool,
}

/// Typed access to the three permission endpoints.
#[derive(Debug)]
pub struct PermissionApi<T> {
	transport: T,
	user_info_url: String,
	permissions_url: String,
	check_permission_url: String,
}

impl<T: Transport> PermissionApi<T> {
	pub fn new(transport: T, config: &GateConfig) -> Self {
		Self {
			transport,
			user_info_url: config.user_info_url.clone(),
			permissions_url: config.permissions_url.clone(),
			check_permission_url: config.check_permission_url.clone(),
		}
	}

	#[instrument(skip(self))]
	pub async fn user_permissions(&self) -> Result<PermissionsResponse> {
		let body = self.transport.request(Method::Get, &self.permissions_url, None).await?;
		Ok(serde_json::from_str(&body)?)
	}

	#[instrument(skip(self))]
	pub async fn user_info(&self) -> Result<PermissionsResponse> {
		let body = self.transport.request(Method::Get, &self.user_info_url, None).await?;
		Ok(serde_json::from_str(&body)?)
	}

	#[instrument(skip(self))]
	pub async fn check_permission(&self, request: &CheckPermissionRequest<'_>) -> Result<CheckPermissionResponse> {
		let body = serde_json::to_string(request)?;
		let body = self.transport.request(Method::Post, &self.check_permission_url, Some(body)).await?;
		Ok(serde_json::from_str(&body)?)
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}
}
