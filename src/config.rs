//! Endpoint locations, storage keys and timing constants.
//!
//! The defaults match the PaiePro server routes. They are plain data so that tests and
//! alternative deployments can swap single fields with struct update syntax.

/// Five minutes, in milliseconds.
pub const FIVE_MINUTES_MS: u32 = 5 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
	pub user_info_url: String,
	pub permissions_url: String,
	pub check_permission_url: String,
	pub login_url: String,
	pub permissions_storage_key: String,
	pub user_storage_key: String,
	/// Validity window of remote permission checks.
	pub cache_ttl_ms: u32,
	/// Period of the autonomous snapshot refresh.
	pub refresh_interval_ms: u32,
}

impl Default for GateConfig {
	fn default() -> Self {
		Self {
			user_info_url: "/paie/api/user-info/".to_owned(),
			permissions_url: "/paie/api/user-permissions/".to_owned(),
			check_permission_url: "/paie/api/check-permission/".to_owned(),
			login_url: "/paie/auth/login/".to_owned(),
			permissions_storage_key: "paiepro_permissions".to_owned(),
			user_storage_key: "paiepro_user".to_owned(),
			cache_ttl_ms: FIVE_MINUTES_MS,
			refresh_interval_ms: FIVE_MINUTES_MS,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaConfig {
	/// Container selector used when a link doesn't carry `data-target`.
	pub default_target: String,
	pub loading_html: String,
	pub error_html: String,
	pub dashboard_refresh_ms: u32,
	pub dashboard_stats_url: String,
}

impl Default for SpaConfig {
	fn default() -> Self {
		Self {
			default_target: "#main-content".to_owned(),
			loading_html: r#"<div class="text-center p-5"><i class="fas fa-spinner fa-spin fa-2x text-primary"></i><br>Chargement...</div>"#.to_owned(),
			error_html: r#"<div class="alert alert-danger">Erreur lors du chargement de la page. Veuillez réessayer.</div>"#.to_owned(),
			dashboard_refresh_ms: 30_000,
			dashboard_stats_url: "/api/dashboard/stats/".to_owned(),
		}
	}
}
