//! Typed view over the keys the dispatcher reads.

use crate::settings::{Settings, SettingsExt};

pub const NOT_FOUND_PREFIXES: &str = "dispatch.not_found_prefixes";
pub const ROUTE_DUMP: &str = "dispatch.route_dump";
pub const SESSION_COOKIE_NAME: &str = "sessions.cookie_name";

/// Dispatcher configuration.
///
/// # Examples
///
/// ```
/// use waypoint_conf::{DispatchSettings, MapSettings};
///
/// let settings = MapSettings::new().with("dispatch.route_dump", true);
/// let dispatch = DispatchSettings::from_settings(&settings);
///
/// assert!(dispatch.route_dump);
/// assert_eq!(dispatch.not_found_prefixes, vec![String::new()]);
/// assert_eq!(dispatch.session_cookie_name, "sessionid");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
	/// Path prefixes under which the default not-found handler is registered.
	pub not_found_prefixes: Vec<String>,
	/// Log the route table when the dispatcher is built.
	pub route_dump: bool,
	pub session_cookie_name: String,
}

impl DispatchSettings {
	pub fn from_settings(settings: &dyn Settings) -> Self {
		let defaults = Self::default();
		Self {
			not_found_prefixes: settings.get(NOT_FOUND_PREFIXES, defaults.not_found_prefixes),
			route_dump: settings.get(ROUTE_DUMP, defaults.route_dump),
			session_cookie_name: settings.get(SESSION_COOKIE_NAME, defaults.session_cookie_name),
		}
	}
}

impl Default for DispatchSettings {
	fn default() -> Self {
		Self {
			not_found_prefixes: vec![String::new()],
			route_dump: false,
			session_cookie_name: "sessionid".to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::settings::MapSettings;
	use rstest::rstest;

	#[rstest]
	fn test_defaults_when_empty() {
		let dispatch = DispatchSettings::from_settings(&MapSettings::new());
		assert_eq!(dispatch, DispatchSettings::default());
	}

	#[rstest]
	fn test_reads_all_keys_from_toml() {
		// Arrange
		let settings = MapSettings::from_toml_str(
			r#"
			[dispatch]
			not_found_prefixes = ["/api", "/admin"]
			route_dump = true

			[sessions]
			cookie_name = "wp_session"
			"#,
		)
		.unwrap();

		// Act
		let dispatch = DispatchSettings::from_settings(&settings);

		// Assert
		assert_eq!(dispatch.not_found_prefixes, vec!["/api", "/admin"]);
		assert!(dispatch.route_dump);
		assert_eq!(dispatch.session_cookie_name, "wp_session");
	}
}
