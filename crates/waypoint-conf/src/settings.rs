//! Flat key/value settings.
//!
//! The dispatcher only ever asks for a handful of keys, so settings are a flat
//! map of dotted keys to JSON values. Nested TOML tables are flattened on load:
//!
//! ```toml
//! [dispatch]
//! route_dump = true
//! ```
//!
//! becomes the key `dispatch.route_dump`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Error type for settings sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// A read-only source of configuration values.
pub trait Settings: Send + Sync {
	/// Raw value stored under `key`, if any.
	fn get_value(&self, key: &str) -> Option<&Value>;
}

/// Typed lookups for every [`Settings`] implementation, trait objects included.
pub trait SettingsExt {
	/// Look up `key`, falling back to `default` when it is absent or has the
	/// wrong shape.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_conf::{MapSettings, SettingsExt};
	///
	/// let settings = MapSettings::new().with("dispatch.route_dump", true);
	/// assert!(settings.get("dispatch.route_dump", false));
	/// assert_eq!(settings.get("missing", 7u32), 7);
	/// ```
	fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T;
}

impl<S: Settings + ?Sized> SettingsExt for S {
	fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
		match self.get_value(key) {
			Some(value) => match serde_json::from_value(value.clone()) {
				Ok(parsed) => parsed,
				Err(e) => {
					tracing::warn!(key = %key, error = %e, "Setting has unexpected type, using default");
					default
				}
			},
			None => default,
		}
	}
}

/// In-memory settings keyed by dotted names.
#[derive(Debug, Clone, Default)]
pub struct MapSettings {
	values: BTreeMap<String, Value>,
}

impl MapSettings {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.values.insert(key.into(), value.into());
		self
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.values.insert(key.into(), value.into());
	}

	/// Parse TOML text, flattening nested tables into dotted keys.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_conf::{MapSettings, SettingsExt};
	///
	/// let settings = MapSettings::from_toml_str(r#"
	/// [dispatch]
	/// not_found_prefixes = ["", "/api"]
	/// "#).unwrap();
	///
	/// let prefixes: Vec<String> = settings.get("dispatch.not_found_prefixes", vec![]);
	/// assert_eq!(prefixes, vec!["".to_string(), "/api".to_string()]);
	/// ```
	pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
		let table: toml::Table = toml::from_str(content)?;
		let root = serde_json::to_value(table)?;
		let mut settings = Self::new();
		flatten_into(&mut settings.values, None, root);
		Ok(settings)
	}

	/// Load a TOML file from disk.
	pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}
}

impl Settings for MapSettings {
	fn get_value(&self, key: &str) -> Option<&Value> {
		self.values.get(key)
	}
}

fn flatten_into(out: &mut BTreeMap<String, Value>, prefix: Option<&str>, value: Value) {
	match value {
		Value::Object(map) => {
			for (key, child) in map {
				let full = match prefix {
					Some(prefix) => format!("{}.{}", prefix, key),
					None => key,
				};
				flatten_into(out, Some(&full), child);
			}
		}
		other => {
			if let Some(prefix) = prefix {
				out.insert(prefix.to_string(), other);
			}
		}
	}
}
