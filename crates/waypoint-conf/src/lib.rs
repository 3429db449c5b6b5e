//! # Waypoint Conf
//!
//! Flat `get(key, default)` settings for the dispatcher.
//!
//! ## Example
//!
//! ```
//! use waypoint_conf::{DispatchSettings, MapSettings};
//!
//! let settings = MapSettings::from_toml_str(r#"
//! [dispatch]
//! not_found_prefixes = ["", "/api"]
//! "#).unwrap();
//!
//! let dispatch = DispatchSettings::from_settings(&settings);
//! assert_eq!(dispatch.not_found_prefixes.len(), 2);
//! ```

pub mod dispatch;
pub mod settings;

pub use dispatch::DispatchSettings;
pub use settings::{MapSettings, Settings, SettingsError, SettingsExt};
