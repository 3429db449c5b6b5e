//! Session data

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Session ID type
pub type SessionId = String;

/// An opaque mutable mapping keyed by a session identifier.
///
/// Every mutation marks the session as changed; only changed sessions are
/// written back to the store at the end of a request.
///
/// # Examples
///
/// ```
/// use waypoint_sessions::Session;
/// use serde_json::json;
///
/// let mut session = Session::new();
/// assert!(session.is_new());
/// assert!(!session.is_changed());
///
/// session.set("user_id", json!(42));
/// assert!(session.is_changed());
/// assert_eq!(session.get_as::<u32>("user_id"), Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	id: SessionId,
	data: HashMap<String, serde_json::Value>,
	#[serde(skip)]
	changed: bool,
	#[serde(skip)]
	is_new: bool,
}

impl Session {
	/// Create a new, empty session with a fresh identifier.
	pub fn new() -> Self {
		Self {
			id: Uuid::new_v4().to_string(),
			data: HashMap::new(),
			changed: false,
			is_new: true,
		}
	}

	/// Rebuild a session that already exists in a store.
	pub fn from_stored(id: impl Into<SessionId>, data: HashMap<String, serde_json::Value>) -> Self {
		Self {
			id: id.into(),
			data,
			changed: false,
			is_new: false,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.data.get(key)
	}

	/// Get a value and deserialize it, `None` when absent or of another shape.
	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.data
			.get(key)
			.and_then(|value| serde_json::from_value(value.clone()).ok())
	}

	pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
		self.data.insert(key.into(), value);
		self.changed = true;
	}

	pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
		let removed = self.data.remove(key);
		if removed.is_some() {
			self.changed = true;
		}
		removed
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.data.contains_key(key)
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn clear(&mut self) {
		if !self.data.is_empty() {
			self.data.clear();
			self.changed = true;
		}
	}

	/// Issue a new identifier while keeping the data, e.g. after login.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_sessions::Session;
	///
	/// let mut session = Session::new();
	/// let old = session.id().to_string();
	/// session.cycle_id();
	/// assert_ne!(session.id(), old);
	/// assert!(session.is_changed());
	/// ```
	pub fn cycle_id(&mut self) {
		self.id = Uuid::new_v4().to_string();
		self.changed = true;
	}

	/// Explicitly mark the session as modified.
	pub fn touch(&mut self) {
		self.changed = true;
	}

	pub fn is_changed(&self) -> bool {
		self.changed
	}

	/// `true` until the session has been persisted once.
	pub fn is_new(&self) -> bool {
		self.is_new
	}

	pub fn data(&self) -> &HashMap<String, serde_json::Value> {
		&self.data
	}

	/// Called by stores after a successful write.
	pub fn mark_saved(&mut self) {
		self.changed = false;
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::new()
	}
}
