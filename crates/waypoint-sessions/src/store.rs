//! Session store collaborator

use crate::session::{Session, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Errors raised by session backends.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error("session backend error: {0}")]
	Backend(String),

	#[error("session serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// A previous load failed; the session stays unusable for this request.
	#[error("session unavailable: {0}")]
	Unavailable(String),

	#[error("no session store configured")]
	NoStore,
}

/// Session store trait for different backends
#[async_trait]
pub trait SessionStore: Send + Sync {
	/// Load the session for `identity`.
	///
	/// An absent or unknown identity yields a fresh session with a new id.
	async fn load(&self, identity: Option<&str>) -> Result<Session, SessionError>;

	/// Persist session data
	async fn save(&self, session: &Session) -> Result<(), SessionError>;

	/// Delete session data
	async fn delete(&self, session: &Session) -> Result<(), SessionError>;
}

/// In-memory session store for testing and development
///
/// Sessions are kept as JSON records, so a load always hands out an
/// independent copy.
///
/// # Examples
///
/// ```
/// use waypoint_sessions::{InMemorySessionStore, SessionStore};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemorySessionStore::new();
///
///     let mut session = store.load(None).await.unwrap();
///     session.set("user_id", json!(1));
///     store.save(&session).await.unwrap();
///
///     let again = store.load(Some(session.id())).await.unwrap();
///     assert!(!again.is_new());
///     assert_eq!(again.get("user_id"), Some(&json!(1)));
/// }
/// ```
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
	sessions: Arc<Mutex<HashMap<SessionId, String>>>,
}

impl InMemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.sessions.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.sessions.lock().await.is_empty()
	}
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
	async fn load(&self, identity: Option<&str>) -> Result<Session, SessionError> {
		let sessions = self.sessions.lock().await;
		match identity.and_then(|id| sessions.get(id)) {
			Some(record) => Ok(serde_json::from_str(record)?),
			None => Ok(Session::new()),
		}
	}

	async fn save(&self, session: &Session) -> Result<(), SessionError> {
		let record = serde_json::to_string(session)?;
		self.sessions
			.lock()
			.await
			.insert(session.id().to_string(), record);
		Ok(())
	}

	async fn delete(&self, session: &Session) -> Result<(), SessionError> {
		self.sessions.lock().await.remove(session.id());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[tokio::test]
	async fn test_unknown_identity_yields_fresh_session() {
		// Arrange
		let store = InMemorySessionStore::new();

		// Act
		let session = store.load(Some("does-not-exist")).await.unwrap();

		// Assert
		assert!(session.is_new());
		assert_ne!(session.id(), "does-not-exist");
		assert!(store.is_empty().await);
	}

	#[rstest]
	#[tokio::test]
	async fn test_saved_session_round_trips_as_stored_copy() {
		// Arrange
		let store = InMemorySessionStore::new();
		let mut session = store.load(None).await.unwrap();
		session.set("cart", json!({"items": [1, 2], "total": 9.5}));
		session.set("user", json!("ada"));

		// Act
		store.save(&session).await.unwrap();
		session.set("user", json!("changed after save"));
		let loaded = store.load(Some(session.id())).await.unwrap();

		// Assert
		assert_eq!(loaded.id(), session.id());
		assert_eq!(loaded.get("cart"), Some(&json!({"items": [1, 2], "total": 9.5})));
		assert_eq!(loaded.get("user"), Some(&json!("ada")));
		assert!(!loaded.is_new());
		assert!(!loaded.is_changed());
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_removes_session() {
		// Arrange
		let store = InMemorySessionStore::new();
		let mut session = store.load(None).await.unwrap();
		session.set("k", json!("v"));
		store.save(&session).await.unwrap();
		assert_eq!(store.len().await, 1);

		// Act
		store.delete(&session).await.unwrap();

		// Assert
		assert!(store.is_empty().await);
		assert!(store.load(Some(session.id())).await.unwrap().is_new());
	}
}
