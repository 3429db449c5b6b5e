//! Request-scoped lazy session.
//!
//! A [`LazySession`] wraps the store and the identity the request presented.
//! Nothing touches the store until the session is first accessed; after that
//! the loaded value is reused for the rest of the request. At the end of the
//! request [`LazySession::save_if_changed`] writes it back at most once.

use crate::session::Session;
use crate::store::{SessionError, SessionStore};
use std::fmt;
use std::sync::Arc;

enum State {
	Unloaded,
	Loaded { session: Session, saved: bool },
	Unavailable(String),
}

/// Result of the end-of-request save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
	/// The session was never accessed during this request.
	NotLoaded,
	/// Accessed but unchanged, or already saved.
	Unchanged,
	Saved,
}

pub struct LazySession {
	store: Option<Arc<dyn SessionStore>>,
	identity: Option<String>,
	state: State,
}

impl LazySession {
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use waypoint_sessions::{InMemorySessionStore, LazySession};
	///
	/// #[tokio::main]
	/// async fn main() {
	///     let store = Arc::new(InMemorySessionStore::new());
	///     let mut lazy = LazySession::new(store, None);
	///     assert!(!lazy.is_loaded());
	///
	///     lazy.get().await.unwrap().set("seen", serde_json::json!(true));
	///     assert!(lazy.is_loaded());
	/// }
	/// ```
	pub fn new(store: Arc<dyn SessionStore>, identity: Option<String>) -> Self {
		Self {
			store: Some(store),
			identity,
			state: State::Unloaded,
		}
	}

	/// A session slot with no backing store; every access fails.
	pub fn detached() -> Self {
		Self {
			store: None,
			identity: None,
			state: State::Unloaded,
		}
	}

	/// Identity presented by the request (usually the session cookie).
	pub fn identity(&self) -> Option<&str> {
		self.identity.as_deref()
	}

	pub fn is_loaded(&self) -> bool {
		matches!(self.state, State::Loaded { .. })
	}

	pub fn is_unavailable(&self) -> bool {
		matches!(self.state, State::Unavailable(_))
	}

	/// Materialize the session, loading it from the store on first access.
	///
	/// A failed load is remembered: later calls return
	/// [`SessionError::Unavailable`] without retrying the store.
	pub async fn get(&mut self) -> Result<&mut Session, SessionError> {
		if let State::Unloaded = self.state {
			let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
			match store.load(self.identity.as_deref()).await {
				Ok(session) => {
					tracing::debug!(session_id = %session.id(), new = session.is_new(), "Session loaded");
					self.state = State::Loaded {
						session,
						saved: false,
					};
				}
				Err(e) => {
					tracing::warn!(error = %e, "Session load failed");
					self.state = State::Unavailable(e.to_string());
					return Err(e);
				}
			}
		}

		match &mut self.state {
			State::Loaded { session, .. } => Ok(session),
			State::Unavailable(reason) => Err(SessionError::Unavailable(reason.clone())),
			State::Unloaded => Err(SessionError::NoStore),
		}
	}

	/// The loaded session, without triggering a load.
	pub fn peek(&self) -> Option<&Session> {
		match &self.state {
			State::Loaded { session, .. } => Some(session),
			_ => None,
		}
	}

	/// Write the session back if it was loaded and changed. Runs the store at
	/// most once per request; a failed save is not retried.
	pub async fn save_if_changed(&mut self) -> Result<SaveOutcome, SessionError> {
		let State::Loaded { session, saved } = &mut self.state else {
			return Ok(SaveOutcome::NotLoaded);
		};
		if *saved || !session.is_changed() {
			return Ok(SaveOutcome::Unchanged);
		}
		*saved = true;
		let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
		store.save(session).await?;
		session.mark_saved();
		tracing::debug!(session_id = %session.id(), "Session saved");
		Ok(SaveOutcome::Saved)
	}

	/// `true` when a cookie must be issued for the loaded session: it is new, or
	/// its id no longer matches the identity the request presented.
	pub fn needs_cookie(&self) -> bool {
		match self.peek() {
			Some(session) => session.is_new() || self.identity() != Some(session.id()),
			None => false,
		}
	}
}

impl fmt::Debug for LazySession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = match &self.state {
			State::Unloaded => "unloaded",
			State::Loaded { saved: false, .. } => "loaded",
			State::Loaded { saved: true, .. } => "saved",
			State::Unavailable(_) => "unavailable",
		};
		f.debug_struct("LazySession")
			.field("identity", &self.identity)
			.field("state", &state)
			.finish()
	}
}
