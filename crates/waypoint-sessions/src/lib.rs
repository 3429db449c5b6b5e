//! # Waypoint Sessions
//!
//! The session collaborator consumed by the dispatcher:
//!
//! - [`Session`]: an opaque mutable mapping keyed by an identifier
//! - [`SessionStore`]: `load` / `save` / `delete` backend trait
//! - [`InMemorySessionStore`]: a store for tests and development
//! - [`LazySession`]: request-scoped wrapper that loads at most once and saves
//!   at most once

pub mod lazy;
pub mod session;
pub mod store;

pub use lazy::{LazySession, SaveOutcome};
pub use session::{Session, SessionId};
pub use store::{InMemorySessionStore, SessionError, SessionStore};
