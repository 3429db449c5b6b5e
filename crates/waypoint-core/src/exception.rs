//! Error taxonomy shared by the routing and dispatch layers.
//!
//! Two families live here:
//!
//! - Startup errors ([`ConfigurationError`], [`UrlError`]) are ordinary `Result`
//!   errors. A `ConfigurationError` aborts startup; the route table is never
//!   served in an inconsistent state.
//! - Runtime [`Fault`]s are raised by handlers and resolved by the dispatcher
//!   against its resolution table. Each fault carries a static [`FaultType`] tag
//!   whose single-inheritance chain decides which error handler applies.
//!
//! ## Declaring fault types
//!
//! ```
//! use waypoint_core::exception::{EXCEPTION, Fault, FaultType, is_subtype};
//!
//! pub static BILLING_ERROR: FaultType = FaultType::derive("BillingError", &EXCEPTION);
//! pub static CARD_DECLINED: FaultType = FaultType::derive("CardDeclined", &BILLING_ERROR);
//!
//! let fault = Fault::new(&CARD_DECLINED, "card was declined");
//! assert!(is_subtype(fault.kind(), &BILLING_ERROR));
//! assert_eq!(CARD_DECLINED.distance_to(&EXCEPTION), Some(2));
//! ```

use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Result type used by fallible handler code.
pub type Result<T> = std::result::Result<T, Fault>;

/// A node in the static fault hierarchy.
///
/// Identity is the type name, so names must be unique within a process.
#[derive(Debug)]
pub struct FaultType {
	name: &'static str,
	parent: Option<&'static FaultType>,
}

impl FaultType {
	/// Create a root type. Only [`EXCEPTION`] should normally be a root.
	pub const fn root(name: &'static str) -> Self {
		Self { name, parent: None }
	}

	/// Create a type deriving from `parent`.
	pub const fn derive(name: &'static str, parent: &'static FaultType) -> Self {
		Self {
			name,
			parent: Some(parent),
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn parent(&self) -> Option<&'static FaultType> {
		self.parent
	}

	/// Number of inheritance steps from `self` up to `declared`.
	///
	/// `Some(0)` when they are the same type, `None` when `declared` is not an
	/// ancestor-or-self of `self`.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_core::exception::{EXCEPTION, KEY_ERROR, LOOKUP_ERROR, TYPE_ERROR};
	///
	/// assert_eq!(KEY_ERROR.distance_to(&KEY_ERROR), Some(0));
	/// assert_eq!(KEY_ERROR.distance_to(&LOOKUP_ERROR), Some(1));
	/// assert_eq!(KEY_ERROR.distance_to(&EXCEPTION), Some(2));
	/// assert_eq!(KEY_ERROR.distance_to(&TYPE_ERROR), None);
	/// ```
	pub fn distance_to(&self, declared: &FaultType) -> Option<usize> {
		let mut current = Some(self);
		let mut steps = 0;
		while let Some(ty) = current {
			if ty == declared {
				return Some(steps);
			}
			current = ty.parent;
			steps += 1;
		}
		None
	}

	/// Iterate from this type up to the root, self first.
	pub fn ancestors(&self) -> impl Iterator<Item = &FaultType> {
		std::iter::successors(Some(self), |ty| ty.parent.map(|p| p as &FaultType))
	}
}

impl PartialEq for FaultType {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl Eq for FaultType {}

impl fmt::Display for FaultType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// `true` when `declared` is `actual` or one of its ancestors.
pub fn is_subtype(actual: &FaultType, declared: &FaultType) -> bool {
	actual.distance_to(declared).is_some()
}

/// Universal base of every fault.
pub static EXCEPTION: FaultType = FaultType::root("Exception");
pub static LOOKUP_ERROR: FaultType = FaultType::derive("LookupError", &EXCEPTION);
pub static KEY_ERROR: FaultType = FaultType::derive("KeyError", &LOOKUP_ERROR);
pub static TYPE_ERROR: FaultType = FaultType::derive("TypeError", &EXCEPTION);
pub static VALUE_ERROR: FaultType = FaultType::derive("ValueError", &EXCEPTION);
pub static PERMISSION_ERROR: FaultType = FaultType::derive("PermissionError", &EXCEPTION);
/// Raised by the dispatcher when no route accepts the request.
pub static NOT_FOUND: FaultType = FaultType::derive("NotFound", &EXCEPTION);
/// Raised when a session-requiring route cannot obtain its session.
pub static SESSION_ERROR: FaultType = FaultType::derive("SessionError", &EXCEPTION);

/// A runtime fault raised by a handler, the session layer or the dispatcher.
pub struct Fault {
	kind: &'static FaultType,
	message: String,
	status: Option<StatusCode>,
	source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Fault {
	pub fn new(kind: &'static FaultType, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			status: None,
			source: None,
		}
	}

	/// The fault the dispatcher synthesizes when routing finds no handler.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_core::exception::{Fault, NOT_FOUND};
	/// use http::StatusCode;
	///
	/// let fault = Fault::not_found("/missing");
	/// assert_eq!(fault.kind(), &NOT_FOUND);
	/// assert_eq!(fault.status(), Some(StatusCode::NOT_FOUND));
	/// ```
	pub fn not_found(path: &str) -> Self {
		Self::new(&NOT_FOUND, format!("no route for {}", path)).with_status(StatusCode::NOT_FOUND)
	}

	/// Wrap any error as a fault of the given type.
	pub fn from_error<E>(kind: &'static FaultType, error: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		Self {
			kind,
			message: error.to_string(),
			status: None,
			source: Some(Box::new(error)),
		}
	}

	/// Attach a status hint used by the default error handler.
	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = Some(status);
		self
	}

	pub fn kind(&self) -> &'static FaultType {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn status(&self) -> Option<StatusCode> {
		self.status
	}

	pub fn is(&self, declared: &FaultType) -> bool {
		is_subtype(self.kind, declared)
	}
}

impl fmt::Debug for Fault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Fault")
			.field("kind", &self.kind.name)
			.field("message", &self.message)
			.field("status", &self.status)
			.finish()
	}
}

impl fmt::Display for Fault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.kind.name, self.message)
	}
}

impl std::error::Error for Fault {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.source
			.as_deref()
			.map(|e| e as &(dyn std::error::Error + 'static))
	}
}

/// Fatal startup errors raised while building the route and resolution tables.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
	#[error("route name '{0}' is already registered")]
	DuplicateRouteName(String),

	#[error("pattern '{pattern}' is already registered for an overlapping method set ({methods})")]
	DuplicatePattern { pattern: String, methods: String },

	#[error("parameter '{name}' appears more than once in pattern '{pattern}'")]
	DuplicateParameter { pattern: String, name: String },

	#[error("optional group nested inside another optional group in pattern '{0}'")]
	NestedOptionalGroup(String),

	#[error("unbalanced group in pattern '{0}'")]
	UnbalancedGroup(String),

	#[error("invalid pattern '{pattern}': {message}")]
	InvalidPattern { pattern: String, message: String },

	#[error("route '{0}' declares no HTTP methods")]
	NoMethods(String),
}

/// Errors raised by reverse URL generation.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
	#[error("route '{0}' is not registered")]
	RouteNotRegistered(String),

	#[error("route '{route}' requires parameter '{name}'")]
	MissingParameter { route: String, name: String },

	#[error("generated url '{url}' is not accepted by route '{route}'")]
	ParameterMismatch { route: String, url: String },

	#[error("cannot encode query string for route '{route}': {message}")]
	QueryEncoding { route: String, message: String },
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	static APP_ERROR: FaultType = FaultType::derive("AppError", &VALUE_ERROR);

	#[rstest]
	#[case(&KEY_ERROR, &KEY_ERROR, Some(0))]
	#[case(&KEY_ERROR, &LOOKUP_ERROR, Some(1))]
	#[case(&KEY_ERROR, &EXCEPTION, Some(2))]
	#[case(&APP_ERROR, &VALUE_ERROR, Some(1))]
	#[case(&VALUE_ERROR, &APP_ERROR, None)]
	#[case(&TYPE_ERROR, &LOOKUP_ERROR, None)]
	fn test_distance_to(
		#[case] actual: &'static FaultType,
		#[case] declared: &'static FaultType,
		#[case] expected: Option<usize>,
	) {
		assert_eq!(actual.distance_to(declared), expected);
		assert_eq!(is_subtype(actual, declared), expected.is_some());
	}

	#[rstest]
	fn test_ancestors_walks_to_root() {
		let names: Vec<_> = APP_ERROR.ancestors().map(|t| t.name()).collect();
		assert_eq!(names, vec!["AppError", "ValueError", "Exception"]);
	}

	#[rstest]
	fn test_fault_display_and_source() {
		// Arrange
		let io = std::io::Error::other("disk gone");

		// Act
		let fault = Fault::from_error(&VALUE_ERROR, io);

		// Assert
		assert_eq!(fault.to_string(), "ValueError: disk gone");
		assert!(std::error::Error::source(&fault).is_some());
		assert!(fault.is(&EXCEPTION));
		assert!(!fault.is(&TYPE_ERROR));
	}
}
