//! Resolution table: which error handler answers a fault.
//!
//! Entries are `(path prefix, fault type, handler)` triples. For a fault raised
//! while serving a path, an entry applies when its prefix is a literal prefix of
//! the path and its fault type is the fault's type or an ancestor of it.
//! Applicable entries are tried in this order:
//!
//! 1. fewest inheritance steps from the fault's type to the entry's type;
//! 2. longest path prefix;
//! 3. registration order.

use crate::handler::HandlerRef;
use std::cmp::Reverse;
use std::fmt;
use waypoint_core::FaultType;
use waypoint_core::exception::EXCEPTION;

/// Registration descriptor for an error handler.
///
/// The handler is registered for every combination of prefix and fault type.
/// With no prefixes it covers every path; with no types it covers every fault.
///
/// # Examples
///
/// ```
/// use waypoint_dispatch::ErrorSpec;
/// use waypoint_core::exception::{PERMISSION_ERROR, TYPE_ERROR};
///
/// let spec = ErrorSpec::new()
///     .with_prefix("/admin")
///     .with_prefix("/staff")
///     .with_type(&PERMISSION_ERROR)
///     .with_type(&TYPE_ERROR);
/// assert_eq!(spec.pairs().count(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ErrorSpec {
	path_prefixes: Vec<String>,
	fault_types: Vec<&'static FaultType>,
}

impl ErrorSpec {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.path_prefixes.push(prefix.into());
		self
	}

	pub fn with_type(mut self, fault_type: &'static FaultType) -> Self {
		self.fault_types.push(fault_type);
		self
	}

	/// Every `(prefix, type)` pair this spec registers, prefixes outermost.
	pub fn pairs(&self) -> impl Iterator<Item = (&str, &'static FaultType)> + '_ {
		let prefixes: Vec<&str> = if self.path_prefixes.is_empty() {
			vec![""]
		} else {
			self.path_prefixes.iter().map(String::as_str).collect()
		};
		let types: Vec<&'static FaultType> = if self.fault_types.is_empty() {
			vec![&EXCEPTION]
		} else {
			self.fault_types.clone()
		};
		prefixes
			.into_iter()
			.flat_map(move |prefix| types.clone().into_iter().map(move |ty| (prefix, ty)))
	}
}

pub struct ResolutionEntry {
	pub path_prefix: String,
	pub fault_type: &'static FaultType,
	pub handler: HandlerRef,
}

impl fmt::Debug for ResolutionEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolutionEntry")
			.field("path_prefix", &self.path_prefix)
			.field("fault_type", &self.fault_type.name())
			.finish()
	}
}

#[derive(Debug, Default)]
pub struct ResolutionTable {
	entries: Vec<ResolutionEntry>,
}

impl ResolutionTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, spec: &ErrorSpec, handler: HandlerRef) {
		for (prefix, fault_type) in spec.pairs() {
			self.add(prefix, fault_type, HandlerRef::clone(&handler));
		}
	}

	pub fn add(&mut self, prefix: impl Into<String>, fault_type: &'static FaultType, handler: HandlerRef) {
		let path_prefix = prefix.into();
		tracing::debug!(prefix = %path_prefix, fault_type = %fault_type, "Error handler registered");
		self.entries.push(ResolutionEntry {
			path_prefix,
			fault_type,
			handler,
		});
	}

	/// Whether an `(EXCEPTION, "")` entry exists.
	pub fn has_catch_all(&self) -> bool {
		self.entries
			.iter()
			.any(|entry| entry.path_prefix.is_empty() && *entry.fault_type == EXCEPTION)
	}

	/// Append a catch-all entry unless one is already registered.
	pub fn ensure_catch_all(&mut self, handler: HandlerRef) {
		if !self.has_catch_all() {
			self.add("", &EXCEPTION, handler);
		}
	}

	/// Entries applicable to `fault_type` raised at `path`, in try order.
	pub fn candidates(&self, fault_type: &FaultType, path: &str) -> Vec<&ResolutionEntry> {
		let mut applicable: Vec<(usize, usize, &ResolutionEntry)> = self
			.entries
			.iter()
			.filter(|entry| path.starts_with(entry.path_prefix.as_str()))
			.filter_map(|entry| {
				fault_type
					.distance_to(entry.fault_type)
					.map(|distance| (distance, entry.path_prefix.len(), entry))
			})
			.collect();
		applicable.sort_by_key(|(distance, prefix_len, _)| (*distance, Reverse(*prefix_len)));
		applicable.into_iter().map(|(_, _, entry)| entry).collect()
	}

	pub fn entries(&self) -> &[ResolutionEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
