use crate::pattern::{ParamMap, PatternSource};
use crate::route::{Route, RouteSpec, method_list};
use crate::route_group::Node;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use waypoint_core::{ConfigurationError, UrlError};

/// Summary of one table entry, for dumps and introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
	pub name: String,
	pub methods: Vec<String>,
	pub pattern: String,
	pub specificity: usize,
	pub requires_session: bool,
}

impl fmt::Display for RouteInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{:<12} {} -> {} (specificity {}{})",
			self.methods.join(","),
			self.pattern,
			self.name,
			self.specificity,
			if self.requires_session { ", session" } else { "" }
		)
	}
}

/// The ordered, named route table.
///
/// Routes are kept in descending specificity; routes of equal specificity keep
/// their registration order. The table is built once at startup and only read
/// afterwards.
///
/// # Examples
///
/// ```
/// use waypoint_urls::{Router, RouteSpec};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.register(RouteSpec::get("/a/(?P<x>[^/]+)").with_name("any"), "any").unwrap();
/// router.register(RouteSpec::get("/a/b").with_name("exact"), "exact").unwrap();
///
/// let names: Vec<_> = router
///     .matching_routes(&Method::GET, "/a/b")
///     .map(|(route, _)| route.name())
///     .collect();
/// assert_eq!(names, vec!["exact", "any"]);
/// ```
pub struct Router<H> {
	routes: Vec<Arc<Route<H>>>,
	by_name: HashMap<String, Arc<Route<H>>>,
	prefixes: Vec<PatternSource>,
}

impl<H> Router<H> {
	pub fn new() -> Self {
		Self {
			routes: Vec::new(),
			by_name: HashMap::new(),
			prefixes: Vec::new(),
		}
	}

	/// Map a route or a group of routes into the table.
	///
	/// Groups push their prefix, map every child in order, then pop it.
	pub fn map(&mut self, node: impl Into<Node<H>>) -> Result<(), ConfigurationError> {
		match node.into() {
			Node::Route(entry) => {
				self.register(entry.spec, entry.handler)?;
				Ok(())
			}
			Node::Group(group) => {
				self.prefixes.push(group.prefix().clone());
				let result = group
					.into_children()
					.into_iter()
					.try_for_each(|child| self.map(child));
				self.prefixes.pop();
				result
			}
		}
	}

	/// Compile `spec` under the active group prefixes and insert it.
	pub fn register(&mut self, spec: RouteSpec, handler: H) -> Result<Arc<Route<H>>, ConfigurationError> {
		let spec = match self.active_prefix() {
			Some(prefix) => spec.prefixed(&prefix),
			None => spec,
		};
		let route = Route::new(spec, handler)?;
		self.insert(route)
	}

	fn active_prefix(&self) -> Option<PatternSource> {
		let mut prefixes = self.prefixes.iter();
		let first = prefixes.next()?.clone();
		Some(prefixes.fold(first, |acc, next| acc.join(next)))
	}

	fn insert(&mut self, route: Route<H>) -> Result<Arc<Route<H>>, ConfigurationError> {
		let clash = self.routes.iter().find(|existing| {
			existing.pattern().source() == route.pattern().source() && existing.methods_overlap(&route)
		});
		if clash.is_some() {
			return Err(ConfigurationError::DuplicatePattern {
				pattern: route.pattern().source().to_string(),
				methods: method_list(route.methods()),
			});
		}
		if self.by_name.contains_key(route.name()) {
			return Err(ConfigurationError::DuplicateRouteName(route.name().to_string()));
		}

		let route = Arc::new(route);
		let specificity = route.specificity();
		let position = self
			.routes
			.iter()
			.position(|existing| existing.specificity() < specificity)
			.unwrap_or(self.routes.len());
		self.routes.insert(position, Arc::clone(&route));
		self.by_name.insert(route.name().to_string(), Arc::clone(&route));

		tracing::debug!(
			route = %route.name(),
			pattern = %route.pattern(),
			specificity,
			position,
			"Route registered"
		);
		Ok(route)
	}

	/// Every route accepting `(method, path)`, most specific first.
	///
	/// Lazy: routes are only probed as the iterator is advanced.
	pub fn matching_routes<'a>(
		&'a self,
		method: &Method,
		path: &'a str,
	) -> impl Iterator<Item = (&'a Arc<Route<H>>, ParamMap)> + use<'a, H> {
		let method = method.clone();
		self.routes
			.iter()
			.filter_map(move |route| route.matches(&method, path).map(|params| (route, params)))
	}

	/// Reverse a route name to a URL.
	pub fn url_for(&self, name: &str, params: &ParamMap) -> Result<String, UrlError> {
		self.route(name)
			.ok_or_else(|| UrlError::RouteNotRegistered(name.to_string()))?
			.url_for(params)
	}

	/// [`Router::url_for`] with any displayable values.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_urls::{Router, RouteSpec};
	/// use waypoint_core::UrlError;
	///
	/// let mut router = Router::new();
	/// router.register(RouteSpec::get("/widgets/(?P<id>[0-9]+)").with_name("widget_detail"), ()).unwrap();
	///
	/// assert_eq!(router.url_for_with("widget_detail", &[("id", 42)]).unwrap(), "/widgets/42");
	/// assert_eq!(
	///     router.url_for_with("nope", &[("id", 1)]),
	///     Err(UrlError::RouteNotRegistered("nope".into()))
	/// );
	/// ```
	pub fn url_for_with<V: fmt::Display>(&self, name: &str, params: &[(&str, V)]) -> Result<String, UrlError> {
		self.route(name)
			.ok_or_else(|| UrlError::RouteNotRegistered(name.to_string()))?
			.url_for_with(params)
	}

	pub fn route(&self, name: &str) -> Option<&Arc<Route<H>>> {
		self.by_name.get(name)
	}

	/// The ordered table.
	pub fn routes(&self) -> &[Arc<Route<H>>] {
		&self.routes
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}

	pub fn describe(&self) -> Vec<RouteInfo> {
		self.routes
			.iter()
			.map(|route| RouteInfo {
				name: route.name().to_string(),
				methods: route.methods().iter().map(|m| m.as_str().to_string()).collect(),
				pattern: route.pattern().source().to_string(),
				specificity: route.specificity(),
				requires_session: route.requires_session(),
			})
			.collect()
	}

	/// Log every table entry at `info`, in table order.
	pub fn dump(&self) {
		tracing::info!(routes = self.routes.len(), "Route table");
		for (index, info) in self.describe().iter().enumerate() {
			tracing::info!(index, "{}", info);
		}
	}
}

impl<H> Default for Router<H> {
	fn default() -> Self {
		Self::new()
	}
}

impl<H> fmt::Debug for Router<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("routes", &self.routes)
			.finish()
	}
}
