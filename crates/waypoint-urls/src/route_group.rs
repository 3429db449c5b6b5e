//! Route Group functionality
//!
//! Groups are registration-time scopes: a path prefix plus an ordered list of
//! child routes and groups. [`Router::map`](crate::Router::map) flattens them
//! into the route table and discards them.
//!
//! Nodes compose with `+`. The left operand contributes its prefix (or, for a
//! route, its pattern); the right operand keeps its shape. Neither operand is
//! modified, so a pre-built sub-tree can be grafted under several prefixes.
//!
//! # Examples
//!
//! ```
//! use waypoint_urls::{ParamMap, RouteGroup, RouteSpec, Router};
//!
//! let users = RouteGroup::new("/users")
//!     .route(RouteSpec::get("/").with_name("user_list"), "list")
//!     .route(RouteSpec::get("/(?P<id>[0-9]+)").with_name("user_detail"), "detail");
//!
//! let mut router = Router::new();
//! router.map(RouteGroup::new("/api/v1") + users.clone()).unwrap();
//!
//! assert_eq!(router.url_for("user_list", &ParamMap::new()).unwrap(), "/api/v1/users");
//! assert_eq!(router.url_for_with("user_detail", &[("id", 3)]).unwrap(), "/api/v1/users/3");
//! ```

use crate::pattern::PatternSource;
use crate::route::RouteSpec;
use std::ops::Add;

/// A route declaration that has not been compiled yet.
#[derive(Debug, Clone)]
pub struct RouteEntry<H> {
	pub spec: RouteSpec,
	pub handler: H,
}

impl<H> RouteEntry<H> {
	pub fn new(spec: RouteSpec, handler: H) -> Self {
		Self { spec, handler }
	}
}

/// A prefix scope over child routes and groups.
#[derive(Debug, Clone)]
pub struct RouteGroup<H> {
	prefix: PatternSource,
	children: Vec<Node<H>>,
}

/// Either a single route or a group of them.
#[derive(Debug, Clone)]
pub enum Node<H> {
	Route(RouteEntry<H>),
	Group(RouteGroup<H>),
}

impl<H> RouteGroup<H> {
	pub fn new(prefix: impl Into<PatternSource>) -> Self {
		Self {
			prefix: prefix.into(),
			children: Vec::new(),
		}
	}

	/// Add a route to this group
	pub fn route(mut self, spec: RouteSpec, handler: H) -> Self {
		self.children.push(Node::Route(RouteEntry::new(spec, handler)));
		self
	}

	/// Nest a child node (route or group) in this group
	pub fn nest(mut self, child: impl Into<Node<H>>) -> Self {
		self.children.push(child.into());
		self
	}

	pub fn prefix(&self) -> &PatternSource {
		&self.prefix
	}

	pub fn children(&self) -> &[Node<H>] {
		&self.children
	}

	pub fn into_children(self) -> Vec<Node<H>> {
		self.children
	}
}

impl<H: Clone> Node<H> {
	/// Compose `self` with `rhs`, keeping `rhs`'s shape under `self`'s prefix.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_urls::{Node, PatternSource, RouteGroup, RouteSpec};
	///
	/// let api: Node<()> = RouteGroup::new("/api").into();
	/// let health: Node<()> = Node::route(RouteSpec::get("/health"), ());
	///
	/// let composed = api.compose(&health);
	/// assert_eq!(composed.prefix(), &PatternSource::Literal("/api/health".into()));
	/// assert_eq!(api.prefix().as_str(), "/api");
	/// ```
	pub fn compose(&self, rhs: &Node<H>) -> Node<H> {
		let prefix = self.prefix();
		match rhs {
			Node::Route(entry) => Node::Route(RouteEntry {
				spec: entry.spec.prefixed(prefix),
				handler: entry.handler.clone(),
			}),
			Node::Group(group) => Node::Group(RouteGroup {
				prefix: prefix.join(&group.prefix),
				children: group.children.clone(),
			}),
		}
	}
}

impl<H> Node<H> {
	pub fn route(spec: RouteSpec, handler: H) -> Self {
		Node::Route(RouteEntry::new(spec, handler))
	}

	/// The pattern fragment this node contributes when used as a prefix.
	pub fn prefix(&self) -> &PatternSource {
		match self {
			Node::Route(entry) => entry.spec.pattern(),
			Node::Group(group) => &group.prefix,
		}
	}
}

impl<H> From<RouteGroup<H>> for Node<H> {
	fn from(group: RouteGroup<H>) -> Self {
		Node::Group(group)
	}
}

impl<H> From<RouteEntry<H>> for Node<H> {
	fn from(entry: RouteEntry<H>) -> Self {
		Node::Route(entry)
	}
}

impl<H: Clone, R: Into<Node<H>>> Add<R> for Node<H> {
	type Output = Node<H>;

	fn add(self, rhs: R) -> Node<H> {
		self.compose(&rhs.into())
	}
}

impl<H: Clone, R: Into<Node<H>>> Add<R> for RouteGroup<H> {
	type Output = Node<H>;

	fn add(self, rhs: R) -> Node<H> {
		Node::Group(self).compose(&rhs.into())
	}
}

impl<H: Clone> Add<&Node<H>> for &Node<H> {
	type Output = Node<H>;

	fn add(self, rhs: &Node<H>) -> Node<H> {
		self.compose(rhs)
	}
}
