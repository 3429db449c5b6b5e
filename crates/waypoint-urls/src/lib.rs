//! # Waypoint URLs
//!
//! Declarative routes that both match incoming paths and generate URLs.
//!
//! - [`pattern`]: the pattern compiler (matcher plus reverse template from one source)
//! - [`route`]: [`RouteSpec`] descriptors and compiled [`Route`]s
//! - [`route_group`]: registration-time prefix scopes and `+` composition
//! - [`router`]: the ordered, named route table
//!
//! The crate is generic over the handler reference type `H`; it stores handlers
//! but never calls them.
//!
//! ## Example
//!
//! ```
//! use waypoint_urls::{Router, RouteSpec};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router
//!     .register(RouteSpec::get("/widgets/(?P<id>[0-9]+)").with_name("widget_detail"), "detail")
//!     .unwrap();
//!
//! let url = router.url_for_with("widget_detail", &[("id", 42)]).unwrap();
//! assert_eq!(url, "/widgets/42");
//!
//! let (route, params) = router.matching_routes(&Method::GET, &url).next().unwrap();
//! assert_eq!(route.name(), "widget_detail");
//! assert_eq!(params["id"], "42");
//! ```

pub mod pattern;
pub mod reverse;
pub mod route;
pub mod route_group;
pub mod router;

pub use pattern::{ParamMap, Pattern, PatternSource};
pub use reverse::ReverseTemplate;
pub use route::{Route, RouteSpec};
pub use route_group::{Node, RouteEntry, RouteGroup};
pub use router::{RouteInfo, Router};
