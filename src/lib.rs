//! # Waypoint
//!
//! A request-routing and dispatch engine.
//!
//! Waypoint takes an incoming `(method, path)` pair, picks a handler, and
//! resolves whatever that handler signals back: a response, a decline, an early
//! stop, or a fault. One declarative pattern per route drives both matching and
//! reverse URL generation.
//!
//! ## Core Principles
//!
//! - **Signals as values**: handlers return an [`Outcome`](prelude::Outcome)
//!   instead of unwinding
//! - **Registration up front**: routes and error handlers are declared with
//!   explicit specs and validated once, before the first request
//! - **Lazy sessions**: the session store is touched only when a handler asks
//!
//! ## Feature Flags
//!
//! ### Presets
//!
//! - `minimal` - Pattern compiler, routes, groups and the router table
//! - `full` (default) - Adds the dispatcher, sessions and settings
//!
//! ### Fine-grained Control
//!
//! - `conf` - Flat settings ([`conf`])
//! - `sessions` - Session model and stores ([`sessions`])
//! - `dispatch` - The dispatcher and resolution table ([`dispatch`])
//!
//! ## Quick Example
//!
//! ```rust
//! use waypoint::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let blog = RouteGroup::new("/blog")
//!     .route(RouteSpec::get("/").with_name("post_list"), handler_fn(|_| {
//!         Outcome::ok(Response::ok().with_body("all posts"))
//!     }))
//!     .route(RouteSpec::get("/(?P<slug>[a-z-]+)").with_name("post_detail"), handler_fn(|ctx| {
//!         let slug = ctx.param("slug").unwrap_or_default().to_string();
//!         Outcome::ok(Response::ok().with_body(slug))
//!     }));
//!
//! let dispatcher = Dispatcher::builder().map(blog).build().unwrap();
//!
//! let url = dispatcher.router().url_for_with("post_detail", &[("slug", "first-post")]).unwrap();
//! assert_eq!(url, "/blog/first-post");
//!
//! let response = dispatcher.handle(Request::get(&url)).await;
//! assert_eq!(response.status, StatusCode::OK);
//! assert_eq!(response.body, "first-post");
//! # });
//! ```

#[cfg(feature = "core")]
pub use waypoint_core as core;

#[cfg(feature = "urls")]
pub use waypoint_urls as urls;

#[cfg(feature = "conf")]
pub use waypoint_conf as conf;

#[cfg(feature = "sessions")]
pub use waypoint_sessions as sessions;

#[cfg(feature = "dispatch")]
pub use waypoint_dispatch as dispatch;

#[cfg(feature = "core")]
pub use waypoint_core::{ConfigurationError, Fault, FaultType, Outcome, Request, Response, UrlError};

#[cfg(feature = "urls")]
pub use waypoint_urls::{Node, ParamMap, PatternSource, Route, RouteGroup, RouteSpec, Router};

#[cfg(feature = "dispatch")]
pub use waypoint_dispatch::{
	Dispatcher, DispatcherBuilder, ErrorSpec, Handler, HandlerRef, RequestContext, View, handler_fn,
};

pub use http::{Method, StatusCode};

/// Commonly used types, for glob import.
pub mod prelude {
	pub use crate::{Method, StatusCode};

	// External
	pub use async_trait::async_trait;

	#[cfg(feature = "core")]
	pub use crate::{ConfigurationError, Fault, FaultType, Outcome, Request, Response, UrlError};

	#[cfg(feature = "core")]
	pub use waypoint_core::exception::{
		EXCEPTION, KEY_ERROR, LOOKUP_ERROR, NOT_FOUND, PERMISSION_ERROR, SESSION_ERROR, TYPE_ERROR,
		VALUE_ERROR,
	};

	#[cfg(feature = "urls")]
	pub use crate::{Node, ParamMap, PatternSource, Route, RouteGroup, RouteSpec, Router};

	#[cfg(feature = "conf")]
	pub use waypoint_conf::{DispatchSettings, MapSettings, Settings, SettingsExt};

	#[cfg(feature = "sessions")]
	pub use waypoint_sessions::{InMemorySessionStore, Session, SessionError, SessionStore};

	#[cfg(feature = "dispatch")]
	pub use crate::{
		Dispatcher, DispatcherBuilder, ErrorSpec, Handler, HandlerRef, RequestContext, View, handler_fn,
	};
}
