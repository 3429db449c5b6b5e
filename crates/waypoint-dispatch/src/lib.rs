//! # Waypoint Dispatch
//!
//! Signal-driven request dispatching.
//!
//! ## Overview
//!
//! For each request the dispatcher:
//! - tries every route matching the method and path, most specific first
//! - lets a handler accept ([`Outcome::Success`]), decline ([`Outcome::Pass`]),
//!   short-circuit ([`Outcome::Stop`]) or fail ([`Outcome::Fault`])
//! - resolves faults and not-found through a prefix and fault-type table
//! - hands the outcome to the [`View`], then saves the session if it changed
//!
//! ## Architecture
//!
//! ```text
//! Request → Router (candidates) → Handler → Outcome
//!                                    ↓          ↓
//!                               LazySession  ResolutionTable → error handler
//!                                    ↓          ↓
//!                                 save  ←──  View → Response
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use waypoint_dispatch::{Dispatcher, ErrorSpec, handler_fn};
//! use waypoint_core::exception::VALUE_ERROR;
//! use waypoint_core::{Fault, Outcome, Request, Response};
//! use waypoint_urls::RouteSpec;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let dispatcher = Dispatcher::builder()
//!     .route(
//!         RouteSpec::post("/orders").with_name("order_create"),
//!         handler_fn(|_| Outcome::fault(Fault::new(&VALUE_ERROR, "quantity must be positive"))),
//!     )
//!     .error_handler(
//!         ErrorSpec::new().with_type(&VALUE_ERROR),
//!         handler_fn(|ctx| {
//!             let message = ctx.fault().map(|f| f.message().to_string()).unwrap_or_default();
//!             Outcome::stop(Response::new(StatusCode::BAD_REQUEST).with_body(message))
//!         }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let response = dispatcher.handle(Request::post("/orders")).await;
//! assert_eq!(response.status, StatusCode::BAD_REQUEST);
//! assert_eq!(response.body, "quantity must be positive");
//! assert!(response.is_finalized());
//! # });
//! ```

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod resolution;
pub mod view;

pub use context::RequestContext;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use handler::{DefaultErrorHandler, FnHandler, Handler, HandlerRef, NotFoundHandler, handler_fn, last_resort};
pub use resolution::{ErrorSpec, ResolutionEntry, ResolutionTable};
pub use view::{PassthroughView, View};

pub use waypoint_core::{Fault, Outcome, Request, Response};
