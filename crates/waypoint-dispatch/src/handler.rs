//! Handlers and the built-in fallbacks.

use crate::context::RequestContext;
use async_trait::async_trait;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use std::sync::Arc;
use waypoint_core::{Outcome, Response};

/// A request handler.
///
/// Route handlers and error handlers share this trait. Error handlers find the
/// fault being resolved in [`RequestContext::fault`].
#[async_trait]
pub trait Handler: Send + Sync {
	async fn call(&self, ctx: &mut RequestContext) -> Outcome;
}

/// Shared handler reference stored in the route and resolution tables.
pub type HandlerRef = Arc<dyn Handler>;

/// Adapter returned by [`handler_fn`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
	F: Fn(&mut RequestContext) -> Outcome + Send + Sync,
{
	async fn call(&self, ctx: &mut RequestContext) -> Outcome {
		(self.0)(ctx)
	}
}

/// Wrap a synchronous closure as a handler.
///
/// # Examples
///
/// ```
/// use waypoint_dispatch::handler_fn;
/// use waypoint_core::{Outcome, Response};
///
/// let hello = handler_fn(|ctx| {
///     let name = ctx.param("name").unwrap_or("world").to_string();
///     Outcome::ok(Response::ok().with_body(format!("hello {}", name)))
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerRef
where
	F: Fn(&mut RequestContext) -> Outcome + Send + Sync + 'static,
{
	Arc::new(FnHandler(f))
}

/// Default not-found handler: `404` with a plain-text body naming the path.
pub struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
	async fn call(&self, ctx: &mut RequestContext) -> Outcome {
		let body = format!("Not Found: {}", ctx.request.path);
		Outcome::ok(
			Response::not_found()
				.with_header(CONTENT_TYPE, "text/plain; charset=utf-8")
				.with_body(body),
		)
	}
}

/// Default catch-all error handler.
///
/// Uses the fault's status hint, or `500`, with the status reason as body.
pub struct DefaultErrorHandler;

#[async_trait]
impl Handler for DefaultErrorHandler {
	async fn call(&self, ctx: &mut RequestContext) -> Outcome {
		let status = ctx
			.fault()
			.and_then(|fault| fault.status())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let reason = status.canonical_reason().unwrap_or("Error");
		Outcome::ok(
			Response::new(status)
				.with_header(CONTENT_TYPE, "text/plain; charset=utf-8")
				.with_body(reason),
		)
	}
}

/// The hard-coded response used when fault resolution itself fails.
///
/// Touches nothing but a fresh response, so it cannot fail.
pub fn last_resort() -> Response {
	Response::internal_server_error().with_header(CONTENT_TYPE, "text/plain; charset=utf-8")
}
