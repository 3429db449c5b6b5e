//! The rendering collaborator.

use crate::context::RequestContext;
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use waypoint_core::exception::VALUE_ERROR;
use waypoint_core::{Fault, Response};

/// Turns the finalized request context into the response body and headers.
///
/// Called exactly once per request, after dispatch and fault resolution.
/// A fault raised here is answered by the last-resort response.
#[async_trait]
pub trait View: Send + Sync {
	async fn display(&self, ctx: &RequestContext, response: Response) -> Result<Response, Fault>;
}

/// A view that leaves responses alone.
///
/// When a handler selected a template but produced no body, the context data
/// is serialised as JSON in its place.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughView;

#[async_trait]
impl View for PassthroughView {
	async fn display(&self, ctx: &RequestContext, response: Response) -> Result<Response, Fault> {
		if ctx.template.is_none() || !response.body.is_empty() {
			return Ok(response);
		}
		let body = serde_json::to_vec(&ctx.data).map_err(|e| Fault::from_error(&VALUE_ERROR, e))?;
		Ok(response
			.with_header(CONTENT_TYPE, "application/json")
			.with_body(body))
	}
}
