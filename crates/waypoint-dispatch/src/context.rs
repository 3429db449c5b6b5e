//! Per-request state handed to handlers and the view.

use crate::handler::HandlerRef;
use std::fmt;
use std::sync::{Arc, Weak};
use waypoint_core::{Fault, Request, UrlError};
use waypoint_sessions::{LazySession, Session, SessionError};
use waypoint_urls::{ParamMap, Route, Router};

/// Everything a handler may look at or change while a request is dispatched.
///
/// Owned by the dispatching call and dropped when the response is returned.
pub struct RequestContext {
	pub request: Request,
	/// Parameters for the current candidate: route defaults, path parameters
	/// and caller-supplied values, merged.
	pub params: ParamMap,
	/// Template identifier for the view.
	pub template: Option<String>,
	/// Data mapping for the view.
	pub data: serde_json::Map<String, serde_json::Value>,
	route: Option<Weak<Route<HandlerRef>>>,
	session: LazySession,
	fault: Option<Fault>,
	router: Arc<Router<HandlerRef>>,
}

impl RequestContext {
	pub fn new(request: Request, router: Arc<Router<HandlerRef>>, session: LazySession) -> Self {
		Self {
			request,
			params: ParamMap::new(),
			template: None,
			data: serde_json::Map::new(),
			route: None,
			session,
			fault: None,
			router,
		}
	}

	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// The route currently being dispatched, if it is still alive.
	pub fn route(&self) -> Option<Arc<Route<HandlerRef>>> {
		self.route.as_ref().and_then(Weak::upgrade)
	}

	pub(crate) fn set_route(&mut self, route: &Arc<Route<HandlerRef>>) {
		self.route = Some(Arc::downgrade(route));
	}

	/// The request session, loaded from the store on first access.
	pub async fn session(&mut self) -> Result<&mut Session, SessionError> {
		self.session.get().await
	}

	/// The session slot itself, without loading it.
	pub fn session_slot(&self) -> &LazySession {
		&self.session
	}

	pub(crate) fn session_slot_mut(&mut self) -> &mut LazySession {
		&mut self.session
	}

	/// The fault being resolved, while an error handler runs.
	pub fn fault(&self) -> Option<&Fault> {
		self.fault.as_ref()
	}

	pub(crate) fn set_fault(&mut self, fault: Fault) {
		self.fault = Some(fault);
	}

	/// Select a template and merge `data` into the view mapping.
	pub fn render(
		&mut self,
		template: impl Into<String>,
		data: serde_json::Map<String, serde_json::Value>,
	) {
		self.template = Some(template.into());
		self.data.extend(data);
	}

	pub fn router(&self) -> &Router<HandlerRef> {
		&self.router
	}

	/// Reverse a route name from inside a handler or view.
	pub fn url_for(&self, name: &str, params: &ParamMap) -> Result<String, UrlError> {
		self.router.url_for(name, params)
	}

	pub fn url_for_with<V: fmt::Display>(&self, name: &str, params: &[(&str, V)]) -> Result<String, UrlError> {
		self.router.url_for_with(name, params)
	}
}

impl fmt::Debug for RequestContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestContext")
			.field("method", &self.request.method)
			.field("path", &self.request.path)
			.field("params", &self.params)
			.field("route", &self.route().map(|r| r.name().to_string()))
			.field("session", &self.session)
			.field("fault", &self.fault)
			.finish()
	}
}
