//! The per-request state machine.
//!
//! ```text
//! ROUTING ──▶ DISPATCHING ──▶ SUCCESS ───────────────┐
//!                 │  ▲                              │
//!                 │  └── Pass (next candidate)      │
//!                 ├──▶ Stop ────────────────────────┤
//!                 ├──▶ Fault ──▶ ERROR ─────────────┤
//!                 └──▶ exhausted ──▶ NOT_FOUND ─────┤
//!                                                   ▼
//!                    RENDERING ──▶ session save ──▶ DONE
//! ```
//!
//! `ERROR` and `NOT_FOUND` both resolve through the [`ResolutionTable`]. A
//! resolution handler that passes hands over to the next applicable entry;
//! one that faults escalates to the last-resort response.

use crate::context::RequestContext;
use crate::handler::{DefaultErrorHandler, HandlerRef, NotFoundHandler, last_resort};
use crate::resolution::{ErrorSpec, ResolutionTable};
use crate::view::{PassthroughView, View};
use std::sync::Arc;
use waypoint_conf::{DispatchSettings, Settings};
use waypoint_core::exception::{NOT_FOUND, SESSION_ERROR};
use waypoint_core::{ConfigurationError, Fault, Outcome, Request, Response};
use waypoint_sessions::{LazySession, SaveOutcome, SessionStore};
use waypoint_urls::{Node, ParamMap, RouteSpec, Router};

/// Routes requests to handlers and resolves whatever they signal.
///
/// Built once by [`DispatcherBuilder`]; its tables are read-only afterwards, so
/// a single dispatcher may serve concurrent requests behind an `Arc`.
pub struct Dispatcher {
	router: Arc<Router<HandlerRef>>,
	resolution: ResolutionTable,
	view: Arc<dyn View>,
	store: Option<Arc<dyn SessionStore>>,
	settings: DispatchSettings,
}

impl Dispatcher {
	pub fn builder() -> DispatcherBuilder {
		DispatcherBuilder::new()
	}

	pub fn router(&self) -> &Arc<Router<HandlerRef>> {
		&self.router
	}

	pub fn resolution_table(&self) -> &ResolutionTable {
		&self.resolution
	}

	pub fn settings(&self) -> &DispatchSettings {
		&self.settings
	}

	/// Dispatch a request to completion.
	pub async fn handle(&self, request: Request) -> Response {
		self.handle_with(request, ParamMap::new()).await
	}

	/// Dispatch a request with caller-supplied parameters, which override both
	/// route defaults and path parameters.
	pub async fn handle_with(&self, request: Request, extra: ParamMap) -> Response {
		let mut ctx = self.context_for(request);
		let response = self.route(&mut ctx, &extra).await;
		self.finish(&mut ctx, response).await
	}

	fn context_for(&self, request: Request) -> RequestContext {
		let session = match &self.store {
			Some(store) => {
				let identity = request.cookie(&self.settings.session_cookie_name);
				LazySession::new(Arc::clone(store), identity)
			}
			None => LazySession::detached(),
		};
		RequestContext::new(request, Arc::clone(&self.router), session)
	}

	async fn route(&self, ctx: &mut RequestContext, extra: &ParamMap) -> Response {
		let method = ctx.request.method.clone();
		let path = ctx.request.path.clone();
		tracing::debug!(method = %method, path = %path, "Routing request");

		for (route, extracted) in self.router.matching_routes(&method, &path) {
			ctx.set_route(route);
			let (handler, params) =
				route.dispatch(extracted, extra.clone(), |handler, params| (HandlerRef::clone(handler), params));
			ctx.params = params;

			if route.requires_session() {
				let loaded = ctx.session_slot_mut().get().await.map(|_| ());
				if let Err(e) = loaded {
					tracing::warn!(route = %route.name(), error = %e, "Session unavailable");
					return self.resolve(ctx, Fault::from_error(&SESSION_ERROR, e)).await;
				}
			}

			let outcome = handler.call(ctx).await;
			tracing::debug!(route = %route.name(), signal = %outcome.kind(), "Handler returned");
			match outcome {
				Outcome::Success(response) | Outcome::Stop(response) => return response,
				Outcome::Pass => continue,
				Outcome::Fault(fault) => return self.resolve(ctx, fault).await,
			}
		}

		tracing::debug!(method = %method, path = %path, "No route accepted the request");
		self.resolve(ctx, Fault::not_found(&path)).await
	}

	/// Answer `fault` through the resolution table.
	async fn resolve(&self, ctx: &mut RequestContext, fault: Fault) -> Response {
		let path = ctx.request.path.clone();
		let fault_type = fault.kind();
		if fault.is(&NOT_FOUND) {
			tracing::debug!(path = %path, "Resolving not-found");
		} else {
			tracing::debug!(path = %path, fault = %fault, "Resolving fault");
		}
		ctx.set_fault(fault);

		for entry in self.resolution.candidates(fault_type, &path) {
			match entry.handler.call(ctx).await {
				Outcome::Success(response) | Outcome::Stop(response) => return response,
				Outcome::Pass => {
					tracing::debug!(
						prefix = %entry.path_prefix,
						fault_type = %entry.fault_type,
						"Error handler passed"
					);
				}
				Outcome::Fault(nested) => {
					tracing::warn!(
						prefix = %entry.path_prefix,
						fault_type = %entry.fault_type,
						fault = %nested,
						"Error handler faulted"
					);
					tracing::error!(path = %path, "Using last-resort response");
					return last_resort();
				}
			}
		}

		tracing::error!(path = %path, fault_type = %fault_type, "Fault unresolved, using last-resort response");
		last_resort()
	}

	/// Render, save the session, then freeze the response.
	async fn finish(&self, ctx: &mut RequestContext, response: Response) -> Response {
		let mut response = match self.view.display(ctx, response).await {
			Ok(response) => response,
			Err(fault) => {
				tracing::error!(fault = %fault, "View faulted, using last-resort response");
				last_resort()
			}
		};

		let slot = ctx.session_slot_mut();
		match slot.save_if_changed().await {
			Ok(SaveOutcome::Saved) => {
				if slot.needs_cookie()
					&& let Some(session) = slot.peek()
					&& let Err(e) = response.set_cookie(&self.settings.session_cookie_name, session.id())
				{
					tracing::error!(error = %e, "Could not set session cookie");
				}
			}
			Ok(_) => {}
			Err(e) => tracing::warn!(error = %e, "Session save failed"),
		}

		response.finalize();
		response
	}
}

/// Collects routes, error handlers and collaborators, then validates them all
/// at once in [`DispatcherBuilder::build`].
///
/// # Examples
///
/// ```
/// use waypoint_dispatch::{Dispatcher, handler_fn};
/// use waypoint_core::{Outcome, Request, Response};
/// use waypoint_urls::RouteSpec;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let dispatcher = Dispatcher::builder()
///     .route(
///         RouteSpec::get("/hello/(?P<name>[a-z]+)").with_name("hello"),
///         handler_fn(|ctx| {
///             let body = format!("hello {}", ctx.param("name").unwrap_or_default());
///             Outcome::ok(Response::ok().with_body(body))
///         }),
///     )
///     .build()
///     .unwrap();
///
/// let response = dispatcher.handle(Request::get("/hello/ann")).await;
/// assert_eq!(response.status, StatusCode::OK);
/// assert_eq!(response.body, "hello ann");
///
/// let missing = dispatcher.handle(Request::get("/nope")).await;
/// assert_eq!(missing.status, StatusCode::NOT_FOUND);
/// # });
/// ```
pub struct DispatcherBuilder {
	nodes: Vec<Node<HandlerRef>>,
	resolution: ResolutionTable,
	view: Option<Arc<dyn View>>,
	store: Option<Arc<dyn SessionStore>>,
	settings: DispatchSettings,
}

impl DispatcherBuilder {
	pub fn new() -> Self {
		Self {
			nodes: Vec::new(),
			resolution: ResolutionTable::new(),
			view: None,
			store: None,
			settings: DispatchSettings::default(),
		}
	}

	pub fn route(mut self, spec: RouteSpec, handler: HandlerRef) -> Self {
		self.nodes.push(Node::route(spec, handler));
		self
	}

	/// Add a route or route group.
	pub fn map(mut self, node: impl Into<Node<HandlerRef>>) -> Self {
		self.nodes.push(node.into());
		self
	}

	pub fn error_handler(mut self, spec: ErrorSpec, handler: HandlerRef) -> Self {
		self.resolution.register(&spec, handler);
		self
	}

	pub fn view(mut self, view: Arc<dyn View>) -> Self {
		self.view = Some(view);
		self
	}

	pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn settings(mut self, settings: DispatchSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Read dispatcher settings from a flat settings source.
	pub fn configure(self, settings: &dyn Settings) -> Self {
		self.settings(DispatchSettings::from_settings(settings))
	}

	/// Build the route table and the resolution table.
	///
	/// Default not-found handlers are registered for each configured prefix and
	/// a catch-all error handler is added if none was supplied. Any route
	/// conflict or malformed pattern fails the whole build.
	pub fn build(self) -> Result<Dispatcher, ConfigurationError> {
		let mut router = Router::new();
		for node in self.nodes {
			router.map(node)?;
		}

		let mut resolution = self.resolution;
		let not_found: HandlerRef = Arc::new(NotFoundHandler);
		for prefix in &self.settings.not_found_prefixes {
			resolution.add(prefix.as_str(), &NOT_FOUND, HandlerRef::clone(&not_found));
		}
		resolution.ensure_catch_all(Arc::new(DefaultErrorHandler));

		if self.settings.route_dump {
			router.dump();
		}
		tracing::info!(
			routes = router.len(),
			error_handlers = resolution.len(),
			sessions = self.store.is_some(),
			"Dispatcher built"
		);

		Ok(Dispatcher {
			router: Arc::new(router),
			resolution,
			view: self.view.unwrap_or_else(|| Arc::new(PassthroughView)),
			store: self.store,
			settings: self.settings,
		})
	}
}

impl Default for DispatcherBuilder {
	fn default() -> Self {
		Self::new()
	}
}
