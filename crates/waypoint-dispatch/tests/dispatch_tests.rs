//! End-to-end dispatch: routing, signals, fault resolution, rendering and
//! session handling through `Dispatcher::handle`.

use async_trait::async_trait;
use http::StatusCode;
use rstest::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use waypoint_conf::MapSettings;
use waypoint_core::exception::{
	EXCEPTION, KEY_ERROR, LOOKUP_ERROR, PERMISSION_ERROR, SESSION_ERROR, TYPE_ERROR, VALUE_ERROR,
};
use waypoint_core::{ConfigurationError, Fault, Outcome, Request, Response};
use waypoint_dispatch::{
	Dispatcher, ErrorSpec, Handler, HandlerRef, RequestContext, View, handler_fn,
};
use waypoint_sessions::{InMemorySessionStore, Session, SessionError, SessionStore};
use waypoint_urls::{ParamMap, RouteGroup, RouteSpec};

fn body(response: &Response) -> &str {
	std::str::from_utf8(&response.body).unwrap()
}

fn text(body: &'static str) -> HandlerRef {
	handler_fn(move |_| Outcome::ok(Response::ok().with_body(body)))
}

fn raise(fault_type: &'static waypoint_core::FaultType, message: &'static str) -> HandlerRef {
	handler_fn(move |_| Outcome::fault(Fault::new(fault_type, message)))
}

/// A handler that counts its calls and answers with a fixed body.
fn counted(calls: &Arc<AtomicUsize>, body: &'static str) -> HandlerRef {
	let calls = Arc::clone(calls);
	handler_fn(move |_| {
		calls.fetch_add(1, Ordering::SeqCst);
		Outcome::ok(Response::ok().with_body(body))
	})
}

#[derive(Default)]
struct CountingStore {
	inner: InMemorySessionStore,
	loads: AtomicUsize,
	saves: AtomicUsize,
	fail_load: bool,
	fail_save: bool,
}

#[async_trait]
impl SessionStore for CountingStore {
	async fn load(&self, identity: Option<&str>) -> Result<Session, SessionError> {
		self.loads.fetch_add(1, Ordering::SeqCst);
		if self.fail_load {
			return Err(SessionError::Backend("connection refused".into()));
		}
		self.inner.load(identity).await
	}

	async fn save(&self, session: &Session) -> Result<(), SessionError> {
		self.saves.fetch_add(1, Ordering::SeqCst);
		if self.fail_save {
			return Err(SessionError::Backend("disk full".into()));
		}
		self.inner.save(session).await
	}

	async fn delete(&self, session: &Session) -> Result<(), SessionError> {
		self.inner.delete(session).await
	}
}

/// Adds an item to the cart, then reads the cart back through a second access.
struct AddToCart;

#[async_trait]
impl Handler for AddToCart {
	async fn call(&self, ctx: &mut RequestContext) -> Outcome {
		let item = ctx.param("item").unwrap_or("nothing").to_string();
		match ctx.session().await {
			Ok(session) => {
				let mut cart: Vec<String> = session.get_as("cart").unwrap_or_default();
				cart.push(item);
				session.set("cart", json!(cart));
			}
			Err(e) => return Outcome::fault(Fault::from_error(&SESSION_ERROR, e)),
		}
		let size = match ctx.session().await {
			Ok(session) => session.get_as::<Vec<String>>("cart").map(|c| c.len()).unwrap_or(0),
			Err(e) => return Outcome::fault(Fault::from_error(&SESSION_ERROR, e)),
		};
		Outcome::ok(Response::ok().with_body(size.to_string()))
	}
}

fn session_cookie(response: &Response) -> Option<String> {
	let header = response.header("set-cookie")?;
	let pair = header.split(';').next()?;
	pair.strip_prefix("sessionid=").map(str::to_string)
}

#[fixture]
fn store() -> Arc<CountingStore> {
	Arc::new(CountingStore::default())
}

#[rstest]
#[tokio::test]
async fn test_parameterized_route_round_trip() {
	// Arrange
	let dispatcher = Dispatcher::builder()
		.route(
			RouteSpec::get("/widgets/(?P<id>[0-9]+)").with_name("widget_detail"),
			handler_fn(|ctx| {
				let id = ctx.param("id").unwrap_or_default().to_string();
				Outcome::ok(Response::ok().with_body(format!("widget {}", id)))
			}),
		)
		.build()
		.unwrap();

	// Act
	let url = dispatcher
		.router()
		.url_for_with("widget_detail", &[("id", 42)])
		.unwrap();
	let response = dispatcher.handle(Request::get(&url)).await;

	// Assert
	assert_eq!(url, "/widgets/42");
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(body(&response), "widget 42");
	assert!(response.is_finalized());
}

#[rstest]
#[tokio::test]
async fn test_pass_hands_over_to_next_candidate() {
	// Arrange
	let second = Arc::new(AtomicUsize::new(0));
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/items"), handler_fn(|_| Outcome::Pass))
		.route(RouteSpec::get("/(?P<collection>[a-z]+)"), counted(&second, "all items"))
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::get("/items")).await;

	// Assert
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(body(&response), "all items");
	assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_unknown_path_is_not_found() {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/items"), text("items"))
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/unknown")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(body(&response), "Not Found: /unknown");
}

#[rstest]
#[tokio::test]
async fn test_method_mismatch_is_not_found() {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/items"), text("items"))
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::post("/items")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_only_passing_candidates_end_in_not_found() {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/items"), handler_fn(|_| Outcome::Pass))
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/items")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(body(&response), "Not Found: /items");
}

#[rstest]
#[tokio::test]
async fn test_stop_from_error_handler_ends_with_redirect() {
	// Arrange
	let later = Arc::new(AtomicUsize::new(0));
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::post("/orders"), raise(&VALUE_ERROR, "bad quantity"))
		.error_handler(
			ErrorSpec::new().with_type(&VALUE_ERROR),
			handler_fn(|_| Outcome::stop(Response::redirect("/orders/new"))),
		)
		.error_handler(ErrorSpec::new().with_type(&VALUE_ERROR), counted(&later, "later"))
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::post("/orders")).await;

	// Assert
	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(response.header("location"), Some("/orders/new"));
	assert_eq!(later.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn test_prefix_specific_handler_wins_for_same_type() {
	// Arrange
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/admin/x"), raise(&PERMISSION_ERROR, "staff only"))
		.error_handler(ErrorSpec::new().with_type(&EXCEPTION), text("generic"))
		.error_handler(
			ErrorSpec::new().with_prefix("/admin").with_type(&PERMISSION_ERROR),
			text("admin"),
		)
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::get("/admin/x")).await;

	// Assert
	assert_eq!(body(&response), "admin");
}

#[rstest]
#[tokio::test]
async fn test_type_specificity_beats_longer_prefix() {
	// Arrange
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/api/v1/users"), raise(&KEY_ERROR, "user"))
		.error_handler(
			ErrorSpec::new().with_prefix("/api/v1").with_type(&LOOKUP_ERROR),
			text("api lookup"),
		)
		.error_handler(ErrorSpec::new().with_type(&KEY_ERROR), text("any key"))
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::get("/api/v1/users")).await;

	// Assert
	assert_eq!(body(&response), "any key");
}

#[rstest]
#[tokio::test]
async fn test_error_handler_can_read_the_fault() {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/api/items"), raise(&TYPE_ERROR, "expected integer"))
		.error_handler(
			ErrorSpec::new().with_prefix("/api").with_type(&TYPE_ERROR),
			handler_fn(|ctx| {
				let message = ctx.fault().map(|f| f.message().to_string()).unwrap_or_default();
				Outcome::ok(Response::new(StatusCode::BAD_REQUEST).with_body(message))
			}),
		)
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/api/items")).await;

	assert_eq!(response.status, StatusCode::BAD_REQUEST);
	assert_eq!(body(&response), "expected integer");
}

#[rstest]
#[tokio::test]
async fn test_error_handler_pass_continues_scan() {
	// Arrange
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/api/items"), raise(&TYPE_ERROR, "boom"))
		.error_handler(
			ErrorSpec::new().with_prefix("/api").with_type(&TYPE_ERROR),
			handler_fn(|_| Outcome::Pass),
		)
		.error_handler(ErrorSpec::new().with_type(&TYPE_ERROR), text("fallback"))
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::get("/api/items")).await;

	// Assert
	assert_eq!(body(&response), "fallback");
}

#[rstest]
#[tokio::test]
async fn test_faulting_error_handler_uses_last_resort() {
	// Arrange
	let generic = Arc::new(AtomicUsize::new(0));
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/report"), raise(&TYPE_ERROR, "boom"))
		.error_handler(ErrorSpec::new().with_type(&TYPE_ERROR), raise(&VALUE_ERROR, "worse"))
		.error_handler(ErrorSpec::new(), counted(&generic, "generic"))
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::get("/report")).await;

	// Assert
	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body(&response), "Internal Server Error");
	assert_eq!(generic.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn test_unhandled_fault_uses_default_error_handler() {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/report"), raise(&TYPE_ERROR, "boom"))
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/report")).await;

	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body(&response), "Internal Server Error");
}

struct BrokenView;

#[async_trait]
impl View for BrokenView {
	async fn display(&self, _ctx: &RequestContext, _response: Response) -> Result<Response, Fault> {
		Err(Fault::new(&VALUE_ERROR, "template missing"))
	}
}

#[rstest]
#[tokio::test]
async fn test_view_fault_uses_last_resort() {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/"), text("home"))
		.view(Arc::new(BrokenView))
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/")).await;

	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(response.is_finalized());
}

#[rstest]
#[tokio::test]
async fn test_caller_parameters_override_path_parameters() {
	// Arrange
	let dispatcher = Dispatcher::builder()
		.route(
			RouteSpec::get("/feeds/(?P<format>[a-z]+)").with_default("limit", "10"),
			handler_fn(|ctx| {
				let body = format!(
					"{} {}",
					ctx.param("format").unwrap_or_default(),
					ctx.param("limit").unwrap_or_default()
				);
				Outcome::ok(Response::ok().with_body(body))
			}),
		)
		.build()
		.unwrap();
	let mut extra = ParamMap::new();
	extra.insert("format".to_string(), "atom".to_string());

	// Act
	let plain = dispatcher.handle(Request::get("/feeds/rss")).await;
	let overridden = dispatcher.handle_with(Request::get("/feeds/rss"), extra).await;

	// Assert
	assert_eq!(body(&plain), "rss 10");
	assert_eq!(body(&overridden), "atom 10");
}

#[rstest]
#[tokio::test]
async fn test_handler_reverses_urls_through_context() {
	let dispatcher = Dispatcher::builder()
		.map(
			RouteGroup::new("/blog")
				.route(RouteSpec::get("/(?P<slug>[a-z-]+)").with_name("post"), text("post"))
				.route(
					RouteSpec::get("/latest").with_name("latest"),
					handler_fn(|ctx| match ctx.url_for_with("post", &[("slug", "hello-world")]) {
						Ok(url) => Outcome::stop(Response::redirect(&url)),
						Err(e) => Outcome::fault(Fault::from_error(&LOOKUP_ERROR, e)),
					}),
				),
		)
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/blog/latest")).await;

	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(response.header("location"), Some("/blog/hello-world"));
}

#[rstest]
#[tokio::test]
async fn test_duplicate_route_name_fails_build() {
	let result = Dispatcher::builder()
		.route(RouteSpec::get("/a").with_name("page"), text("a"))
		.route(RouteSpec::get("/b").with_name("page"), text("b"))
		.build();

	assert!(matches!(result, Err(ConfigurationError::DuplicateRouteName(name)) if name == "page"));
}

#[rstest]
#[tokio::test]
async fn test_duplicate_pattern_with_overlapping_methods_fails_build() {
	let result = Dispatcher::builder()
		.route(RouteSpec::get("/a"), text("a"))
		.route(RouteSpec::new(vec![http::Method::GET, http::Method::POST], "/a/"), text("b"))
		.build();

	assert!(matches!(result, Err(ConfigurationError::DuplicatePattern { .. })));
}

#[rstest]
#[tokio::test]
async fn test_not_found_prefixes_from_settings() {
	// Arrange
	let settings = MapSettings::new().with("dispatch.not_found_prefixes", vec!["/api"]);
	let dispatcher = Dispatcher::builder()
		.configure(&settings)
		.route(RouteSpec::get("/api/ping"), text("pong"))
		.build()
		.unwrap();

	// Act
	let api = dispatcher.handle(Request::get("/api/missing")).await;
	let other = dispatcher.handle(Request::get("/elsewhere")).await;

	// Assert
	assert_eq!(api.status, StatusCode::NOT_FOUND);
	assert_eq!(body(&api), "Not Found: /api/missing");
	assert_eq!(other.status, StatusCode::NOT_FOUND);
	assert_eq!(body(&other), "Not Found");
}

#[rstest]
#[tokio::test]
async fn test_session_loaded_once_and_cookie_set(store: Arc<CountingStore>) {
	// Arrange
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::post("/cart/(?P<item>[a-z]+)").with_session(), Arc::new(AddToCart))
		.session_store(store.clone())
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::post("/cart/apple")).await;

	// Assert
	assert_eq!(body(&response), "1");
	assert_eq!(store.loads.load(Ordering::SeqCst), 1);
	assert_eq!(store.saves.load(Ordering::SeqCst), 1);
	assert!(session_cookie(&response).is_some());
}

#[rstest]
#[tokio::test]
async fn test_session_persists_across_requests(store: Arc<CountingStore>) {
	// Arrange
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::post("/cart/(?P<item>[a-z]+)").with_session(), Arc::new(AddToCart))
		.session_store(store.clone())
		.build()
		.unwrap();
	let first = dispatcher.handle(Request::post("/cart/apple")).await;
	let id = session_cookie(&first).unwrap();

	// Act
	let second = dispatcher
		.handle(Request::post("/cart/pear").with_cookie("sessionid", &id))
		.await;

	// Assert
	assert_eq!(body(&second), "2");
	assert_eq!(second.header("set-cookie"), None);
	assert_eq!(store.inner.len().await, 1);
}

#[rstest]
#[tokio::test]
async fn test_session_untouched_route_never_loads(store: Arc<CountingStore>) {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/"), text("home"))
		.session_store(store.clone())
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/").with_cookie("sessionid", "abc")).await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(store.loads.load(Ordering::SeqCst), 0);
	assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn test_session_save_failure_is_not_fatal() {
	// Arrange
	let store = Arc::new(CountingStore {
		fail_save: true,
		..Default::default()
	});
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::post("/cart/(?P<item>[a-z]+)").with_session(), Arc::new(AddToCart))
		.session_store(store.clone())
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::post("/cart/apple")).await;

	// Assert
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(store.saves.load(Ordering::SeqCst), 1);
	assert_eq!(response.header("set-cookie"), None);
}

#[rstest]
#[tokio::test]
async fn test_session_load_failure_resolves_as_fault() {
	// Arrange
	let store = Arc::new(CountingStore {
		fail_load: true,
		..Default::default()
	});
	let handled = Arc::new(AtomicUsize::new(0));
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::post("/cart/(?P<item>[a-z]+)").with_session(), counted(&handled, "added"))
		.session_store(store.clone())
		.build()
		.unwrap();

	// Act
	let response = dispatcher.handle(Request::post("/cart/apple")).await;

	// Assert
	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(handled.load(Ordering::SeqCst), 0);
	assert_eq!(store.loads.load(Ordering::SeqCst), 1);
	assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn test_session_route_without_store_faults() {
	let dispatcher = Dispatcher::builder()
		.route(RouteSpec::get("/account").with_session(), text("account"))
		.error_handler(
			ErrorSpec::new().with_type(&SESSION_ERROR),
			handler_fn(|_| Outcome::ok(Response::new(StatusCode::SERVICE_UNAVAILABLE))),
		)
		.build()
		.unwrap();

	let response = dispatcher.handle(Request::get("/account")).await;

	assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}
