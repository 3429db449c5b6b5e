//! Request and response value types consumed by the dispatcher.
//!
//! Routing only looks at the method and the path; query strings, headers and
//! cookies are carried along for handlers.

use bytes::Bytes;
use http::header::{COOKIE, HeaderName, HeaderValue, LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, StatusCode};
use thiserror::Error;

/// Errors raised while mutating a response.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
	/// Headers can no longer change once the response is finalized.
	#[error("response already finalized; cannot add cookie '{0}'")]
	Finalized(String),

	#[error("invalid header value for '{0}'")]
	InvalidHeader(String),
}

/// An incoming request as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub path: String,
	pub query: Option<String>,
	pub headers: HeaderMap,
}

impl Request {
	/// Create a request from a method and a path, splitting off any query string.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_core::http::Request;
	/// use http::Method;
	///
	/// let request = Request::new(Method::GET, "/search?q=rust");
	/// assert_eq!(request.path, "/search");
	/// assert_eq!(request.query.as_deref(), Some("q=rust"));
	/// ```
	pub fn new(method: Method, target: impl AsRef<str>) -> Self {
		let target = target.as_ref();
		let (path, query) = match target.split_once('?') {
			Some((path, query)) => (path.to_string(), Some(query.to_string())),
			None => (target.to_string(), None),
		};
		Self {
			method,
			path,
			query,
			headers: HeaderMap::new(),
		}
	}

	pub fn get(target: impl AsRef<str>) -> Self {
		Self::new(Method::GET, target)
	}

	pub fn post(target: impl AsRef<str>) -> Self {
		Self::new(Method::POST, target)
	}

	pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
		if let Ok(value) = HeaderValue::from_str(value) {
			self.headers.append(name, value);
		}
		self
	}

	/// Attach a cookie to the request's `Cookie` header.
	pub fn with_cookie(self, name: &str, value: &str) -> Self {
		self.with_header(COOKIE, &format!("{}={}", name, value))
	}

	/// Look up a cookie value across all `Cookie` headers.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_core::http::Request;
	///
	/// let request = Request::get("/").with_cookie("sessionid", "abc");
	/// assert_eq!(request.cookie("sessionid").as_deref(), Some("abc"));
	/// assert_eq!(request.cookie("missing"), None);
	/// ```
	pub fn cookie(&self, name: &str) -> Option<String> {
		self.headers
			.get_all(COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|header| header.split(';'))
			.filter_map(|pair| pair.trim().split_once('='))
			.find(|(key, _)| *key == name)
			.map(|(_, value)| value.to_string())
	}
}

/// The response being built for a request.
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
	finalized: bool,
}

impl Response {
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			finalized: false,
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_body("Internal Server Error")
	}

	/// A `302 Found` pointing at `location`.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_core::http::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::redirect("/login");
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(response.header("location"), Some("/login"));
	/// ```
	pub fn redirect(location: &str) -> Self {
		Self::new(StatusCode::FOUND).with_header(LOCATION, location)
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a header, silently skipping values that are not valid header text.
	pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
		if let Ok(value) = HeaderValue::from_str(value) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Append a `Set-Cookie` header.
	///
	/// Adding cookies after [`Response::finalize`] is an ordering violation and
	/// returns [`ResponseError::Finalized`].
	pub fn set_cookie(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
		if self.finalized {
			return Err(ResponseError::Finalized(name.to_string()));
		}
		let cookie = format!("{}={}; Path=/; HttpOnly", name, value);
		let value = HeaderValue::from_str(&cookie)
			.map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
		self.headers.append(SET_COOKIE, value);
		Ok(())
	}

	/// Freeze headers. Idempotent.
	pub fn finalize(&mut self) {
		self.finalized = true;
	}

	pub fn is_finalized(&self) -> bool {
		self.finalized
	}
}

impl Default for Response {
	fn default() -> Self {
		Self::ok()
	}
}
