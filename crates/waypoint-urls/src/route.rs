use crate::pattern::{ParamMap, Pattern, PatternSource};
use crate::reverse::MissingParameter;
use http::Method;
use std::collections::BTreeMap;
use std::fmt;
use waypoint_core::{ConfigurationError, UrlError};

/// Registration descriptor for a route.
///
/// Everything the router needs to know about a route besides its handler.
///
/// # Examples
///
/// ```
/// use waypoint_urls::RouteSpec;
/// use http::Method;
///
/// let spec = RouteSpec::new([Method::GET, Method::POST], "/posts/(?P<id>[0-9]+)")
///     .with_name("post_detail")
///     .with_session()
///     .with_default("format", "html");
///
/// assert_eq!(spec.name(), Some("post_detail"));
/// assert!(spec.requires_session());
/// ```
#[derive(Debug, Clone)]
pub struct RouteSpec {
	methods: Vec<Method>,
	pattern: PatternSource,
	name: Option<String>,
	requires_session: bool,
	defaults: ParamMap,
}

impl RouteSpec {
	pub fn new<I>(methods: I, pattern: impl Into<PatternSource>) -> Self
	where
		I: IntoIterator<Item = Method>,
	{
		Self {
			methods: methods.into_iter().collect(),
			pattern: pattern.into(),
			name: None,
			requires_session: false,
			defaults: ParamMap::new(),
		}
	}

	pub fn get(pattern: impl Into<PatternSource>) -> Self {
		Self::new([Method::GET], pattern)
	}

	pub fn post(pattern: impl Into<PatternSource>) -> Self {
		Self::new([Method::POST], pattern)
	}

	pub fn put(pattern: impl Into<PatternSource>) -> Self {
		Self::new([Method::PUT], pattern)
	}

	pub fn delete(pattern: impl Into<PatternSource>) -> Self {
		Self::new([Method::DELETE], pattern)
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Load the request session before the handler runs.
	pub fn with_session(mut self) -> Self {
		self.requires_session = true;
		self
	}

	/// Parameter value used when neither the path nor the caller supplies one.
	pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.defaults.insert(name.into(), value.into());
		self
	}

	pub fn methods(&self) -> &[Method] {
		&self.methods
	}

	pub fn pattern(&self) -> &PatternSource {
		&self.pattern
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn requires_session(&self) -> bool {
		self.requires_session
	}

	/// Same spec, mounted under `prefix`.
	pub fn prefixed(&self, prefix: &PatternSource) -> Self {
		Self {
			pattern: prefix.join(&self.pattern),
			..self.clone()
		}
	}
}

/// A compiled route: methods, pattern, handler reference and name.
///
/// `H` is the handler reference type; the router never calls it, it only
/// hands it back through [`Route::dispatch`].
pub struct Route<H> {
	methods: Vec<Method>,
	pattern: Pattern,
	handler: H,
	name: String,
	requires_session: bool,
	defaults: ParamMap,
}

impl<H> Route<H> {
	/// Compile `spec` into a route. The pattern is used exactly as given; group
	/// prefixes are applied by the router before this point.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_urls::{Route, RouteSpec};
	/// use http::Method;
	///
	/// let route = Route::new(RouteSpec::get("/widgets/(?P<id>[0-9]+)"), "widget handler").unwrap();
	///
	/// assert_eq!(route.name(), "GET /widgets/(?P<id>[0-9]+)");
	/// let params = route.matches(&Method::GET, "/widgets/42").unwrap();
	/// assert_eq!(params["id"], "42");
	/// assert!(route.matches(&Method::POST, "/widgets/42").is_none());
	/// ```
	pub fn new(spec: RouteSpec, handler: H) -> Result<Self, ConfigurationError> {
		if spec.methods.is_empty() {
			return Err(ConfigurationError::NoMethods(spec.pattern.to_string()));
		}
		let pattern = Pattern::compile(spec.pattern)?;
		let mut methods = spec.methods;
		methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
		methods.dedup();
		let name = spec.name.unwrap_or_else(|| default_name(&methods, &pattern));

		Ok(Self {
			methods,
			pattern,
			handler,
			name,
			requires_session: spec.requires_session,
			defaults: spec.defaults,
		})
	}

	/// Match a request. Pure, so candidates can be probed freely.
	pub fn matches(&self, method: &Method, path: &str) -> Option<ParamMap> {
		if !self.methods.contains(method) {
			return None;
		}
		self.pattern.matches(path)
	}

	/// Invoke `invoke` with the handler and the merged parameters.
	///
	/// Precedence, lowest first: route defaults, `extracted` path parameters,
	/// caller-supplied `extra`.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_urls::{ParamMap, Route, RouteSpec};
	///
	/// let route = Route::new(
	///     RouteSpec::get("/feed/(?P<kind>[a-z]+)").with_default("format", "rss"),
	///     "feed",
	/// ).unwrap();
	///
	/// let extracted = route.matches(&http::Method::GET, "/feed/news").unwrap();
	/// let mut extra = ParamMap::new();
	/// extra.insert("format".into(), "atom".into());
	///
	/// let (handler, params) = route.dispatch(extracted, extra, |h, p| (*h, p));
	/// assert_eq!(handler, "feed");
	/// assert_eq!(params["kind"], "news");
	/// assert_eq!(params["format"], "atom");
	/// ```
	pub fn dispatch<R>(
		&self,
		extracted: ParamMap,
		extra: ParamMap,
		invoke: impl FnOnce(&H, ParamMap) -> R,
	) -> R {
		let mut params = self.defaults.clone();
		params.extend(extracted);
		params.extend(extra);
		invoke(&self.handler, params)
	}

	/// Generate a URL for this route.
	///
	/// Parameters not consumed by the path are appended as a query string in
	/// key order. The generated path must match back to exactly the values
	/// that built it, otherwise [`UrlError::ParameterMismatch`] is returned.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_urls::{ParamMap, Route, RouteSpec};
	///
	/// let route = Route::new(RouteSpec::get("/widgets/(?P<id>[0-9]+)"), ()).unwrap();
	///
	/// let mut params = ParamMap::new();
	/// params.insert("id".into(), "42".into());
	/// params.insert("q".into(), "a b".into());
	/// assert_eq!(route.url_for(&params).unwrap(), "/widgets/42?q=a+b");
	/// ```
	pub fn url_for(&self, params: &ParamMap) -> Result<String, UrlError> {
		let (path, consumed) = match self.pattern.reverse_template() {
			Some(template) => template
				.render(|name| params.get(name).map(String::as_str))
				.map_err(|MissingParameter(name)| UrlError::MissingParameter {
					route: self.name.clone(),
					name,
				})?,
			None => (self.pattern.source().to_string(), Vec::new()),
		};

		let supplied: ParamMap = consumed
			.iter()
			.filter_map(|name| params.get_key_value(*name))
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect();
		// '?' and '#' would end the path when the URL is parsed again.
		let splits_path = supplied.values().any(|value| value.contains(['?', '#']));
		if splits_path || self.pattern.matches(&path).as_ref() != Some(&supplied) {
			return Err(UrlError::ParameterMismatch {
				route: self.name.clone(),
				url: path,
			});
		}

		let leftovers: BTreeMap<&str, &str> = params
			.iter()
			.filter(|(key, _)| !consumed.contains(&key.as_str()))
			.map(|(key, value)| (key.as_str(), value.as_str()))
			.collect();
		if leftovers.is_empty() {
			return Ok(path);
		}

		let query = serde_urlencoded::to_string(&leftovers).map_err(|e| UrlError::QueryEncoding {
			route: self.name.clone(),
			message: e.to_string(),
		})?;
		Ok(format!("{}?{}", path, query))
	}

	/// [`Route::url_for`] with any displayable values.
	pub fn url_for_with<V: fmt::Display>(&self, params: &[(&str, V)]) -> Result<String, UrlError> {
		let params: ParamMap = params
			.iter()
			.map(|(key, value)| (key.to_string(), value.to_string()))
			.collect();
		self.url_for(&params)
	}

	pub fn specificity(&self) -> usize {
		self.pattern.specificity()
	}

	pub fn requires_session(&self) -> bool {
		self.requires_session
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn methods(&self) -> &[Method] {
		&self.methods
	}

	pub fn pattern(&self) -> &Pattern {
		&self.pattern
	}

	pub fn handler(&self) -> &H {
		&self.handler
	}

	pub fn defaults(&self) -> &ParamMap {
		&self.defaults
	}

	/// Whether both routes would answer at least one common method.
	pub fn methods_overlap<O>(&self, other: &Route<O>) -> bool {
		self.methods.iter().any(|m| other.methods.contains(m))
	}
}

impl<H> fmt::Debug for Route<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("name", &self.name)
			.field("methods", &self.methods)
			.field("pattern", &self.pattern.source())
			.field("requires_session", &self.requires_session)
			.finish()
	}
}

pub(crate) fn method_list(methods: &[Method]) -> String {
	methods
		.iter()
		.map(Method::as_str)
		.collect::<Vec<_>>()
		.join(",")
}

fn default_name(methods: &[Method], pattern: &Pattern) -> String {
	format!("{} {}", method_list(methods), pattern.source())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn params(pairs: &[(&str, &str)]) -> ParamMap {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[rstest]
	fn test_methods_are_sorted_and_deduplicated() {
		let route = Route::new(
			RouteSpec::new([Method::POST, Method::GET, Method::POST], "/x"),
			(),
		)
		.unwrap();
		assert_eq!(route.methods(), &[Method::GET, Method::POST]);
		assert_eq!(route.name(), "GET,POST /x");
	}

	#[rstest]
	fn test_no_methods_is_a_configuration_error() {
		let err = Route::new(RouteSpec::new(Vec::new(), "/x"), ()).unwrap_err();
		assert_eq!(err, ConfigurationError::NoMethods("/x".to_string()));
	}

	#[rstest]
	#[case(&[("year", "2024")], Ok("/archive/2024"))]
	#[case(&[("year", "2024"), ("month", "05")], Ok("/archive/2024/05"))]
	#[case(&[("year", "2024"), ("page", "3"), ("sort", "new")], Ok("/archive/2024?page=3&sort=new"))]
	#[case(&[("month", "05")], Err(UrlError::MissingParameter { route: "archive".into(), name: "year".into() }))]
	#[case(&[("year", "24")], Err(UrlError::ParameterMismatch { route: "archive".into(), url: "/archive/24".into() }))]
	fn test_url_for(#[case] input: &[(&str, &str)], #[case] expected: Result<&str, UrlError>) {
		// Arrange
		let route = Route::new(
			RouteSpec::get(r"/archive/(?P<year>[0-9]{4})(?:/(?P<month>[0-9]{2}))?").with_name("archive"),
			(),
		)
		.unwrap();

		// Act
		let result = route.url_for(&params(input));

		// Assert
		assert_eq!(result, expected.map(str::to_string));
	}

	#[rstest]
	#[case(&[("a", "x"), ("b", "y")], Ok("/x-y"))]
	#[case(&[("a", "x-y"), ("b", "z")], Ok("/x-y-z"))]
	#[case(&[("a", "x"), ("b", "y-z")], Err(UrlError::ParameterMismatch { route: "pair".into(), url: "/x-y-z".into() }))]
	fn test_url_for_requires_values_to_match_back(
		#[case] input: &[(&str, &str)],
		#[case] expected: Result<&str, UrlError>,
	) {
		// Arrange
		let route = Route::new(RouteSpec::get(r"/(?P<a>[a-z-]+)-(?P<b>[a-z]+)").with_name("pair"), ()).unwrap();

		// Act
		let result = route.url_for(&params(input));

		// Assert
		assert_eq!(result, expected.map(str::to_string));
	}

	#[rstest]
	#[case("a?b c#d", "/s/a?b c#d")]
	#[case("a?b", "/s/a?b")]
	#[case("top#frag", "/s/top#frag")]
	fn test_url_for_rejects_query_and_fragment_delimiters(#[case] value: &str, #[case] url: &str) {
		// Arrange
		let route = Route::new(RouteSpec::get("/s/(?P<q>[^/]+)").with_name("search"), ()).unwrap();

		// Act
		let result = route.url_for(&params(&[("q", value)]));

		// Assert
		assert_eq!(
			result,
			Err(UrlError::ParameterMismatch {
				route: "search".into(),
				url: url.into(),
			})
		);
		assert_eq!(route.url_for(&params(&[("q", "a b")])).unwrap(), "/s/a b");
	}

	#[rstest]
	fn test_literal_url_for_puts_everything_in_query() {
		let route = Route::new(RouteSpec::get("/search/"), ()).unwrap();
		let url = route.url_for_with(&[("q", "rust lang"), ("page", "2")]).unwrap();
		assert_eq!(url, "/search?page=2&q=rust+lang");
	}

	#[rstest]
	fn test_dispatch_merges_defaults_extracted_and_extra() {
		// Arrange
		let route = Route::new(
			RouteSpec::get("/p/(?P<id>[0-9]+)")
				.with_default("id", "0")
				.with_default("format", "html")
				.with_default("lang", "en"),
			"handler",
		)
		.unwrap();
		let extracted = route.matches(&Method::GET, "/p/9").unwrap();

		// Act
		let merged = route.dispatch(extracted, params(&[("lang", "fr")]), |_, p| p);

		// Assert
		assert_eq!(merged, params(&[("id", "9"), ("format", "html"), ("lang", "fr")]));
	}
}
