//! Pattern compiler.
//!
//! A route pattern is either a literal path (`/about`) or a parameterized
//! regular expression with named groups (`/posts/(?P<id>[0-9]+)`). The kind is
//! detected from the source: any named capture group makes it parameterized.
//!
//! One source yields both directions:
//!
//! - a matcher producing a name → value map from an incoming path
//! - a [`ReverseTemplate`] regenerating a path from a name → value map
//!
//! ## Supported syntax
//!
//! Outside parameters, a parameterized source may only contain text that can be
//! written back verbatim (escaped metacharacters are unescaped). Parameters are
//! `(?P<name>regex)` or `(?<name>regex)`. A parameter may be made optional by
//! suffixing it with `?`, or by wrapping it together with surrounding text in a
//! `(?:...)?` group:
//!
//! ```text
//! /archive/(?P<year>[0-9]{4})(?:/(?P<month>[0-9]{2}))?
//! ```
//!
//! Optional groups cannot nest, and parameter names cannot repeat.
//!
//! ## Trailing slashes
//!
//! Literal patterns lose one trailing slash and match the path with or without
//! it. Parameterized patterns drop a trailing `/` (or `/?`) and their matcher
//! accepts an optional trailing slash.

use crate::reverse::{ReverseTemplate, Segment};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use waypoint_core::ConfigurationError;

/// Parameters extracted from, or substituted into, a path.
pub type ParamMap = HashMap<String, String>;

/// An uncompiled pattern source, tagged with its kind.
///
/// Composition happens on sources so that prefixes are joined exactly once,
/// before compilation.
///
/// # Examples
///
/// ```
/// use waypoint_urls::PatternSource;
///
/// let api = PatternSource::detect("/api/");
/// let users = PatternSource::detect("/users");
/// assert_eq!(api.join(&users), PatternSource::Literal("/api/users".into()));
///
/// let detail = PatternSource::detect("/(?P<id>[0-9]+)");
/// assert!(api.join(&detail).is_regex());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
	Literal(String),
	Regex(String),
}

impl PatternSource {
	/// Classify `source`: parameterized iff it contains a named capture group.
	pub fn detect(source: impl Into<String>) -> Self {
		let source = source.into();
		if has_named_group(&source) {
			PatternSource::Regex(source)
		} else {
			PatternSource::Literal(source)
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			PatternSource::Literal(s) | PatternSource::Regex(s) => s,
		}
	}

	pub fn is_regex(&self) -> bool {
		matches!(self, PatternSource::Regex(_))
	}

	/// Concatenate `self` (as prefix) with `next`.
	///
	/// Two literals concatenate as strings. If either side is a regex the result
	/// is a regex and the literal side is escaped.
	pub fn join(&self, next: &PatternSource) -> PatternSource {
		match (self, next) {
			(PatternSource::Literal(a), PatternSource::Literal(b)) => {
				PatternSource::Literal(concat(a, b))
			}
			(PatternSource::Literal(a), PatternSource::Regex(b)) => {
				PatternSource::Regex(concat(&regex::escape(a), strip_anchor_start(b)))
			}
			(PatternSource::Regex(a), PatternSource::Literal(b)) => {
				PatternSource::Regex(concat(strip_anchor_end(a), &regex::escape(b)))
			}
			(PatternSource::Regex(a), PatternSource::Regex(b)) => {
				PatternSource::Regex(concat(strip_anchor_end(a), strip_anchor_start(b)))
			}
		}
	}
}

impl From<&str> for PatternSource {
	fn from(source: &str) -> Self {
		Self::detect(source)
	}
}

impl From<String> for PatternSource {
	fn from(source: String) -> Self {
		Self::detect(source)
	}
}

impl fmt::Display for PatternSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

fn concat(prefix: &str, rest: &str) -> String {
	match prefix.strip_suffix('/') {
		Some(trimmed) if rest.starts_with('/') => format!("{}{}", trimmed, rest),
		_ => format!("{}{}", prefix, rest),
	}
}

fn strip_anchor_start(source: &str) -> &str {
	source.strip_prefix('^').unwrap_or(source)
}

fn strip_anchor_end(source: &str) -> &str {
	match source.strip_suffix('$') {
		Some(stripped) if !stripped.ends_with('\\') => stripped,
		_ => source,
	}
}

fn has_named_group(source: &str) -> bool {
	source.contains("(?P<") || source.contains("(?<")
}

/// A compiled route pattern. Immutable once built.
#[derive(Debug, Clone)]
pub enum Pattern {
	Literal(String),
	Parameterized(Parameterized),
}

/// The compiled form of a parameterized pattern.
#[derive(Debug, Clone)]
pub struct Parameterized {
	source: String,
	matcher: Regex,
	template: ReverseTemplate,
	specificity: usize,
}

impl Pattern {
	/// Compile a pattern source, detecting its kind.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_urls::Pattern;
	///
	/// let literal = Pattern::compile("/about/").unwrap();
	/// assert_eq!(literal.source(), "/about");
	/// assert!(literal.matches("/about/").is_some());
	///
	/// let detail = Pattern::compile("/widgets/(?P<id>[0-9]+)").unwrap();
	/// let params = detail.matches("/widgets/42/").unwrap();
	/// assert_eq!(params["id"], "42");
	/// assert!(detail.matches("/widgets/x").is_none());
	/// ```
	pub fn compile(source: impl Into<PatternSource>) -> Result<Self, ConfigurationError> {
		match source.into() {
			PatternSource::Literal(literal) => Ok(Pattern::Literal(normalize_literal(&literal))),
			PatternSource::Regex(source) => compile_parameterized(&source).map(Pattern::Parameterized),
		}
	}

	/// The normalized source. Two patterns are the same route pattern iff their
	/// sources are equal.
	pub fn source(&self) -> &str {
		match self {
			Pattern::Literal(literal) => literal,
			Pattern::Parameterized(p) => &p.source,
		}
	}

	pub fn is_literal(&self) -> bool {
		matches!(self, Pattern::Literal(_))
	}

	/// Match `path`, returning the extracted parameters.
	///
	/// Optional parameters that did not participate in the match are absent
	/// from the map.
	pub fn matches(&self, path: &str) -> Option<ParamMap> {
		match self {
			Pattern::Literal(literal) => {
				let exact = path == literal;
				let with_slash = literal != "/" && path.strip_suffix('/') == Some(literal.as_str());
				(exact || with_slash).then(ParamMap::new)
			}
			Pattern::Parameterized(p) => {
				let captures = p.matcher.captures(path)?;
				let params = p
					.matcher
					.capture_names()
					.flatten()
					.filter_map(|name| {
						captures
							.name(name)
							.map(|m| (name.to_string(), m.as_str().to_string()))
					})
					.collect();
				Some(params)
			}
		}
	}

	pub fn reverse_template(&self) -> Option<&ReverseTemplate> {
		match self {
			Pattern::Literal(_) => None,
			Pattern::Parameterized(p) => Some(&p.template),
		}
	}

	pub fn required_params(&self) -> Vec<&str> {
		self.reverse_template()
			.map(|t| t.required().collect())
			.unwrap_or_default()
	}

	pub fn optional_params(&self) -> Vec<&str> {
		self.reverse_template()
			.map(|t| t.optional().collect())
			.unwrap_or_default()
	}

	/// Number of literal path segments once parameter groups are stripped.
	///
	/// # Examples
	///
	/// ```
	/// use waypoint_urls::Pattern;
	///
	/// assert_eq!(Pattern::compile("/a/b").unwrap().specificity(), 2);
	/// assert_eq!(Pattern::compile("/a/(?P<x>[^/]+)").unwrap().specificity(), 1);
	/// assert_eq!(Pattern::compile("/").unwrap().specificity(), 0);
	/// ```
	pub fn specificity(&self) -> usize {
		match self {
			Pattern::Literal(literal) => count_segments(literal),
			Pattern::Parameterized(p) => p.specificity,
		}
	}
}

impl fmt::Display for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.source())
	}
}

fn count_segments(text: &str) -> usize {
	text.split('/').filter(|segment| !segment.is_empty()).count()
}

fn normalize_literal(source: &str) -> String {
	if source.is_empty() {
		return "/".to_string();
	}
	match source.strip_suffix('/') {
		Some(stripped) if !stripped.is_empty() => stripped.to_string(),
		_ => source.to_string(),
	}
}

fn normalize_regex(source: &str) -> String {
	let source = strip_anchor_end(strip_anchor_start(source));
	let source = source.strip_suffix('?').filter(|s| s.ends_with('/')).unwrap_or(source);
	strip_trailing_slash(source).to_string()
}

/// Drop a final `/` or `\/`, leaving an escaped backslash (`\\/`) alone.
fn strip_trailing_slash(source: &str) -> &str {
	let Some(body) = source.strip_suffix('/') else {
		return source;
	};
	let backslashes = body.len() - body.trim_end_matches('\\').len();
	let body = if backslashes % 2 == 1 { &body[..body.len() - 1] } else { body };
	if body.is_empty() { source } else { body }
}

fn compile_parameterized(raw: &str) -> Result<Parameterized, ConfigurationError> {
	let source = normalize_regex(raw);
	let items = Parser::new(&source).parse()?;

	let mut seen = HashSet::new();
	for item in &items {
		let name = match item {
			Item::Param(name) | Item::Optional(name, _) => name,
			Item::Text(_) => continue,
		};
		if !seen.insert(name.as_str()) {
			return Err(ConfigurationError::DuplicateParameter {
				pattern: source.clone(),
				name: name.clone(),
			});
		}
	}

	let mut literal_text = String::new();
	let mut segments = Vec::new();
	let mut optional = BTreeMap::new();
	for item in items {
		match item {
			Item::Text(text) => {
				literal_text.push_str(&text);
				segments.push(Segment::Text(text));
			}
			Item::Param(name) => segments.push(Segment::Param(name)),
			Item::Optional(name, sub) => {
				segments.push(Segment::Param(name.clone()));
				optional.insert(name, sub);
			}
		}
	}

	let matcher = Regex::new(&format!("^{}/?$", source)).map_err(|e| {
		ConfigurationError::InvalidPattern {
			pattern: source.clone(),
			message: e.to_string(),
		}
	})?;

	Ok(Parameterized {
		specificity: count_segments(&literal_text),
		template: ReverseTemplate::new(segments, optional),
		matcher,
		source,
	})
}

#[derive(Debug)]
enum Item {
	Text(String),
	Param(String),
	Optional(String, Vec<Segment>),
}

struct Parser<'s> {
	source: &'s str,
	chars: Vec<char>,
	pos: usize,
}

impl<'s> Parser<'s> {
	fn new(source: &'s str) -> Self {
		Self {
			source,
			chars: source.chars().collect(),
			pos: 0,
		}
	}

	fn parse(mut self) -> Result<Vec<Item>, ConfigurationError> {
		self.sequence(false)
	}

	fn invalid(&self, message: impl Into<String>) -> ConfigurationError {
		ConfigurationError::InvalidPattern {
			pattern: self.source.to_string(),
			message: message.into(),
		}
	}

	fn unbalanced(&self) -> ConfigurationError {
		ConfigurationError::UnbalancedGroup(self.source.to_string())
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += 1;
		Some(c)
	}

	fn eat(&mut self, c: char) -> bool {
		if self.peek() == Some(c) {
			self.pos += 1;
			true
		} else {
			false
		}
	}

	fn looking_at(&self, prefix: &str) -> bool {
		prefix
			.chars()
			.enumerate()
			.all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
	}

	fn sequence(&mut self, in_group: bool) -> Result<Vec<Item>, ConfigurationError> {
		let mut items = Vec::new();
		while let Some(c) = self.peek() {
			match c {
				'\\' => {
					self.pos += 1;
					let escaped = self
						.bump()
						.ok_or_else(|| self.invalid("trailing backslash"))?;
					if escaped.is_ascii_alphanumeric() {
						return Err(self.invalid(format!(
							"'\\{}' outside a parameter cannot be reversed",
							escaped
						)));
					}
					push_text(&mut items, escaped);
				}
				'(' => {
					let group = self.group()?;
					items.extend(group);
				}
				')' => {
					if !in_group {
						return Err(self.unbalanced());
					}
					self.pos += 1;
					return Ok(items);
				}
				'[' | ']' | '*' | '+' | '?' | '|' | '{' | '}' | '^' | '$' => {
					return Err(self.invalid(format!(
						"'{}' outside a parameter cannot be reversed",
						c
					)));
				}
				other => {
					self.pos += 1;
					push_text(&mut items, other);
				}
			}
		}
		if in_group {
			Err(self.unbalanced())
		} else {
			Ok(items)
		}
	}

	fn group(&mut self) -> Result<Vec<Item>, ConfigurationError> {
		if self.looking_at("(?P<") || self.looking_at("(?<") {
			self.pos += if self.looking_at("(?P<") { 4 } else { 3 };
			let name = self.group_name()?;
			self.skip_group_body()?;
			if self.eat('?') {
				let sub = vec![Segment::Param(name.clone())];
				return Ok(vec![Item::Optional(name, sub)]);
			}
			return Ok(vec![Item::Param(name)]);
		}

		if self.looking_at("(?:") {
			self.pos += 3;
			let inner = self.sequence(true)?;
			if !self.eat('?') {
				return Ok(inner);
			}
			if inner.iter().any(|item| matches!(item, Item::Optional(..))) {
				return Err(ConfigurationError::NestedOptionalGroup(
					self.source.to_string(),
				));
			}
			let params: Vec<String> = inner
				.iter()
				.filter_map(|item| match item {
					Item::Param(name) => Some(name.clone()),
					_ => None,
				})
				.collect();
			return match params.as_slice() {
				[] => Ok(Vec::new()),
				[name] => {
					let name = name.clone();
					let sub = inner
						.into_iter()
						.map(|item| match item {
							Item::Text(text) => Segment::Text(text),
							Item::Param(name) | Item::Optional(name, _) => Segment::Param(name),
						})
						.collect();
					Ok(vec![Item::Optional(name, sub)])
				}
				_ => Err(self.invalid("an optional group may hold only one parameter")),
			};
		}

		Err(self.invalid(
			"only named groups (?P<name>...) and (?:...) groups are supported",
		))
	}

	fn group_name(&mut self) -> Result<String, ConfigurationError> {
		let mut name = String::new();
		loop {
			match self.bump() {
				Some('>') => break,
				Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
				Some(c) => {
					return Err(self.invalid(format!("invalid character '{}' in group name", c)));
				}
				None => return Err(self.unbalanced()),
			}
		}
		if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
			return Err(self.invalid(format!("invalid group name '{}'", name)));
		}
		Ok(name)
	}

	/// Consume a parameter's regex body up to and including its closing `)`.
	fn skip_group_body(&mut self) -> Result<(), ConfigurationError> {
		let mut depth = 1usize;
		while let Some(c) = self.bump() {
			match c {
				'\\' => {
					self.bump();
				}
				'[' => self.skip_class()?,
				'(' => {
					let lookbehind = self.looking_at("?<=") || self.looking_at("?<!");
					if self.looking_at("?P<") || (self.looking_at("?<") && !lookbehind) {
						return Err(self.invalid("named groups cannot nest"));
					}
					depth += 1;
				}
				')' => {
					depth -= 1;
					if depth == 0 {
						return Ok(());
					}
				}
				_ => {}
			}
		}
		Err(self.unbalanced())
	}

	fn skip_class(&mut self) -> Result<(), ConfigurationError> {
		self.eat('^');
		// A leading ']' is literal.
		self.eat(']');
		while let Some(c) = self.bump() {
			match c {
				'\\' => {
					self.bump();
				}
				']' => return Ok(()),
				_ => {}
			}
		}
		Err(self.unbalanced())
	}
}

fn push_text(items: &mut Vec<Item>, c: char) {
	if let Some(Item::Text(text)) = items.last_mut() {
		text.push(c);
	} else {
		items.push(Item::Text(c.to_string()));
	}
}
