//! Reverse URL templates.
//!
//! A [`ReverseTemplate`] is the URL-generating half of a compiled pattern. It
//! is a flat list of literal text and `%(name)s` placeholders; placeholders of
//! optional parameters expand through their own sub-template only when the
//! parameter is supplied.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
	Text(String),
	Param(String),
}

/// `%(name)s`-style template regenerating a path from a parameter map.
///
/// # Examples
///
/// ```
/// use waypoint_urls::Pattern;
///
/// let pattern = Pattern::compile("/blog/(?P<year>[0-9]{4})(?:/(?P<slug>[a-z-]+))?").unwrap();
/// let template = pattern.reverse_template().unwrap();
///
/// assert_eq!(template.to_string(), "/blog/%(year)s%(slug)s");
/// assert_eq!(template.optional_template("slug").as_deref(), Some("/%(slug)s"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReverseTemplate {
	segments: Vec<Segment>,
	optional: BTreeMap<String, Vec<Segment>>,
}

/// Why a template could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MissingParameter(pub String);

impl ReverseTemplate {
	pub(crate) fn new(segments: Vec<Segment>, optional: BTreeMap<String, Vec<Segment>>) -> Self {
		Self { segments, optional }
	}

	/// Names of parameters that must be supplied, in template order.
	pub fn required(&self) -> impl Iterator<Item = &str> {
		self.segments.iter().filter_map(|segment| match segment {
			Segment::Param(name) if !self.optional.contains_key(name) => Some(name.as_str()),
			_ => None,
		})
	}

	/// Names of parameters that may be omitted.
	pub fn optional(&self) -> impl Iterator<Item = &str> {
		self.optional.keys().map(String::as_str)
	}

	/// The sub-template an optional parameter expands to, rendered as text.
	pub fn optional_template(&self, name: &str) -> Option<String> {
		self.optional.get(name).map(|segments| write_segments(segments))
	}

	/// Substitute `lookup` into the template.
	///
	/// Returns the rendered path and the names that were consumed.
	pub(crate) fn render<'a, F>(&'a self, lookup: F) -> Result<(String, Vec<&'a str>), MissingParameter>
	where
		F: Fn(&str) -> Option<&'a str>,
	{
		let mut out = String::new();
		let mut consumed = Vec::new();
		for segment in &self.segments {
			match segment {
				Segment::Text(text) => out.push_str(text),
				Segment::Param(name) => match (self.optional.get(name), lookup(name)) {
					(Some(sub), Some(value)) => {
						for part in sub {
							match part {
								Segment::Text(text) => out.push_str(text),
								Segment::Param(_) => out.push_str(value),
							}
						}
						consumed.push(name.as_str());
					}
					(Some(_), None) => {}
					(None, Some(value)) => {
						out.push_str(value);
						consumed.push(name.as_str());
					}
					(None, None) => return Err(MissingParameter(name.clone())),
				},
			}
		}
		Ok((out, consumed))
	}
}

fn write_segments(segments: &[Segment]) -> String {
	let mut out = String::new();
	for segment in segments {
		match segment {
			Segment::Text(text) => out.push_str(&text.replace('%', "%%")),
			Segment::Param(name) => {
				out.push_str("%(");
				out.push_str(name);
				out.push_str(")s");
			}
		}
	}
	out
}

impl fmt::Display for ReverseTemplate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&write_segments(&self.segments))
	}
}
