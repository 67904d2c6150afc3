use crate::consts::PLACEHOLDER_REGEX;
use crate::error::{Error, ErrorKind, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// One `/`-separated piece of a [`NamingPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Segment {
    /// Binds the path segment at the same position to this name.
    Placeholder(String),
    /// Matched by position only, never bound.
    Literal(String),
}

/// A compiled naming pattern such as `{artist}/{series}/{issue}`.
///
/// Constructed via [`FromStr`], which validates every segment eagerly so that
/// a bad pattern is reported when the root is configured rather than on every
/// scanned unit. The compiled pattern is reusable across many
/// [`extract`](Self::extract) calls.
///
/// Both `/` and `\` separate segments, and empty segments are ignored, so
/// `{artist}//{series}/` and `{artist}\{series}` are the same pattern.
///
/// ```
/// use tankobon_extract::NamingPattern;
///
/// let pattern: NamingPattern = "{artist}/{series}/{issue}".parse().unwrap();
/// let found = pattern.extract("Jane/MySeries/Issue1");
/// assert_eq!(found.artist(), Some("Jane"));
/// assert_eq!(found.series(), Some("MySeries"));
/// assert_eq!(found.issue(), Some("Issue1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern {
    source: String,
    segments: Vec<Segment>,
}

impl FromStr for NamingPattern {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut segments = Vec::new();
        for (index, raw) in split_segments(s).enumerate() {
            if let Some(captures) = PLACEHOLDER_REGEX.captures(raw) {
                let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                if name.is_empty() {
                    exn::bail!(ErrorKind::EmptyPlaceholder(index));
                }
                segments.push(Segment::Placeholder(name.to_string()));
            } else if raw.contains(['{', '}']) {
                exn::bail!(ErrorKind::MalformedSegment {
                    index,
                    segment: raw.to_string(),
                });
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }
        if segments.is_empty() {
            exn::bail!(ErrorKind::EmptyPattern);
        }
        Ok(Self {
            source: s.to_string(),
            segments,
        })
    }
}

impl fmt::Display for NamingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl NamingPattern {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in pattern order (duplicates included).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Binds each placeholder to the path segment at the same index.
    ///
    /// - A placeholder beyond the end of the path is bound to `None`.
    /// - Path segments beyond the end of the pattern are ignored.
    /// - When a name appears twice, the later bound segment wins; running
    ///   out of path never erases an earlier binding.
    /// - Literal segments never appear in the result; when one differs from
    ///   the path segment at its index, it is recorded in
    ///   [`Extraction::mismatches`] and binding carries on regardless.
    #[instrument(level = "trace", skip(self), fields(pattern = %self.source))]
    pub fn extract(&self, relative: &str) -> Extraction {
        let parts: Vec<&str> = split_segments(relative).collect();
        let mut fields = BTreeMap::new();
        let mut mismatches = Vec::new();
        for (index, segment) in self.segments.iter().enumerate() {
            let part = parts.get(index).copied();
            match segment {
                Segment::Placeholder(name) => match part {
                    Some(part) => {
                        fields.insert(name.clone(), Some(part.to_string()));
                    },
                    None => {
                        fields.entry(name.clone()).or_insert(None);
                    },
                },
                Segment::Literal(expected) => {
                    if part != Some(expected.as_str()) {
                        mismatches.push(LiteralMismatch {
                            index,
                            expected: expected.clone(),
                            found: part.map(str::to_string),
                        });
                    }
                },
            }
        }
        Extraction { fields, mismatches }
    }
}

fn split_segments(s: &str) -> impl Iterator<Item = &str> {
    s.split(['/', '\\']).filter(|segment| !segment.is_empty())
}

/// A literal pattern segment that did not match the path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LiteralMismatch {
    pub index: usize,
    pub expected: String,
    pub found: Option<String>,
}

/// Fields bound by [`NamingPattern::extract`].
///
/// Every placeholder name in the pattern is present as a key, bound to
/// `None` when the path was too short.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Extraction {
    pub fields: BTreeMap<String, Option<String>>,
    pub mismatches: Vec<LiteralMismatch>,
}

impl Extraction {
    /// Value bound to `name`, if the placeholder exists and was bound.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|value| value.as_deref())
    }

    /// The `artist` field, falling back to an `author` placeholder.
    pub fn artist(&self) -> Option<&str> {
        self.get("artist").or_else(|| self.get("author"))
    }

    pub fn series(&self) -> Option<&str> {
        self.get("series")
    }

    pub fn issue(&self) -> Option<&str> {
        self.get("issue")
    }

    pub fn is_exact(&self) -> bool {
        self.mismatches.is_empty()
    }
}
