//! Path templates compiled into segment matchers.
//!
//! A template is `/`-separated; a segment starting with `:` declares a named
//! placeholder that captures exactly one non-empty request-path segment.
//! Matching is whole-path and exact-length: no implicit prefixes and no
//! trailing-slash normalization.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::PatternError;

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled, immutable path template such as `/save/:category/:id`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles `template`, rejecting empty and repeated placeholder names.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        for part in template.split('/') {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::empty_placeholder(template));
                }
                if !seen.insert(name.to_owned()) {
                    return Err(PatternError::duplicate_placeholder(name, template));
                }
                segments.push(Segment::Param(name.to_owned()));
            } else {
                segments.push(Segment::Literal(part.to_owned()));
            }
        }
        Ok(Self { template: template.to_owned(), segments })
    }

    /// Matches `path` against the whole template.
    ///
    /// Returns the placeholder captures on success. Literals compare
    /// case-sensitively; a placeholder consumes the maximal run of
    /// non-`/` characters and never matches an empty segment.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut parts = path.split('/');
        let mut captures = HashMap::new();
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    captures.insert(name.clone(), part.to_owned());
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(captures)
    }

    /// Whether the template declares a `:name` placeholder.
    pub fn has_param(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Param(param) if param == name))
    }

    /// Position-wise overlap check backing the registration diagnostic:
    /// two patterns overlap when some concrete path matches both.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| match (a, b) {
                (Segment::Literal(x), Segment::Literal(y)) => x == y,
                _ => true,
            })
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
