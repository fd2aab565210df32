//! Immutable route table snapshots.
//!
//! # Responsibilities
//! - Compile route templates (`api/users/{id}`)
//! - Match a request path and method to one entry
//!
//! # Design Decisions
//! - A table is never mutated; the registry publishes a new one
//! - Literal segments match case-insensitively; leading and trailing
//!   slashes are ignored
//! - Among several matches the entry with more literal segments wins, then
//!   the one published first

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;

use crate::handlers::{BuildError, BuildResult, Handler};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A compiled route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    pub fn parse(raw: &str) -> BuildResult<Self> {
        let invalid = |reason: &str| BuildError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        for part in split_path(raw) {
            if let Some(inner) = part.strip_prefix('{') {
                let name = inner
                    .strip_suffix('}')
                    .ok_or_else(|| invalid("unclosed `{`"))?;
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(invalid("capture names must be non-empty identifiers"));
                }
                segments.push(Segment::Capture(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(invalid("captures must span a whole segment"));
            } else {
                segments.push(Segment::Literal(part.to_ascii_lowercase()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Captured `(name, value)` pairs when `path` matches.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captures = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) => {
                    if !literal.eq_ignore_ascii_case(part) {
                        return None;
                    }
                }
                Segment::Capture(name) => captures.push((name.clone(), part.to_string())),
            }
        }
        Some(captures)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Binding of a template and method to a handler.
pub struct RouteEntry {
    /// Definition file this entry was built from; `None` for synthetic routes.
    pub source: Option<PathBuf>,
    pub template: RouteTemplate,
    pub method: Method,
    pub handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("source", &self.source)
            .field("template", &self.template.as_str())
            .field("method", &self.method)
            .finish()
    }
}

/// Result of a successful table lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    pub route_values: Vec<(String, String)>,
}

/// One published set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    pub fn new(entries: Vec<Arc<RouteEntry>>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries built from `source`.
    pub fn by_source<'a>(&'a self, source: &'a std::path::Path) -> impl Iterator<Item = &'a Arc<RouteEntry>> {
        self.entries
            .iter()
            .filter(move |e| e.source.as_deref() == Some(source))
    }

    /// Best entry for `method` and `path`.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let mut best: Option<(usize, RouteMatch)> = None;
        for entry in self.entries.iter().filter(|e| e.method == *method) {
            let Some(route_values) = entry.template.matches(path) else {
                continue;
            };
            let score = entry.template.literal_count();
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((
                    score,
                    RouteMatch {
                        entry: Arc::clone(entry),
                        route_values,
                    },
                ));
            }
        }
        best.map(|(_, m)| m)
    }
}
