//! Field path addressing
//!
//! Paths use dot/bracket notation: `spec.template.spec.containers[0].livenessProbe`.
//! A parsed path resolves against a JSON tree without ever panicking on shape
//! mismatches - a path that does not fit the tree simply resolves to nothing.

use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{CoreError, Result};

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

/// A parsed field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// Parse a dot/bracket path string
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(CoreError::InvalidPath {
                path: path.to_string(),
                message: "path is empty".to_string(),
            });
        }

        let mut segments = Vec::new();

        for part in path.split('.') {
            let (key, rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if key.is_empty() {
                return Err(CoreError::InvalidPath {
                    path: path.to_string(),
                    message: format!("empty key segment in '{}'", part),
                });
            }
            segments.push(Segment::Key(key.to_string()));

            // Trailing [N][M]... index chains
            let mut rest = rest;
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped.find(']').ok_or_else(|| CoreError::InvalidPath {
                    path: path.to_string(),
                    message: format!("unterminated index in '{}'", part),
                })?;
                let index: usize =
                    stripped[..close]
                        .parse()
                        .map_err(|_| CoreError::InvalidPath {
                            path: path.to_string(),
                            message: format!("invalid index in '{}'", part),
                        })?;
                segments.push(Segment::Index(index));
                rest = &stripped[close + 1..];
            }

            if !rest.is_empty() {
                return Err(CoreError::InvalidPath {
                    path: path.to_string(),
                    message: format!("trailing characters after index in '{}'", part),
                });
            }
        }

        Ok(Self(segments))
    }

    /// The path segments
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Resolve this path against a JSON tree
    ///
    /// Returns `None` when any step is missing or the tree has an
    /// incompatible shape at that step.
    pub fn resolve<'a>(&self, root: &'a JsonValue) -> Option<&'a JsonValue> {
        let mut current = root;
        for segment in &self.0 {
            current = match (segment, current) {
                (Segment::Key(key), JsonValue::Object(map)) => map.get(key)?,
                (Segment::Index(i), JsonValue::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            match segment {
                Segment::Key(key) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                Segment::Index(i) => write!(f, "[{}]", i)?,
            }
            first = false;
        }
        Ok(())
    }
}

/// Render a path string for a key appended to a parent path string
pub fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}
