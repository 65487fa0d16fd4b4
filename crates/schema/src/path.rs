//! Field paths into JSON documents.
//!
//! Manifests name required context fields as `a.b`, `items[0].id`, or the
//! JSONPath-flavoured `$.a.b`; violations are reported in the same form so
//! a caller can resubmit exactly the field that was named.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// An object member.
    Key(String),
    /// An array element.
    Index(usize),
}

/// A parsed path such as `a.b[0].c`. The empty path is the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("invalid field path '{path}': {reason}")]
    Invalid { path: String, reason: &'static str },
}

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted/bracketed path. A leading `$.` is accepted and dropped.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let invalid = |reason: &'static str| PathError::Invalid {
            path: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        let body = trimmed.strip_prefix("$.").unwrap_or(trimmed);
        if body.is_empty() || body == "$" {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for (i, part) in body.split('.').enumerate() {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if key.contains(']') {
                return Err(invalid("unbalanced ']'"));
            }
            if key.is_empty() {
                // Only a path's first segment may start with an index.
                if i > 0 {
                    return Err(invalid("empty segment"));
                }
            } else {
                segments.push(Segment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let Some(inner) = rest.strip_prefix('[') else {
                    return Err(invalid("unexpected text after index"));
                };
                let Some(close) = inner.find(']') else {
                    return Err(invalid("unbalanced '['"));
                };
                let digits = &inner[..close];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("index must be a non-negative integer"));
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| invalid("index out of range"))?;
                segments.push(Segment::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Ok(Self { segments })
    }

    /// Build a path from a JSON Pointer (`/a/0/b`).
    ///
    /// All-digit tokens become indices, so an object key spelled `"0"`
    /// renders as `[0]`.
    pub fn from_pointer(pointer: &str) -> Self {
        let segments = pointer
            .split('/')
            .skip(1)
            .map(|raw| {
                let token = raw.replace("~1", "/").replace("~0", "~");
                if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(index) = token.parse::<usize>() {
                        return Segment::Index(index);
                    }
                }
                Segment::Key(token)
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// This path extended by one object key.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    /// Whether `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// This path followed by `other`.
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Walk `value` along this path.
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(value, |current, segment| match segment {
            Segment::Key(key) => current.as_object()?.get(key),
            Segment::Index(index) => current.as_array()?.get(*index),
        })
    }

    /// Present and non-null.
    pub fn is_present(&self, value: &Value) -> bool {
        matches!(self.lookup(value), Some(v) if !v.is_null())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
