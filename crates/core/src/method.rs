//! The closed set of methods a pack can declare.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pack method. Packs declare a subset of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Describe,
    Requirements,
    Plan,
    Execute,
    Validate,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Describe,
        Method::Requirements,
        Method::Plan,
        Method::Execute,
        Method::Validate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Describe => "describe",
            Method::Requirements => "requirements",
            Method::Plan => "plan",
            Method::Execute => "execute",
            Method::Validate => "validate",
        }
    }

    /// Whether calls go through required-field gating.
    ///
    /// `describe` and `requirements` answer "what would I need to give
    /// you", so they must work with an empty context.
    pub fn is_gated(self) -> bool {
        matches!(self, Method::Plan | Method::Execute | Method::Validate)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}
