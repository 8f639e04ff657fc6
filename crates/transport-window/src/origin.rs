//! Target origins for cross-window messaging.

use std::fmt;

/// Origin a message may be delivered to, or accepted from.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum TargetOrigin {
    /// No restriction (`"*"`).
    #[default]
    Any,

    /// Only this exact origin, e.g. `https://example.com`.
    Exact(String),
}

impl TargetOrigin {
    /// The wildcard origin string.
    pub const WILDCARD: &'static str = "*";

    /// Parse an origin string; `"*"` means no restriction.
    #[must_use]
    pub fn parse(origin: &str) -> Self {
        if origin == Self::WILDCARD {
            Self::Any
        } else {
            Self::Exact(origin.to_owned())
        }
    }

    /// The string form passed to `postMessage`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => Self::WILDCARD,
            Self::Exact(origin) => origin,
        }
    }

    /// Whether a window with origin `origin` satisfies this target.
    #[must_use]
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == origin,
        }
    }
}

impl From<&str> for TargetOrigin {
    fn from(origin: &str) -> Self {
        Self::parse(origin)
    }
}

impl From<String> for TargetOrigin {
    fn from(origin: String) -> Self {
        if origin == Self::WILDCARD {
            Self::Any
        } else {
            Self::Exact(origin)
        }
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
