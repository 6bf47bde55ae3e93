use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Child identifier is missing, blank or padded with whitespace: {0:?}")]
pub struct InvalidChildId(pub String);

/// Identifier of a child profile. Every persisted value is scoped by one.
///
/// Only non-blank identifiers can be constructed, so holding a `ChildId` means the
/// namespace of a read or write is known.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChildId(String);

impl ChildId {
    /// Ids are opaque: a blank id, or one with surrounding whitespace, is rejected
    /// rather than rewritten.
    pub fn parse(raw: &str) -> Result<Self, InvalidChildId> {
        if raw.trim().is_empty() || raw.trim() != raw {
            return Err(InvalidChildId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ChildId {
    type Error = InvalidChildId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ChildId::parse(&value)
    }
}

impl From<ChildId> for String {
    fn from(value: ChildId) -> Self {
        value.0
    }
}

impl AsRef<str> for ChildId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
