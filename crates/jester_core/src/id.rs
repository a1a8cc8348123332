//! Player identifiers
//!
//! Players are keyed by the opaque identifier the chat platform hands us
//! (a Discord snowflake in practice). The engine never interprets it.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display};

/// Opaque platform identity of a player
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(CompactString);

impl PlayerId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(CompactString::new(raw.as_ref().trim()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Chat mention form, used in activity entries
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player_{}", self.0)
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for PlayerId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}
