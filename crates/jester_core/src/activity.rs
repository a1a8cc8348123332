//! Court-wide activity feed

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

/// Entries kept before the oldest is evicted
pub const MAX_ACTIVITY: usize = 50;

/// Bounded, newest-first log of human readable events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: VecDeque<String>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push_front(entry.into());
        self.entries.truncate(MAX_ACTIVITY);
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for ActivityLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut entries = VecDeque::<String>::deserialize(deserializer)?;
        entries.truncate(MAX_ACTIVITY);
        Ok(Self { entries })
    }
}
