//! Player records as stored in the ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::items;
use crate::{Doubloons, Rank};

/// Doubloons every new player starts with
pub const STARTING_DOUBLOONS: u64 = 10;

/// Upper bound of the favor score
pub const MAX_FAVOR: u8 = 100;

/// One player's standing in the Court
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(default)]
    pub rank: Rank,

    #[serde(rename = "exp", default)]
    pub experience: u64,

    #[serde(default)]
    pub doubloons: Doubloons,

    /// Percentage points added to every multiplier, 0..=100
    #[serde(default, deserialize_with = "clamped_favor")]
    pub favor: u8,

    /// When set, the favor sweep clears `favor` once this moment has passed
    #[serde(
        rename = "favorExpires",
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub favor_expires_at: Option<DateTime<Utc>>,

    #[serde(default, with = "item_set")]
    pub items: BTreeSet<String>,

    #[serde(
        rename = "lastDaily",
        default = "never",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub last_daily: DateTime<Utc>,
}

fn never() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn clamped_favor<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    // Older bots wrote `null` for favor they failed to parse
    let raw = Option::<f64>::deserialize(deserializer)?
        .filter(|favor| favor.is_finite())
        .unwrap_or(0.0);
    Ok(raw.clamp(0.0, f64::from(MAX_FAVOR)) as u8)
}

impl PlayerRecord {
    /// A freshly joined player
    pub fn new(rank: Rank) -> Self {
        Self {
            rank,
            experience: 0,
            doubloons: Doubloons::from(STARTING_DOUBLOONS),
            favor: 0,
            favor_expires_at: None,
            items: BTreeSet::new(),
            last_daily: never(),
        }
    }

    pub fn owns(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    /// Returns `false` if the item was already owned
    pub fn grant(&mut self, item: &str) -> bool {
        self.items.insert(item.to_string())
    }

    /// Items only leave a record through trade settlement
    pub(crate) fn surrender(&mut self, item: &str) -> bool {
        self.items.remove(item)
    }

    pub fn masks(&self) -> impl Iterator<Item = &'static items::Mask> + '_ {
        self.items.iter().filter_map(|name| items::mask(name))
    }

    pub fn props(&self) -> impl Iterator<Item = &'static items::Prop> + '_ {
        self.items.iter().filter_map(|name| items::prop(name))
    }
}

/// Items persist as `{ "Comedy Mask": true }`, matching the bot's file format
mod item_set {
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeMap};
    use std::collections::{BTreeMap, BTreeSet};

    pub fn serialize<S>(items: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(items.len()))?;
        for item in items {
            map.serialize_entry(item, &true)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, bool>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(name, owned)| owned.then_some(name))
            .collect())
    }
}
