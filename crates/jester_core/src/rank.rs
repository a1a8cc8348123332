//! The rank ladder
//!
//! Seven tiers reached by experience, plus the Founder rank held by exactly
//! one configured identity.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::EconomyError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Rank {
    #[default]
    #[serde(rename = "Motley")]
    Motley,
    #[serde(rename = "Trickster")]
    Trickster,
    #[serde(rename = "Prankmaster")]
    Prankmaster,
    #[serde(rename = "Harlequin")]
    Harlequin,
    #[serde(rename = "Jester Knight")]
    JesterKnight,
    #[serde(rename = "Fool's Regent")]
    FoolsRegent,
    #[serde(rename = "The Jester's Hand")]
    TheJestersHand,
    #[serde(rename = "Court Jester (Founder)")]
    Founder,
}

/// Experience needed for each ladder tier, in ladder order. Inclusive.
pub const EXP_THRESHOLDS: [u64; 7] = [0, 200, 600, 1200, 2000, 4000, 7000];

impl Rank {
    /// The seven attainable tiers, lowest first
    pub const LADDER: [Rank; 7] = [
        Rank::Motley,
        Rank::Trickster,
        Rank::Prankmaster,
        Rank::Harlequin,
        Rank::JesterKnight,
        Rank::FoolsRegent,
        Rank::TheJestersHand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rank::Motley => "Motley",
            Rank::Trickster => "Trickster",
            Rank::Prankmaster => "Prankmaster",
            Rank::Harlequin => "Harlequin",
            Rank::JesterKnight => "Jester Knight",
            Rank::FoolsRegent => "Fool's Regent",
            Rank::TheJestersHand => "The Jester's Hand",
            Rank::Founder => "Court Jester (Founder)",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Rank::Motley => "😜",
            Rank::Trickster => "🎩",
            Rank::Prankmaster => "🤡",
            Rank::Harlequin => "🎭",
            Rank::JesterKnight => "🗡️",
            Rank::FoolsRegent => "👑",
            Rank::TheJestersHand => "🖐️",
            Rank::Founder => "🃏",
        }
    }

    /// Position on the ladder; `None` for the Founder rank
    pub fn tier(self) -> Option<usize> {
        Self::LADDER.iter().position(|rank| *rank == self)
    }

    /// Experience at which this tier is reached
    pub fn threshold(self) -> Option<u64> {
        self.tier().map(|tier| EXP_THRESHOLDS[tier])
    }

    /// Next tier up the ladder, if any
    pub fn next(self) -> Option<Rank> {
        self.tier().and_then(|tier| Self::LADDER.get(tier + 1).copied())
    }

    pub fn is_founder(self) -> bool {
        self == Rank::Founder
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rank {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::LADDER
            .iter()
            .chain(std::iter::once(&Rank::Founder))
            .find(|rank| rank.name().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| {
                EconomyError::invalid_argument(
                    "rank",
                    format!(
                        "'{}' is not a rank; expected one of: {}",
                        wanted,
                        Self::LADDER.map(Rank::name).join(", ")
                    ),
                )
            })
    }
}

/// Rank earned by `experience`. The founder always holds the Founder rank.
pub fn rank_of(experience: u64, is_founder: bool) -> Rank {
    if is_founder {
        return Rank::Founder;
    }
    Rank::LADDER
        .iter()
        .zip(EXP_THRESHOLDS)
        .rev()
        .find(|(_, threshold)| experience >= *threshold)
        .map(|(rank, _)| *rank)
        .unwrap_or(Rank::Motley)
}
