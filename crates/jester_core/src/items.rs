//! Item catalog: masks sold in the shop and props unlocked by rank

use crate::{Doubloons, Rank};

/// A purchasable mask with a flat multiplicative reward boost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mask {
    pub name: &'static str,
    pub price: u64,
    pub boost: f64,
}

impl Mask {
    pub fn price(&self) -> Doubloons {
        Doubloons::from(self.price)
    }
}

/// Per-stat multipliers a prop applies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropEffect {
    pub doubloons: f64,
    pub experience: f64,
    pub mask: f64,
    pub drops: f64,
    pub minor_luck: bool,
}

/// A rank-gated item, granted automatically when its rank is reached.
/// Props are bound to their holder and never change hands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prop {
    pub name: &'static str,
    pub rank: Rank,
    pub effect: PropEffect,
}

pub const MASKS: [Mask; 3] = [
    Mask {
        name: "Comedy Mask",
        price: 50,
        boost: 1.1,
    },
    Mask {
        name: "Tragedy Mask",
        price: 50,
        boost: 1.2,
    },
    Mask {
        name: "Masquerade Mask",
        price: 100,
        boost: 1.3,
    },
];

pub const PROPS: [Prop; 3] = [
    Prop {
        name: "Scepter",
        rank: Rank::JesterKnight,
        effect: PropEffect {
            doubloons: 1.15,
            experience: 1.1,
            mask: 1.1,
            drops: 1.1,
            minor_luck: false,
        },
    },
    Prop {
        name: "Crown",
        rank: Rank::FoolsRegent,
        effect: PropEffect {
            doubloons: 1.2,
            experience: 1.15,
            mask: 1.05,
            drops: 1.15,
            minor_luck: false,
        },
    },
    Prop {
        name: "Royal Decree",
        rank: Rank::TheJestersHand,
        effect: PropEffect {
            doubloons: 1.3,
            experience: 1.2,
            mask: 1.1,
            drops: 1.2,
            minor_luck: true,
        },
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item {
    Mask(&'static Mask),
    Prop(&'static Prop),
}

impl Item {
    pub fn name(&self) -> &'static str {
        match self {
            Item::Mask(mask) => mask.name,
            Item::Prop(prop) => prop.name,
        }
    }

    pub fn is_tradable(&self) -> bool {
        matches!(self, Item::Mask(_))
    }
}

/// Case-insensitive catalog lookup
pub fn find_item(name: &str) -> Option<Item> {
    let wanted = name.trim();
    MASKS
        .iter()
        .find(|mask| mask.name.eq_ignore_ascii_case(wanted))
        .map(Item::Mask)
        .or_else(|| {
            PROPS
                .iter()
                .find(|prop| prop.name.eq_ignore_ascii_case(wanted))
                .map(Item::Prop)
        })
}

/// Exact-name mask lookup, used on stored item names
pub fn mask(name: &str) -> Option<&'static Mask> {
    MASKS.iter().find(|mask| mask.name == name)
}

/// Exact-name prop lookup, used on stored item names
pub fn prop(name: &str) -> Option<&'static Prop> {
    PROPS.iter().find(|prop| prop.name == name)
}

/// Every prop gated at or below `rank` on the ladder. The Founder rank sits
/// outside the ladder and unlocks nothing.
pub fn props_unlocked_by(rank: Rank) -> impl Iterator<Item = &'static Prop> {
    let reached = rank.tier();
    PROPS.iter().filter(move |prop| match (prop.rank.tier(), reached) {
        (Some(needed), Some(reached)) => needed <= reached,
        _ => false,
    })
}

pub fn catalog_names() -> Vec<&'static str> {
    MASKS
        .iter()
        .map(|mask| mask.name)
        .chain(PROPS.iter().map(|prop| prop.name))
        .collect()
}
