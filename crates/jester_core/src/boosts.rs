//! Reward multipliers derived from a player's items and favor
//!
//! Boosts stack multiplicatively: every mask and prop compounds on the
//! ones before it, and favor scales the final product.

use serde::Serialize;

use crate::PlayerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Boosts {
    pub experience: f64,
    pub doubloons: f64,
    pub mask: f64,
    pub drops: f64,
    pub minor_luck: bool,
}

impl Default for Boosts {
    fn default() -> Self {
        Self {
            experience: 1.0,
            doubloons: 1.0,
            mask: 1.0,
            drops: 1.0,
            minor_luck: false,
        }
    }
}

/// `1 + favor / 100`
pub fn favor_multiplier(favor: u8) -> f64 {
    1.0 + f64::from(favor) / 100.0
}

/// Combine masks, props and favor into reward multipliers.
///
/// Items are visited in sorted order so repeated calls on the same record
/// produce bit-identical floats.
pub fn compute_boosts(record: &PlayerRecord) -> Boosts {
    let mut boosts = Boosts::default();

    for mask in record.masks() {
        boosts.mask *= mask.boost;
    }

    for prop in record.props() {
        let effect = prop.effect;
        boosts.doubloons *= effect.doubloons;
        boosts.experience *= effect.experience;
        boosts.mask *= effect.mask;
        boosts.drops *= effect.drops;
        if effect.minor_luck {
            boosts.minor_luck = true;
        }
    }

    let favor = favor_multiplier(record.favor);
    boosts.experience *= favor;
    boosts.doubloons *= favor;
    boosts.mask *= favor;
    boosts.drops *= favor;

    boosts
}
