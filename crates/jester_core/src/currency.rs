//! Doubloons, the Court's currency
//!
//! Balances grow without bound, so they are arbitrary-precision unsigned
//! integers. On disk they are decimal strings; plain JSON numbers are
//! accepted on read for ledgers written by older bots.

use num_bigint::BigUint;
use num_traits::{Float, FromPrimitive, ToPrimitive, Zero};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::EconomyError;

#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Doubloons(BigUint);

impl Doubloons {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The balance as a `u64`, or `None` when it does not fit
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    /// `self - other`, or `None` when that would go below zero
    pub fn checked_sub(&self, other: &Doubloons) -> Option<Doubloons> {
        if self.0 < other.0 {
            None
        } else {
            Some(Self(&self.0 - &other.0))
        }
    }

    /// `floor(self * factor)`.
    ///
    /// Balances a double can hold exactly are multiplied as doubles, so the
    /// result matches the float rewards players have always seen. Larger
    /// balances use the exact binary value of `factor` and never pass
    /// through a float. Non-finite or negative factors scale to zero.
    pub fn scale(&self, factor: f64) -> Doubloons {
        if !factor.is_finite() || factor <= 0.0 {
            return Self::zero();
        }
        if let Some(amount) = self.0.to_u64().filter(|v| *v <= MAX_EXACT_FLOAT) {
            let product = (amount as f64 * factor).floor();
            if let Some(scaled) = BigUint::from_f64(product) {
                return Self(scaled);
            }
        }
        let (mantissa, exponent, _) = factor.integer_decode();
        let product = &self.0 * BigUint::from(mantissa);
        if exponent >= 0 {
            Self(product << exponent as usize)
        } else {
            Self(product >> (-exponent) as usize)
        }
    }
}

/// Every whole number up to this one is exactly representable as a double
const MAX_EXACT_FLOAT: u64 = 1 << 53;

impl From<u64> for Doubloons {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Doubloons {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for Doubloons {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        BigUint::from_str(trimmed).map(Self).map_err(|_| {
            EconomyError::invalid_argument(
                "doubloons",
                format!("'{}' is not a non-negative whole number of doubloons", trimmed),
            )
        })
    }
}

impl Add<&Doubloons> for &Doubloons {
    type Output = Doubloons;

    fn add(self, rhs: &Doubloons) -> Doubloons {
        Doubloons(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Doubloons> for Doubloons {
    fn add_assign(&mut self, rhs: &Doubloons) {
        self.0 += &rhs.0;
    }
}

impl Display for Doubloons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Doubloons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.0)
    }
}

impl Serialize for Doubloons {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Doubloons {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DoubloonInput {
            String(String),
            Number(u64),
        }

        match DoubloonInput::deserialize(deserializer)? {
            DoubloonInput::String(raw) => BigUint::from_str(raw.trim())
                .map(Self)
                .map_err(D::Error::custom),
            DoubloonInput::Number(value) => Ok(Self::from(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scale_floors_like_float_math_for_small_values() {
        let amount = Doubloons::from(20u64);
        assert_eq!(amount.scale(1.0), Doubloons::from(20u64));
        assert_eq!(amount.scale(1.5), Doubloons::from(30u64));
        // 1.15 is stored just below itself, yet the double product rounds up to 23
        assert_eq!(amount.scale(1.15), Doubloons::from(23u64));
        assert_eq!(Doubloons::from(50u64).scale(1.1), Doubloons::from(55u64));
    }

    #[test]
    fn test_scale_matches_float_rewards_for_every_mask_multiplier() {
        for factor in [1.1, 1.15, 1.25, 1.5, 1.65, 2.0] {
            for amount in [10u64, 20, 25, 50, 75, 100, 123, 9_007_199_254_740_992] {
                let expected = (amount as f64 * factor).floor();
                assert_eq!(
                    Doubloons::from(amount).scale(factor),
                    Doubloons::from(BigUint::from_f64(expected).unwrap()),
                    "{} * {}",
                    amount,
                    factor
                );
            }
        }
    }

    #[test]
    fn test_scale_keeps_precision_beyond_53_bits() {
        let huge: Doubloons = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(huge.scale(2.0).to_string(), "246913578024691357802469135780");
        assert_eq!(huge.scale(0.5).to_string(), "61728394506172839450617283945");
        assert_eq!(huge.scale(f64::NAN), Doubloons::zero());
        assert_eq!(huge.scale(-1.0), Doubloons::zero());
    }

    #[test]
    fn test_checked_sub_refuses_to_go_negative() {
        let ten = Doubloons::from(10u64);
        assert_eq!(ten.checked_sub(&Doubloons::from(4u64)), Some(Doubloons::from(6u64)));
        assert_eq!(ten.checked_sub(&Doubloons::from(10u64)), Some(Doubloons::zero()));
        assert_eq!(ten.checked_sub(&Doubloons::from(11u64)), None);
    }

    #[test]
    fn test_serde_accepts_strings_and_numbers() {
        let from_string: Doubloons = serde_json::from_str("\"9007199254740993\"").unwrap();
        assert_eq!(from_string.to_string(), "9007199254740993");
        let from_number: Doubloons = serde_json::from_str("1337").unwrap();
        assert_eq!(from_number, Doubloons::from(1337u64));
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"1337\"");
        assert!(serde_json::from_str::<Doubloons>("\"-5\"").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("12abc".parse::<Doubloons>().is_err());
        assert!("-3".parse::<Doubloons>().is_err());
        assert_eq!(" 7 ".parse::<Doubloons>().unwrap(), Doubloons::from(7u64));
    }
}
