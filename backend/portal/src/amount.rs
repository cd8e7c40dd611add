//! Fixed-point currency amounts, stored as integer cents.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A monetary amount with 2 decimal places, stored as a scaled integer.
///
/// All persistence and arithmetic happen on the scaled value; floats only
/// appear at the JSON boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 100;

    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    pub fn as_cents(&self) -> i64 {
        self.0
    }

    /// Convert a JSON decimal into an amount, rounding to the nearest cent.
    pub fn from_float(value: f64) -> Self {
        Amount((value * Self::SCALE as f64).round() as i64)
    }

    pub fn to_float(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Percentage of `target` this amount represents. Deliberately unclamped:
    /// an overfunded campaign reports more than 100.
    pub fn percent_of(&self, target: Amount) -> f64 {
        if target.0 <= 0 {
            return 0.0;
        }
        self.0 as f64 * 100.0 / target.0 as f64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        write!(f, "{sign}{whole}.{frac:02}")
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_float())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Amount::from_float(value))
    }
}
