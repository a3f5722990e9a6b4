use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exact decimal money value.
///
/// Thin wrapper over [`rust_decimal::Decimal`]; every balance comparison and
/// mutation in the engine goes through this type or the wrapped `Decimal`.
/// Binary floating point never touches a balance. Serialization is the
/// decimal string form, so a parsed value prints back exactly as it came in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MoneyAmount(Decimal);

impl MoneyAmount {
    pub const ZERO: MoneyAmount = MoneyAmount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// The wrapped decimal, for handing to entity columns.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn add(&self, other: MoneyAmount) -> MoneyAmount {
        MoneyAmount(self.0 + other.0)
    }

    pub fn subtract(&self, other: MoneyAmount) -> MoneyAmount {
        MoneyAmount(self.0 - other.0)
    }

    /// Multiply by a scalar, e.g. a count of installments.
    pub fn scale(&self, factor: Decimal) -> MoneyAmount {
        MoneyAmount(self.0 * factor)
    }

    pub fn negate(&self) -> MoneyAmount {
        MoneyAmount(-self.0)
    }

    pub fn is_less_than(&self, other: MoneyAmount) -> bool {
        self.0 < other.0
    }

    pub fn is_greater_than_or_equal(&self, other: MoneyAmount) -> bool {
        self.0 >= other.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Decimal> for MoneyAmount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<MoneyAmount> for Decimal {
    fn from(value: MoneyAmount) -> Self {
        value.0
    }
}

impl FromStr for MoneyAmount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(MoneyAmount)
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for MoneyAmount {
    type Output = MoneyAmount;

    fn add(self, rhs: MoneyAmount) -> MoneyAmount {
        MoneyAmount(self.0 + rhs.0)
    }
}

impl Sub for MoneyAmount {
    type Output = MoneyAmount;

    fn sub(self, rhs: MoneyAmount) -> MoneyAmount {
        MoneyAmount(self.0 - rhs.0)
    }
}

impl Neg for MoneyAmount {
    type Output = MoneyAmount;

    fn neg(self) -> MoneyAmount {
        MoneyAmount(-self.0)
    }
}
