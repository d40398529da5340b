use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------        Money        ---------------------------------------------------------
/// A monetary amount in minor units (cents). All arithmetic is exact integer arithmetic; fractional results
/// (percentages) are rounded half-away-from-zero to the nearest cent.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(Money {
    binary Add => add,
    binary Sub => sub,
    inplace AddAssign => add_assign,
    inplace SubAssign => sub_assign,
    unary Neg => neg,
});

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whole currency units, e.g. `Money::from_major(2)` is 2.00.
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Applies a percentage rate to this amount, rounding half-away-from-zero to the nearest cent.
    /// `Money::from_cents(10_000).percent(12.5)` is 12.50.
    pub fn percent(&self, rate: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(((self.0 as f64) * rate / 100.0).round() as i64)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}
