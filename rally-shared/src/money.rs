use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A currency amount held as whole cents.
///
/// Amounts travel over JSON as decimal major units (`10.58`) so exported
/// documents stay readable, but every sum and product is done on the integer
/// cents so that repeated edits never accumulate rounding drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude accepted from outside, in cents (ten billion major units).
    pub const MAX_INPUT_CENTS: i64 = 1_000_000_000_000;

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a decimal major-unit amount, rounding to the nearest cent.
    /// Non-finite input collapses to zero.
    pub fn from_major(amount: f64) -> Self {
        if !amount.is_finite() {
            return Self::ZERO;
        }
        Self((amount * 100.0).round() as i64)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn clamp_non_negative(self) -> Self {
        Self(self.0.max(0))
    }

    /// Multiply by a fractional factor (e.g. hours), rounding once to the nearest cent.
    pub fn scale(self, factor: f64) -> Self {
        Self::from_cents((self.0 as f64 * factor).round() as i64)
    }

    /// Equal split among `heads` people, in major units.
    /// There is no share when nobody is splitting the bill.
    pub fn share(self, heads: usize) -> Option<f64> {
        if heads == 0 {
            return None;
        }
        Some(self.0 as f64 / heads as f64 / 100.0)
    }
}

/// Two-decimal rendering for display of fractional major-unit amounts.
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<u32> for Money {
    type Output = Money;

    fn mul(self, rhs: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(rhs)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.to_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(serde::de::Error::custom("amount must be a finite number"));
        }
        let money = Money::from_major(amount);
        if money.0.unsigned_abs() > Money::MAX_INPUT_CENTS.unsigned_abs() {
            return Err(serde::de::Error::custom(format!("amount {} is out of range", amount)));
        }
        Ok(money)
    }
}
