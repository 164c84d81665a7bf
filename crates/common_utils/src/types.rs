//! Types that can be used in other crates

use std::{
    fmt::Display,
    ops::{Add, Sub},
};

use error_stack::{report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, PercentageError};

/// Represents a monetary amount in the smallest unit of its currency
/// (e.g. cents for USD). All amounts in the system are carried in minor
/// units to avoid floating point drift.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
)]
pub struct MinorUnit(i64);

impl MinorUnit {
    /// Construct a minor unit amount from an `i64` value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The zero amount.
    pub fn zero() -> Self {
        Self(0)
    }

    /// The raw amount as an `i64`.
    pub fn get_amount_as_i64(self) -> i64 {
        self.0
    }

    /// Whether the amount is strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Multiply the amount by a unit count, `None` on overflow.
    pub fn checked_mul(self, multiplier: i64) -> Option<Self> {
        self.0.checked_mul(multiplier).map(Self)
    }

    /// Subtract another amount, `None` on overflow.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl Display for MinorUnit {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl Add for MinorUnit {
    type Output = Self;
    fn add(self, a2: Self) -> Self {
        Self(self.0 + a2.0)
    }
}

impl Sub for MinorUnit {
    type Output = Self;
    fn sub(self, a2: Self) -> Self {
        Self(self.0 - a2.0)
    }
}

/// Represents a percentage value between 0 and 100 both inclusive.
/// `PRECISION` is the number of decimal digits the value may carry.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct Percentage<const PRECISION: u8> {
    percentage: f32,
}

impl<const PRECISION: u8> Percentage<PRECISION> {
    /// Construct a percentage from a float value, validating the range.
    pub fn from_float(value: f32) -> CustomResult<Self, PercentageError> {
        if Self::is_valid_range(value) {
            Ok(Self { percentage: value })
        } else {
            Err(report!(PercentageError::InvalidPercentageValue))
        }
    }

    /// Construct a percentage from a string representation of a float value,
    /// validating range and decimal precision.
    pub fn from_string(value: String) -> CustomResult<Self, PercentageError> {
        let float_value = value
            .parse::<f32>()
            .map_err(|_| report!(PercentageError::InvalidPercentageValue))?;
        if Self::is_valid_range(float_value) && Self::is_valid_precision_length(&value) {
            Ok(Self {
                percentage: float_value,
            })
        } else {
            Err(report!(PercentageError::InvalidPercentageValue))
        }
    }

    /// The percentage value.
    pub fn get_percentage(&self) -> f32 {
        self.percentage
    }

    /// Apply the percentage to an amount and ceil the result.
    #[allow(clippy::as_conversions)]
    pub fn apply_and_ceil_result(
        &self,
        amount: MinorUnit,
    ) -> CustomResult<MinorUnit, PercentageError> {
        let max_amount = i64::MAX / 10000;
        let amount = amount.0;
        if amount > max_amount {
            // value gets rounded off after i64::MAX/10000
            Err(report!(PercentageError::UnableToApplyPercentage {
                percentage: self.percentage,
                amount: MinorUnit::new(amount),
            }))
            .attach_printable(format!(
                "Cannot calculate percentage for amount greater than {}",
                max_amount
            ))
        } else {
            let percentage_f64 = f64::from(self.percentage);
            let result = (amount as f64 * (percentage_f64 / 100.0)).ceil() as i64;
            Ok(MinorUnit::new(result))
        }
    }

    fn is_valid_range(value: f32) -> bool {
        (0.0..=100.0).contains(&value)
    }

    fn is_valid_precision_length(value: &str) -> bool {
        if value.contains('.') {
            match value.split('.').next_back() {
                Some(decimal_part) => {
                    decimal_part.trim_end_matches('0').len() <= <u8 as Into<usize>>::into(PRECISION)
                }
                None => false,
            }
        } else {
            true
        }
    }
}

impl<const PRECISION: u8> Serialize for Percentage<PRECISION> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f32(self.percentage)
    }
}

impl<'de, const PRECISION: u8> Deserialize<'de> for Percentage<PRECISION> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f32::deserialize(deserializer)?;
        Self::from_float(value).map_err(|_| {
            serde::de::Error::custom("percentage value must be a float between 0 and 100")
        })
    }
}
