//! Roulette wheel numbers and the color partition of the single-zero wheel.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Highest pocket on a single-zero wheel.
pub const MAX_NUMBER: u8 = 36;

/// Pockets colored red on a standard single-zero wheel.
pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Raised when a value does not name a pocket of the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid winning number {0}: must be between 0 and 36")]
pub struct InvalidNumber(pub i64);

/// Color of a pocket on the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WheelColor {
    /// Eighteen red pockets.
    Red,
    /// Eighteen black pockets.
    Black,
    /// The single zero pocket.
    Green,
}

impl WheelColor {
    /// Every color in display order.
    pub const ALL: [WheelColor; 3] = [WheelColor::Red, WheelColor::Black, WheelColor::Green];

    /// Lowercase name used in storage documents and payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            WheelColor::Red => "red",
            WheelColor::Black => "black",
            WheelColor::Green => "green",
        }
    }
}

impl fmt::Display for WheelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the color of a pocket.
///
/// This is the only place the partition is encoded; draw results, overrides and analytics all
/// go through it.
pub fn color_of(number: i64) -> Result<WheelColor, InvalidNumber> {
    let pocket = u8::try_from(number)
        .ok()
        .filter(|value| *value <= MAX_NUMBER)
        .ok_or(InvalidNumber(number))?;

    Ok(pocket_color(pocket))
}

fn pocket_color(pocket: u8) -> WheelColor {
    if pocket == 0 {
        WheelColor::Green
    } else if RED_NUMBERS.contains(&pocket) {
        WheelColor::Red
    } else {
        WheelColor::Black
    }
}

/// A validated pocket number in `0..=36`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RouletteNumber(u8);

impl RouletteNumber {
    /// Raw pocket value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Color of this pocket.
    pub fn color(self) -> WheelColor {
        pocket_color(self.0)
    }

    /// Spin: a uniformly drawn pocket.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(0..=MAX_NUMBER))
    }

    /// Iterate over every pocket of the wheel in ascending order.
    pub fn all() -> impl Iterator<Item = RouletteNumber> {
        (0..=MAX_NUMBER).map(RouletteNumber)
    }
}

impl TryFrom<i64> for RouletteNumber {
    type Error = InvalidNumber;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|pocket| *pocket <= MAX_NUMBER)
            .map(Self)
            .ok_or(InvalidNumber(value))
    }
}

impl<'de> Deserialize<'de> for RouletteNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        RouletteNumber::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for RouletteNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_the_wheel_without_overlap() {
        let mut red = 0;
        let mut black = 0;
        let mut green = 0;
        for number in 0..=36 {
            match color_of(number).unwrap() {
                WheelColor::Red => red += 1,
                WheelColor::Black => black += 1,
                WheelColor::Green => green += 1,
            }
        }
        assert_eq!((red, black, green), (18, 18, 1));
    }

    #[test]
    fn known_pockets() {
        assert_eq!(color_of(0), Ok(WheelColor::Green));
        assert_eq!(color_of(17), Ok(WheelColor::Black));
        assert_eq!(color_of(36), Ok(WheelColor::Red));
        assert_eq!(color_of(10), Ok(WheelColor::Black));
        assert_eq!(color_of(19), Ok(WheelColor::Red));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert_eq!(color_of(37), Err(InvalidNumber(37)));
        assert_eq!(color_of(-1), Err(InvalidNumber(-1)));
        assert_eq!(color_of(i64::MAX), Err(InvalidNumber(i64::MAX)));
        assert!(RouletteNumber::try_from(300).is_err());
    }

    #[test]
    fn roulette_number_color_matches_partition() {
        for number in RouletteNumber::all() {
            assert_eq!(
                Ok(number.color()),
                color_of(i64::from(number.value())),
                "pocket {number}"
            );
        }
        assert_eq!(RouletteNumber::all().count(), 37);
    }

    #[test]
    fn deserialization_validates_range() {
        let ok: RouletteNumber = serde_json::from_str("12").unwrap();
        assert_eq!(ok.value(), 12);
        assert!(serde_json::from_str::<RouletteNumber>("37").is_err());
        assert!(serde_json::from_str::<RouletteNumber>("-3").is_err());
    }
}
