//! Coordinate values with fixed two-digit precision.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use techpassport_core::{DomainError, DomainResult, ValueObject};

/// A single coordinate value, normalized to exactly two fractional digits.
///
/// Stored as an integer count of hundredths, so equality, ordering and the text
/// form never drift. Rounding is half-up (ties away from zero) and happens once,
/// at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Coordinate {
    hundredths: i64,
}

impl Coordinate {
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self { hundredths }
    }

    /// Build from a float through its shortest decimal representation, so
    /// `10.505_f64` rounds like the text `"10.505"` does.
    pub fn from_f64(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::validation(format!(
                "coordinate value {value} is not a finite number"
            )));
        }
        Self::parse(&value.to_string())
    }

    /// Parse a decimal string. Both `.` and `,` are accepted as the separator.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(DomainError::validation("coordinate value cannot be blank"));
        }

        let text = text.replace(',', ".");
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text.as_str())),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !is_digits(int_part)
            || !is_digits(frac_part)
        {
            return Err(DomainError::validation(format!(
                "coordinate value '{raw}' is not a number"
            )));
        }

        let out_of_range =
            || DomainError::validation(format!("coordinate value '{raw}' is out of range"));

        let mut whole: i64 = 0;
        for digit in int_part.bytes() {
            whole = whole
                .checked_mul(10)
                .and_then(|w| w.checked_add(i64::from(digit - b'0')))
                .ok_or_else(out_of_range)?;
        }

        let frac = frac_part.as_bytes();
        let frac_digit = |i: usize| frac.get(i).map_or(0, |b| i64::from(b - b'0'));

        let mut hundredths = whole
            .checked_mul(100)
            .and_then(|h| h.checked_add(frac_digit(0) * 10 + frac_digit(1)))
            .ok_or_else(out_of_range)?;
        if frac_digit(2) >= 5 {
            hundredths = hundredths.checked_add(1).ok_or_else(out_of_range)?;
        }

        Ok(Self {
            hundredths: if negative { -hundredths } else { hundredths },
        })
    }

    /// Lossy conversion for display/measurement code.
    pub fn to_f64(self) -> f64 {
        self.hundredths as f64 / 100.0
    }
}

impl ValueObject for Coordinate {}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.hundredths < 0 { "-" } else { "" };
        let abs = self.hundredths.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Coordinate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Serialized as the normalized text so JSON never carries binary floats.
impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A plan vertex `(x, y)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinatePoint {
    x: Coordinate,
    y: Coordinate,
}

impl CoordinatePoint {
    pub fn new(x: f64, y: f64) -> DomainResult<Self> {
        Ok(Self {
            x: Coordinate::from_f64(x).map_err(|e| on_axis("x", e))?,
            y: Coordinate::from_f64(y).map_err(|e| on_axis("y", e))?,
        })
    }

    pub fn from_strings(x: &str, y: &str) -> DomainResult<Self> {
        Ok(Self {
            x: Coordinate::parse(x).map_err(|e| on_axis("x", e))?,
            y: Coordinate::parse(y).map_err(|e| on_axis("y", e))?,
        })
    }

    pub const fn from_coordinates(x: Coordinate, y: Coordinate) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> Coordinate {
        self.x
    }

    pub fn y(&self) -> Coordinate {
        self.y
    }
}

impl ValueObject for CoordinatePoint {}

impl core::fmt::Display for CoordinatePoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn on_axis(axis: &str, err: DomainError) -> DomainError {
    match err {
        DomainError::Validation(msg) => DomainError::validation(format!("{axis}: {msg}")),
        other => other,
    }
}
