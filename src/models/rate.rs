//! Bandwidth rate values as written in the configuration and on the wire.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Deserialize;

use crate::{AppError, Result};

/// Unit of a [`LimitValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateUnit {
    /// Bits per second.
    Bps,
    /// Kilobits per second.
    Kbps,
    /// Megabits per second.
    Mbps,
}

impl RateUnit {
    /// Lower-case wire spelling of the unit.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bps => "bps",
            Self::Kbps => "kbps",
            Self::Mbps => "mbps",
        }
    }
}

impl FromStr for RateUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bps" => Ok(Self::Bps),
            "kbps" => Ok(Self::Kbps),
            "mbps" => Ok(Self::Mbps),
            other => Err(AppError::Config(format!(
                "unknown rate unit '{other}' (expected bps, kbps or mbps)"
            ))),
        }
    }
}

impl Display for RateUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bandwidth magnitude paired with its unit, e.g. `1000kbps`.
///
/// Only constructed by parsing `<digits><unit>`; the unit is matched
/// case-insensitively and always rendered in lower case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct LimitValue {
    magnitude: u64,
    unit: RateUnit,
}

impl LimitValue {
    /// Numeric part of the rate.
    #[must_use]
    pub fn magnitude(&self) -> u64 {
        self.magnitude
    }

    /// Unit of the rate.
    #[must_use]
    pub fn unit(&self) -> RateUnit {
        self.unit
    }
}

impl FromStr for LimitValue {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (digits, unit) = raw.split_at(split);

        if digits.is_empty() {
            return Err(AppError::Config(format!(
                "invalid rate '{s}': expected <digits><unit>"
            )));
        }
        if unit.is_empty() {
            return Err(AppError::Config(format!("invalid rate '{s}': missing unit")));
        }

        let magnitude = digits
            .parse::<u64>()
            .map_err(|err| AppError::Config(format!("invalid rate '{s}': {err}")))?;
        let unit = unit
            .parse::<RateUnit>()
            .map_err(|err| AppError::Config(format!("invalid rate '{s}': {err}")))?;

        Ok(Self { magnitude, unit })
    }
}

impl TryFrom<String> for LimitValue {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl Display for LimitValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit)
    }
}
