//! System snapshot: an immutable point-in-time reading of device telemetry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::Timestamp;

/// Battery charge as an integer percentage, or unknown when the probe
/// did not answer.
///
/// Serialized as a nullable integer (`15` or `null`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Option<i64>", into = "Option<u8>")]
pub enum BatteryLevel {
    Known(u8),
    #[default]
    Unknown,
}

impl BatteryLevel {
    /// Build a known battery level, rejecting values outside `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BatteryOutOfRange`] when `value` is not a
    /// valid percentage.
    pub fn percent(value: i64) -> Result<Self, ValidationError> {
        match u8::try_from(value) {
            Ok(pct) if pct <= 100 => Ok(Self::Known(pct)),
            _ => Err(ValidationError::BatteryOutOfRange(value)),
        }
    }

    /// The percentage, if known.
    #[must_use]
    pub fn value(self) -> Option<u8> {
        match self {
            Self::Known(pct) => Some(pct),
            Self::Unknown => None,
        }
    }

    /// `true` when the level is known and strictly below `threshold`.
    #[must_use]
    pub fn is_below(self, threshold: u8) -> bool {
        self.value().is_some_and(|pct| pct < threshold)
    }
}

impl TryFrom<Option<i64>> for BatteryLevel {
    type Error = ValidationError;

    fn try_from(value: Option<i64>) -> Result<Self, Self::Error> {
        value.map_or(Ok(Self::Unknown), Self::percent)
    }
}

impl From<BatteryLevel> for Option<u8> {
    fn from(level: BatteryLevel) -> Self {
        level.value()
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(pct) => write!(f, "{pct}%"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Kind of network connection the device is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Wifi,
    Mobile,
    #[default]
    Unknown,
}

impl NetworkType {
    /// Stable lowercase name, also used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wifi => "wifi",
            Self::Mobile => "mobile",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wifi" => Ok(Self::Wifi),
            "mobile" => Ok(Self::Mobile),
            "unknown" => Ok(Self::Unknown),
            other => Err(ValidationError::UnknownNetworkType(other.to_string())),
        }
    }
}

/// Observable device state at one instant.
///
/// Created once per tick by the collector and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub taken_at: Timestamp,
    pub battery_level: BatteryLevel,
    pub network_type: NetworkType,
}

impl SystemSnapshot {
    /// Create a builder for constructing a [`SystemSnapshot`].
    #[must_use]
    pub fn builder() -> SystemSnapshotBuilder {
        SystemSnapshotBuilder::default()
    }
}

/// Step-by-step builder for [`SystemSnapshot`].
///
/// Fields left unset fall back to the documented probe defaults
/// (`unknown`), and `taken_at` to the current time.
#[derive(Debug, Default)]
pub struct SystemSnapshotBuilder {
    taken_at: Option<Timestamp>,
    battery_level: BatteryLevel,
    network_type: NetworkType,
}

impl SystemSnapshotBuilder {
    #[must_use]
    pub fn taken_at(mut self, taken_at: Timestamp) -> Self {
        self.taken_at = Some(taken_at);
        self
    }

    #[must_use]
    pub fn battery_level(mut self, battery_level: BatteryLevel) -> Self {
        self.battery_level = battery_level;
        self
    }

    #[must_use]
    pub fn network_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = network_type;
        self
    }

    /// Consume the builder and return a [`SystemSnapshot`].
    #[must_use]
    pub fn build(self) -> SystemSnapshot {
        SystemSnapshot {
            taken_at: self.taken_at.unwrap_or_else(crate::time::now),
            battery_level: self.battery_level,
            network_type: self.network_type,
        }
    }
}
