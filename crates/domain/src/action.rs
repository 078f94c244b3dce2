//! Action: the tagged effect a rule asks the executor to perform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An effect emitted by a rule.
///
/// The engine never interprets actions; it only hands them to the
/// action executor and records their tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ActionTag {
    /// Put the device in a power-saving posture.
    PowerSave,
    /// Allow heavy work (e.g. a remote build) to run now.
    PermitHeavyTask,
    /// Hold heavy work until conditions improve.
    DeferHeavyTask,
    /// Any other action name, for rules beyond the baseline policy.
    Custom(String),
}

impl ActionTag {
    /// Stable snake-case name stored in the decision log.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PowerSave => "power_save",
            Self::PermitHeavyTask => "permit_heavy_task",
            Self::DeferHeavyTask => "defer_heavy_task",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActionTag {
    fn from(value: String) -> Self {
        match value.as_str() {
            "power_save" => Self::PowerSave,
            "permit_heavy_task" => Self::PermitHeavyTask,
            "defer_heavy_task" => Self::DeferHeavyTask,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for ActionTag {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ActionTag> for String {
    fn from(tag: ActionTag) -> Self {
        match tag {
            ActionTag::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ActionTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}
