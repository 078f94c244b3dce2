//! Decision: the recorded outcome of one rule against one snapshot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::ActionTag;
use crate::error::ValidationError;
use crate::time::Timestamp;

/// What happened to a rule during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The rule emitted an action and the executor accepted it.
    Triggered,
    /// The rule did not apply.
    Skipped,
    /// The predicate or the action execution failed.
    Failed,
}

impl DecisionStatus {
    /// Stable lowercase name, also used as the stored column value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triggered => "triggered",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "triggered" => Ok(Self::Triggered),
            "skipped" => Ok(Self::Skipped),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// An immutable entry of the decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub rule_id: String,
    pub action_type: ActionTag,
    pub status: DecisionStatus,
    pub timestamp: Timestamp,
}

impl Decision {
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        action_type: ActionTag,
        status: DecisionStatus,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            action_type,
            status,
            timestamp,
        }
    }
}

/// Selection criteria for reading back the decision log.
///
/// All criteria are optional and combined with logical AND. Results are
/// always returned oldest first; `limit` keeps the most recent matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionFilter {
    pub rule_id: Option<String>,
    pub status: Option<DecisionStatus>,
    pub since: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl DecisionFilter {
    /// A filter matching every decision.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: DecisionStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `decision` satisfies the rule, status and time criteria.
    ///
    /// `limit` is not a per-decision criterion and is ignored here.
    #[must_use]
    pub fn matches(&self, decision: &Decision) -> bool {
        self.rule_id
            .as_deref()
            .is_none_or(|id| id == decision.rule_id)
            && self.status.is_none_or(|status| status == decision.status)
            && self.since.is_none_or(|since| decision.timestamp >= since)
    }
}
