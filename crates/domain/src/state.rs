//! Orchestrator state: keyed diagnostic blobs kept for restarts.
//!
//! State records are overwritten in place (one slot per [`StateType`]) and
//! are never fed back into rule evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::TickId;
use crate::time::Timestamp;

/// Which slot of the state table a record occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    /// The most recently collected [`SystemSnapshot`](crate::snapshot::SystemSnapshot).
    Snapshot,
    /// The control loop's [`LoopStatus`].
    LoopStatus,
}

impl StateType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::LoopStatus => "loop_status",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped, opaque JSON payload stored under a [`StateType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub state_type: StateType,
    pub timestamp: Timestamp,
    pub state_data: serde_json::Value,
}

/// Phases of the control loop.
///
/// `Idle → Collecting → Evaluating → Recording → Sleeping → Idle` is one
/// tick; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    #[default]
    Idle,
    Collecting,
    Evaluating,
    Recording,
    Sleeping,
    Stopped,
}

impl LoopState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::Evaluating => "evaluating",
            Self::Recording => "recording",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
        }
    }

    /// Whether the loop may move from `self` to `next`.
    ///
    /// Any state may move to `Stopped`, and a failed tick may jump straight
    /// to `Sleeping`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use LoopState::{Collecting, Evaluating, Idle, Recording, Sleeping, Stopped};
        matches!(
            (self, next),
            (Idle, Collecting)
                | (Collecting, Evaluating)
                | (Evaluating, Recording)
                | (Recording | Collecting | Evaluating, Sleeping)
                | (Sleeping, Idle)
                | (Idle | Collecting | Evaluating | Recording | Sleeping, Stopped)
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters and last-tick information persisted after every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopStatus {
    pub state: LoopState,
    pub ticks: u64,
    pub failed_ticks: u64,
    /// Decision batches that could not be stored even after retries.
    pub lost_batches: u64,
    pub last_tick_id: Option<TickId>,
    pub last_tick_at: Option<Timestamp>,
    pub last_error: Option<String>,
}
