//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`AutopilotError`] via `#[from]`.

/// Top-level error shared by ports and services.
#[derive(Debug, thiserror::Error)]
pub enum AutopilotError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("telemetry probe error")]
    Probe(#[from] ProbeError),

    #[error("action execution error")]
    Action(#[from] ActionError),
}

/// A domain invariant was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("rule id must not be empty")]
    EmptyRuleId,

    #[error("rule {0:?} has no predicate")]
    MissingPredicate(String),

    #[error("rule {0:?} has no action")]
    MissingAction(String),

    #[error("duplicate rule id {0:?}")]
    DuplicateRuleId(String),

    #[error("battery level {0} is outside 0..=100")]
    BatteryOutOfRange(i64),

    #[error("unknown decision status {0:?}")]
    UnknownStatus(String),

    #[error("unknown network type {0:?}")]
    UnknownNetworkType(String),
}

/// A lookup by key returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A rule predicate could not produce a verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The predicate needs a snapshot field that was not observed.
    #[error("snapshot field `{0}` is required but unknown")]
    MissingField(&'static str),

    #[error("predicate failed: {0}")]
    Predicate(String),

    /// The predicate panicked instead of returning.
    #[error("predicate panicked: {0}")]
    Panicked(String),
}

/// A telemetry probe did not produce a reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The probe tool is not installed or returned nothing usable.
    #[error("probe unavailable")]
    Unavailable,

    #[error("probe timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("probe abandoned on shutdown")]
    Cancelled,

    #[error("malformed probe output: {0}")]
    Malformed(String),
}

/// The action executor reported failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("action `{action}` failed: {reason}")]
    Failed { action: String, reason: String },

    #[error("action `{0}` is not supported by this executor")]
    Unsupported(String),

    #[error("action `{action}` timed out after {after:?}")]
    TimedOut {
        action: String,
        after: std::time::Duration,
    },

    /// Shutdown was requested before the action finished.
    #[error("action `{0}` abandoned on shutdown")]
    Cancelled(String),
}
