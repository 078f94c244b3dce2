//! Decision store port: the durable audit trail and diagnostic state slots.

use std::future::Future;

use autopilot_domain::decision::{Decision, DecisionFilter};
use autopilot_domain::error::AutopilotError;
use autopilot_domain::snapshot::SystemSnapshot;
use autopilot_domain::state::LoopStatus;

/// Append-only decision log plus the overwrite-in-place state slots.
///
/// The log has no update or delete operation.
pub trait DecisionStore {
    /// Durably append a batch of decisions, all or nothing.
    ///
    /// Once this returns `Ok`, the batch survives a process restart.
    fn append(
        &self,
        decisions: &[Decision],
    ) -> impl Future<Output = Result<(), AutopilotError>> + Send;

    /// Overwrite the "latest snapshot" slot.
    fn record_snapshot(
        &self,
        snapshot: &SystemSnapshot,
    ) -> impl Future<Output = Result<(), AutopilotError>> + Send;

    /// Read back the "latest snapshot" slot, if one was ever recorded.
    fn latest(&self) -> impl Future<Output = Result<Option<SystemSnapshot>, AutopilotError>> + Send;

    /// Read decisions matching `filter`, oldest first.
    fn query(
        &self,
        filter: &DecisionFilter,
    ) -> impl Future<Output = Result<Vec<Decision>, AutopilotError>> + Send;

    /// Overwrite the loop status slot.
    fn record_loop_status(
        &self,
        status: &LoopStatus,
    ) -> impl Future<Output = Result<(), AutopilotError>> + Send;

    /// Read back the loop status slot, if one was ever recorded.
    fn loop_status(&self) -> impl Future<Output = Result<Option<LoopStatus>, AutopilotError>> + Send;
}

impl<T: DecisionStore + Send + Sync> DecisionStore for std::sync::Arc<T> {
    fn append(
        &self,
        decisions: &[Decision],
    ) -> impl Future<Output = Result<(), AutopilotError>> + Send {
        (**self).append(decisions)
    }

    fn record_snapshot(
        &self,
        snapshot: &SystemSnapshot,
    ) -> impl Future<Output = Result<(), AutopilotError>> + Send {
        (**self).record_snapshot(snapshot)
    }

    fn latest(&self) -> impl Future<Output = Result<Option<SystemSnapshot>, AutopilotError>> + Send {
        (**self).latest()
    }

    fn query(
        &self,
        filter: &DecisionFilter,
    ) -> impl Future<Output = Result<Vec<Decision>, AutopilotError>> + Send {
        (**self).query(filter)
    }

    fn record_loop_status(
        &self,
        status: &LoopStatus,
    ) -> impl Future<Output = Result<(), AutopilotError>> + Send {
        (**self).record_loop_status(status)
    }

    fn loop_status(&self) -> impl Future<Output = Result<Option<LoopStatus>, AutopilotError>> + Send {
        (**self).loop_status()
    }
}
