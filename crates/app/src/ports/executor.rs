//! Action executor port: performs (or simulates) the effect of an action.

use std::future::Future;

use autopilot_domain::action::ActionTag;
use autopilot_domain::error::ActionError;

/// Carries out actions emitted by triggered rules.
pub trait ActionExecutor {
    /// Perform `action`. A returned error marks the decision as failed but
    /// never stops the tick.
    fn execute(&self, action: &ActionTag) -> impl Future<Output = Result<(), ActionError>> + Send;
}

impl<T: ActionExecutor + Send + Sync> ActionExecutor for std::sync::Arc<T> {
    fn execute(&self, action: &ActionTag) -> impl Future<Output = Result<(), ActionError>> + Send {
        (**self).execute(action)
    }
}
