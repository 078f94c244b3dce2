//! Recording actuator: performs no real effect, only logs and remembers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use autopilot_app::ports::ActionExecutor;
use autopilot_domain::action::ActionTag;
use autopilot_domain::error::ActionError;

#[derive(Debug, Default)]
struct Log {
    executed: Vec<ActionTag>,
    failing: HashSet<ActionTag>,
}

/// Simulated [`ActionExecutor`] that remembers every action it was asked to
/// perform.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    log: Arc<Mutex<Log>>,
}

impl RecordingActuator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future execution of `action` fail.
    pub fn fail_on(&self, action: ActionTag) {
        self.with(|log| log.failing.insert(action));
    }

    /// Actions executed so far, in order (failed attempts included).
    #[must_use]
    pub fn executed(&self) -> Vec<ActionTag> {
        self.with(|log| log.executed.clone())
    }

    fn with<T>(&self, f: impl FnOnce(&mut Log) -> T) -> T {
        let mut guard = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl ActionExecutor for RecordingActuator {
    async fn execute(&self, action: &ActionTag) -> Result<(), ActionError> {
        let fails = self.with(|log| {
            log.executed.push(action.clone());
            log.failing.contains(action)
        });
        if fails {
            return Err(ActionError::Failed {
                action: action.to_string(),
                reason: "virtual actuator configured to fail".to_string(),
            });
        }
        tracing::info!(%action, "virtual action performed");
        Ok(())
    }
}
