//! Action executor that runs an optional shell hook per action.

use std::collections::HashMap;
use std::time::Duration;

use autopilot_app::ports::ActionExecutor;
use autopilot_domain::action::ActionTag;
use autopilot_domain::error::ActionError;

use crate::command::CommandLine;

/// Environment variable carrying the action tag into a hook.
const ACTION_ENV: &str = "AUTOPILOT_ACTION";

/// Time a hook may run before it is killed and the action fails.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `sh -c <hook>` for actions that have a hook configured and only logs
/// the effect for the others.
///
/// A hook that exits non-zero fails the action, and so does one still
/// running after the timeout. The child is killed when it is given up on.
#[derive(Debug, Clone)]
pub struct HookExecutor {
    hooks: HashMap<ActionTag, String>,
    timeout: Duration,
}

impl Default for HookExecutor {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl HookExecutor {
    #[must_use]
    pub fn new(hooks: HashMap<ActionTag, String>) -> Self {
        Self {
            hooks,
            timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    /// Bound every hook run by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register `script` as the hook for `action`, replacing any previous one.
    #[must_use]
    pub fn with_hook(mut self, action: ActionTag, script: impl Into<String>) -> Self {
        self.hooks.insert(action, script.into());
        self
    }
}

impl ActionExecutor for HookExecutor {
    async fn execute(&self, action: &ActionTag) -> Result<(), ActionError> {
        let Some(script) = self.hooks.get(action) else {
            tracing::info!(%action, "no hook configured, action simulated");
            return Ok(());
        };

        let command = CommandLine::new("sh").arg("-c").arg(script.as_str());
        let env = [(ACTION_ENV, action.as_str())];
        let run = command.output_with_env(&env);
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_elapsed| {
                tracing::warn!(
                    %action,
                    hook = %script,
                    timeout = ?self.timeout,
                    "action hook timed out"
                );
                ActionError::TimedOut {
                    action: action.to_string(),
                    after: self.timeout,
                }
            })?
            .map_err(|err| err.into_action_error(action.as_str()))?;

        tracing::info!(%action, hook = %script, output = %output, "action hook ran");
        Ok(())
    }
}
