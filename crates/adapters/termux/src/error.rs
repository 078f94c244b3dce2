//! Termux-specific error type and its mapping onto probe and action errors.

use autopilot_domain::error::{ActionError, ProbeError};

/// Errors raised while running or reading a termux command.
#[derive(Debug, thiserror::Error)]
pub enum TermuxError {
    /// The program could not be started (not installed, not executable).
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The program printed nothing.
    #[error("`{command}` produced no output")]
    EmptyOutput { command: String },

    /// The output was not the expected JSON document.
    #[error("`{command}` printed unexpected output")]
    Json {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value was present but outside its valid range.
    #[error("`{command}` reported {field} = {value}")]
    OutOfRange {
        command: String,
        field: &'static str,
        value: i64,
    },
}

impl From<TermuxError> for ProbeError {
    fn from(err: TermuxError) -> Self {
        match err {
            TermuxError::Spawn { .. } | TermuxError::Exit { .. } | TermuxError::EmptyOutput { .. } => {
                Self::Unavailable
            }
            TermuxError::Json { .. } | TermuxError::OutOfRange { .. } => {
                Self::Malformed(error_chain(&err))
            }
        }
    }
}

impl TermuxError {
    /// Wrap this error as the failure of `action`.
    pub(crate) fn into_action_error(self, action: &str) -> ActionError {
        ActionError::Failed {
            action: action.to_string(),
            reason: error_chain(&self),
        }
    }
}

/// `err` and all of its sources, joined with `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
