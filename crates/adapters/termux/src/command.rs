//! Running an external command and capturing its standard output.

use std::fmt;
use std::process::Stdio;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::process::Command;

use crate::error::TermuxError;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandLine {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandLine {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run to completion and return trimmed stdout.
    ///
    /// The child is killed if the returned future is dropped early, so a
    /// probe timeout never leaves a stray process behind.
    pub(crate) async fn output(&self) -> Result<String, TermuxError> {
        self.output_with_env(&[]).await
    }

    pub(crate) async fn output_with_env(
        &self,
        env: &[(&str, &str)],
    ) -> Result<String, TermuxError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TermuxError::Spawn {
                command: self.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(TermuxError::Exit {
                command: self.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::trace!(command = %self, stdout = %stdout, "command finished");
        Ok(stdout)
    }

    /// Run and parse stdout as a JSON document.
    pub(crate) async fn json<T: DeserializeOwned>(&self) -> Result<T, TermuxError> {
        let stdout = self.output().await?;
        if stdout.is_empty() {
            return Err(TermuxError::EmptyOutput {
                command: self.to_string(),
            });
        }
        serde_json::from_str(&stdout).map_err(|source| TermuxError::Json {
            command: self.to_string(),
            source,
        })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
