//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `autopilot.toml` in the working directory, or the file named by
//! `AUTOPILOT_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use autopilot_adapter_termux::{CommandLine, DEFAULT_HOOK_TIMEOUT};
use autopilot_app::control_loop::LoopConfig;
use autopilot_domain::action::ActionTag;
use autopilot_domain::policy::DEFAULT_BATTERY_LOW_THRESHOLD;
use autopilot_domain::snapshot::NetworkType;

const DEFAULT_PATH: &str = "autopilot.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control loop timing.
    #[serde(rename = "loop")]
    pub control: ControlConfig,
    /// Where telemetry comes from.
    pub probes: ProbesConfig,
    /// Rule thresholds.
    pub policy: PolicyConfig,
    /// Optional shell hooks per action.
    pub actions: ActionsConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Status API settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Control loop timing and retry settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Seconds between tick starts.
    pub interval_secs: u64,
    /// Upper bound for each probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Attempts to store a decision batch before it is reported lost.
    pub store_attempts: u32,
    /// First retry delay in milliseconds, doubled on every further retry.
    pub retry_backoff_ms: u64,
}

/// Telemetry source selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// `termux-api` commands.
    #[default]
    Termux,
    /// Fixed readings, for demos and hosts without Termux.
    Virtual,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    pub kind: ProbeBackend,
    pub battery_command: CommandLine,
    pub network_command: CommandLine,
    /// Readings served when `kind = "virtual"`.
    #[serde(rename = "virtual")]
    pub scripted: ScriptedReadings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScriptedReadings {
    /// Battery percentage; absent means the probe fails.
    pub battery: Option<u8>,
    pub network: NetworkType,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Battery percentage below which power save triggers.
    pub battery_low_threshold: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Seconds a hook may run before it is killed and the action fails.
    pub timeout_secs: u64,
    /// Action tag → shell command run through `sh -c`.
    pub hooks: HashMap<String, String>,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    pub url: String,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Serve the status API at all.
    pub enabled: bool,
    /// Address to bind to (e.g. `127.0.0.1`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, an
    /// override does not parse, or the values are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("AUTOPILOT_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("AUTOPILOT_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("AUTOPILOT_INTERVAL_SECS") {
            self.control.interval_secs = parse_env("AUTOPILOT_INTERVAL_SECS", &val)?;
        }
        if let Some(val) = var("AUTOPILOT_PROBE_TIMEOUT_SECS") {
            self.control.probe_timeout_secs = parse_env("AUTOPILOT_PROBE_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = var("AUTOPILOT_BIND") {
            let (host, port) = val.rsplit_once(':').ok_or_else(|| ConfigError::InvalidEnv {
                name: "AUTOPILOT_BIND",
                value: val.clone(),
            })?;
            self.server.port = parse_env("AUTOPILOT_BIND", port)?;
            self.server.host = host.to_string();
        }
        if let Some(val) = var("AUTOPILOT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.control.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "loop interval must be non-zero".to_string(),
            ));
        }
        if self.control.probe_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "probe timeout must be non-zero".to_string(),
            ));
        }
        if self.control.probe_timeout_secs >= self.control.interval_secs {
            return Err(ConfigError::Validation(
                "probe timeout must be shorter than the loop interval".to_string(),
            ));
        }
        if self.control.store_attempts == 0 {
            return Err(ConfigError::Validation(
                "store attempts must be at least 1".to_string(),
            ));
        }
        if self.actions.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "action hook timeout must be non-zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.policy.battery_low_threshold) {
            return Err(ConfigError::Validation(
                "battery low threshold must be within 1..=100".to_string(),
            ));
        }
        if self.server.enabled && self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Timing knobs for the control loop.
    #[must_use]
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            interval: Duration::from_secs(self.control.interval_secs),
            probe_timeout: Duration::from_secs(self.control.probe_timeout_secs),
            store_attempts: self.control.store_attempts,
            retry_backoff: Duration::from_millis(self.control.retry_backoff_ms),
        }
    }

    /// Configured hooks keyed by action.
    #[must_use]
    pub fn hooks(&self) -> HashMap<ActionTag, String> {
        self.actions
            .hooks
            .iter()
            .map(|(action, script)| (ActionTag::from(action.as_str()), script.clone()))
            .collect()
    }

    /// Upper bound for a single action hook run.
    #[must_use]
    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.actions.timeout_secs)
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HOOK_TIMEOUT.as_secs(),
            hooks: HashMap::new(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            probe_timeout_secs: 10,
            store_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            kind: ProbeBackend::default(),
            battery_command: CommandLine::new("termux-battery-status"),
            network_command: CommandLine::new("termux-wifi-connectioninfo"),
            scripted: ScriptedReadings::default(),
        }
    }
}

impl Default for ScriptedReadings {
    fn default() -> Self {
        Self {
            battery: Some(100),
            network: NetworkType::Wifi,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            battery_low_threshold: DEFAULT_BATTERY_LOW_THRESHOLD,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:autopilot.db".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "autopilot=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
