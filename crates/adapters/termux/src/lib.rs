//! # autopilot-adapter-termux
//!
//! Device integration for Android hosts running [Termux](https://termux.dev)
//! with the `termux-api` package installed.
//!
//! ## Responsibilities
//! - Implement `BatteryProbe` on top of `termux-battery-status`
//! - Implement `NetworkProbe` on top of `termux-wifi-connectioninfo`
//! - Implement `ActionExecutor` by running an optional shell hook per action
//!
//! Every command is a plain program + arguments, so the probes work with any
//! tool printing the same JSON.
//!
//! ## Dependency rule
//! Depends on `autopilot-app` (port traits) and `autopilot-domain` only.

mod battery;
mod command;
mod error;
mod hooks;
mod network;

pub use battery::TermuxBatteryProbe;
pub use command::CommandLine;
pub use error::TermuxError;
pub use hooks::{DEFAULT_HOOK_TIMEOUT, HookExecutor};
pub use network::TermuxNetworkProbe;
