//! # autopilot-app
//!
//! Application layer: the control loop and the **port definitions** (traits)
//! it drives.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `BatteryProbe` / `NetworkProbe`: read device telemetry
//!   - `ActionExecutor`: carry out a triggered action
//!   - `DecisionStore`: append & query decisions, keep diagnostic state
//! - Provide the use-cases built on top of them:
//!   - `TelemetryCollector`: concurrent, time-bounded snapshot collection
//!   - `RuleEngine`: ordered rule evaluation producing decisions
//!   - `ControlLoop`: the periodic collect → evaluate → record cycle
//! - Provide **in-process infrastructure** (shutdown signal) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `autopilot-domain` only (plus `tokio` for time and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod collector;
pub mod control_loop;
pub mod ports;
pub mod rule_engine;
pub mod shutdown;
