//! # autopilot-adapter-virtual
//!
//! Virtual/demo adapter that stands in for a real device, for testing,
//! demonstration and hosts without Termux.
//!
//! ## Provided components
//!
//! | Component | Port | Behaviour |
//! |-----------|------|-----------|
//! | [`VirtualDevice`] | `BatteryProbe`, `NetworkProbe` | Answers with scripted readings, failures or silence |
//! | [`RecordingActuator`] | `ActionExecutor` | Logs and remembers every action, optionally failing some |
//!
//! ## Dependency rule
//!
//! Depends on `autopilot-app` (port traits) and `autopilot-domain` only.

mod actuator;
mod device;

pub use actuator::RecordingActuator;
pub use device::{Reading, VirtualDevice};
