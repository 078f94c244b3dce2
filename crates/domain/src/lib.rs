//! # autopilot-domain
//!
//! Pure domain model for the autopilot device control loop.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Snapshots** (immutable device telemetry readings)
//! - Define **Rules** (predicate + action, evaluated in declaration order)
//! - Define **Decisions** (the append-only audit trail of rule outcomes)
//! - Define **Orchestrator state** (diagnostic slots kept across restarts)
//! - Ship the baseline battery/network **policy** as ordinary rules
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod decision;
pub mod policy;
pub mod rule;
pub mod snapshot;
pub mod state;
