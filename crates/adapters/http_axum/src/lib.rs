//! # autopilot-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small **read-only JSON API** for monitoring the control loop:
//!   - `GET /health`: liveness
//!   - `GET /api/status`: latest snapshot and loop status
//!   - `GET /api/decisions`: filtered view of the decision log
//! - Map application results and errors into HTTP responses
//! - Allow cross-origin reads so a browser dashboard can poll the daemon
//!
//! ## Dependency rule
//! Depends on `autopilot-app` (for port traits) and `autopilot-domain`
//! (for domain types used in responses). Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
