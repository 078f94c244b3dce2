//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod decision_store;
pub mod executor;
pub mod probe;

pub use decision_store::DecisionStore;
pub use executor::ActionExecutor;
pub use probe::{BatteryProbe, NetworkProbe};
