//! Shared application state for axum handlers.

use std::sync::Arc;

use autopilot_app::ports::DecisionStore;

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented manually so the store itself does not need to be
/// `Clone`; only the `Arc` is cloned.
pub struct AppState<S> {
    /// Read side of the decision log and the diagnostic state slots.
    pub store: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> AppState<S>
where
    S: DecisionStore + Send + Sync + 'static,
{
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Use this when the store is also shared with the control loop.
    pub fn from_arc(store: Arc<S>) -> Self {
        Self { store }
    }
}
