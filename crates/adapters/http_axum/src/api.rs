//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod decisions;
#[allow(clippy::missing_errors_doc)]
pub mod status;

use axum::Router;
use axum::routing::get;

use autopilot_app::ports::DecisionStore;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S>() -> Router<AppState<S>>
where
    S: DecisionStore + Send + Sync + 'static,
{
    Router::new()
        .route("/status", get(status::get::<S>))
        .route("/decisions", get(decisions::list::<S>))
}
