//! `GET /api/decisions`: filtered read of the decision log.
//!
//! Query parameters mirror [`DecisionFilter`]: `rule_id`, `status`,
//! `since` (RFC 3339) and `limit`.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};

use autopilot_app::ports::DecisionStore;
use autopilot_domain::decision::{Decision, DecisionFilter};

use crate::error::ApiError;
use crate::state::AppState;

/// Applied when the request names no `limit`.
pub const DEFAULT_LIMIT: usize = 100;
/// Upper bound on `limit`.
pub const MAX_LIMIT: usize = 1_000;

pub enum ListResponse {
    Ok(Json<Vec<Decision>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

pub async fn list<S>(
    State(state): State<AppState<S>>,
    Query(mut filter): Query<DecisionFilter>,
) -> Result<ListResponse, ApiError>
where
    S: DecisionStore + Send + Sync + 'static,
{
    filter.limit = Some(filter.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT));
    let decisions = state.store.query(&filter).await?;
    Ok(ListResponse::Ok(Json(decisions)))
}
