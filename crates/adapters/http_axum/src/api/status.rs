//! `GET /api/status`: what the loop saw last and how it is doing.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use autopilot_app::ports::DecisionStore;
use autopilot_domain::snapshot::SystemSnapshot;
use autopilot_domain::state::LoopStatus;
use autopilot_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusBody {
    /// Time of the latest snapshot, `null` before the first tick.
    pub last_updated: Option<Timestamp>,
    pub snapshot: Option<SystemSnapshot>,
    pub loop_status: Option<LoopStatus>,
}

pub enum GetResponse {
    Ok(Json<StatusBody>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            // Always reflects the current loop, never a cached copy.
            Self::Ok(json) => ([(header::CACHE_CONTROL, "no-store")], json).into_response(),
        }
    }
}

pub async fn get<S>(State(state): State<AppState<S>>) -> Result<GetResponse, ApiError>
where
    S: DecisionStore + Send + Sync + 'static,
{
    let snapshot = state.store.latest().await?;
    let loop_status = state.store.loop_status().await?;
    Ok(GetResponse::Ok(Json(StatusBody {
        last_updated: snapshot.map(|s| s.taken_at),
        snapshot,
        loop_status,
    })))
}
