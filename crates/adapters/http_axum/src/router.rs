//! Axum router assembly.

use axum::Router;
use axum::http::{Method, header};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use autopilot_app::ports::DecisionStore;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api`. Includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level, and a [`CorsLayer`]
/// that allows read-only requests from any origin.
pub fn build<S>(state: AppState<S>) -> Router
where
    S: DecisionStore + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use std::sync::Mutex;
    use tower::ServiceExt;

    use autopilot_domain::action::ActionTag;
    use autopilot_domain::decision::{Decision, DecisionFilter, DecisionStatus};
    use autopilot_domain::error::AutopilotError;
    use autopilot_domain::snapshot::{BatteryLevel, NetworkType, SystemSnapshot};
    use autopilot_domain::state::{LoopState, LoopStatus};

    #[derive(Default)]
    struct StubStore {
        decisions: Vec<Decision>,
        latest: Option<SystemSnapshot>,
        status: Option<LoopStatus>,
        last_filter: Mutex<Option<DecisionFilter>>,
        broken: bool,
    }

    impl DecisionStore for StubStore {
        async fn append(&self, _decisions: &[Decision]) -> Result<(), AutopilotError> {
            Ok(())
        }
        async fn record_snapshot(&self, _snapshot: &SystemSnapshot) -> Result<(), AutopilotError> {
            Ok(())
        }
        async fn latest(&self) -> Result<Option<SystemSnapshot>, AutopilotError> {
            if self.broken {
                return Err(AutopilotError::Storage("database is locked".into()));
            }
            Ok(self.latest)
        }
        async fn query(&self, filter: &DecisionFilter) -> Result<Vec<Decision>, AutopilotError> {
            *self.last_filter.lock().unwrap() = Some(filter.clone());
            Ok(self
                .decisions
                .iter()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect())
        }
        async fn record_loop_status(&self, _status: &LoopStatus) -> Result<(), AutopilotError> {
            Ok(())
        }
        async fn loop_status(&self) -> Result<Option<LoopStatus>, AutopilotError> {
            Ok(self.status.clone())
        }
    }

    fn populated() -> StubStore {
        let snapshot = SystemSnapshot::builder()
            .taken_at("2026-03-01T12:00:00Z".parse().unwrap())
            .battery_level(BatteryLevel::Known(15))
            .network_type(NetworkType::Mobile)
            .build();
        StubStore {
            decisions: vec![
                Decision::new(
                    "battery",
                    ActionTag::PowerSave,
                    DecisionStatus::Triggered,
                    snapshot.taken_at,
                ),
                Decision::new(
                    "network",
                    ActionTag::DeferHeavyTask,
                    DecisionStatus::Triggered,
                    snapshot.taken_at,
                ),
            ],
            latest: Some(snapshot),
            status: Some(LoopStatus {
                state: LoopState::Sleeping,
                ticks: 1,
                ..LoopStatus::default()
            }),
            ..StubStore::default()
        }
    }

    async fn get(store: StubStore, uri: &str) -> (Response<Body>, AppState<StubStore>) {
        let state = AppState::new(store);
        let response = build(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        (response, state)
    }

    async fn json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let (response, _) = get(StubStore::default(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_return_status_without_caching() {
        let (response, _) = get(populated(), "/api/status").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let body = json(response).await;
        assert_eq!(body["snapshot"]["battery_level"], 15);
        assert_eq!(body["snapshot"]["network_type"], "mobile");
        assert_eq!(body["loop_status"]["state"], "sleeping");
        assert_eq!(body["last_updated"], body["snapshot"]["taken_at"]);
    }

    #[tokio::test]
    async fn should_return_nulls_before_first_tick() {
        let (response, _) = get(StubStore::default(), "/api/status").await;

        let body = json(response).await;
        assert!(body["snapshot"].is_null());
        assert!(body["loop_status"].is_null());
        assert!(body["last_updated"].is_null());
    }

    #[tokio::test]
    async fn should_list_decisions_with_default_limit() {
        let (response, state) = get(populated(), "/api/decisions").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["rule_id"], "battery");
        assert_eq!(body[0]["action_type"], "power_save");
        assert_eq!(body[0]["status"], "triggered");

        let filter = state.store.last_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.limit, Some(crate::api::decisions::DEFAULT_LIMIT));
    }

    #[tokio::test]
    async fn should_pass_query_filter_to_store() {
        let (response, state) = get(
            populated(),
            "/api/decisions?rule_id=network&status=triggered&since=2026-03-01T00:00:00Z&limit=5000",
        )
        .await;

        let body = json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["rule_id"], "network");

        let filter = state.store.last_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.rule_id.as_deref(), Some("network"));
        assert_eq!(filter.status, Some(DecisionStatus::Triggered));
        assert!(filter.since.is_some());
        assert_eq!(filter.limit, Some(crate::api::decisions::MAX_LIMIT));
    }

    #[tokio::test]
    async fn should_reject_unknown_status_filter() {
        let (response, _) = get(populated(), "/api/decisions?status=exploded").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_map_storage_failure_to_500() {
        let store = StubStore {
            broken: true,
            ..StubStore::default()
        };
        let (response, _) = get(store, "/api/status").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(response).await;
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn should_allow_cross_origin_reads() {
        let state = AppState::new(StubStore::default());
        let response = build(state)
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .header(header::ORIGIN, "https://dashboard.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
