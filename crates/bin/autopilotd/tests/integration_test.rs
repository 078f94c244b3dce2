//! End-to-end tests for the full autopilotd stack.
//!
//! Each test wires the real pieces together (file-backed `SQLite`, the
//! control loop, the virtual device, the axum router) and drives them in
//! real time with a short loop interval. HTTP is exercised via
//! `tower::ServiceExt::oneshot`, so no TCP port is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio::time::Instant;
use tower::ServiceExt;

use autopilot_adapter_http_axum::router;
use autopilot_adapter_http_axum::state::AppState;
use autopilot_adapter_storage_sqlite_sqlx::{Config, Database, SqliteDecisionStore};
use autopilot_adapter_termux::HookExecutor;
use autopilot_adapter_virtual::{Reading, RecordingActuator, VirtualDevice};
use autopilot_app::collector::TelemetryCollector;
use autopilot_app::control_loop::{ControlLoop, LoopConfig};
use autopilot_app::ports::{ActionExecutor, DecisionStore};
use autopilot_app::rule_engine::RuleEngine;
use autopilot_app::shutdown;
use autopilot_domain::action::ActionTag;
use autopilot_domain::decision::{Decision, DecisionFilter, DecisionStatus};
use autopilot_domain::policy;
use autopilot_domain::snapshot::{BatteryLevel, NetworkType};
use autopilot_domain::state::{LoopState, LoopStatus};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn database_url(dir: &TempDir) -> String {
    format!("sqlite:{}", dir.path().join("autopilot.db").display())
}

async fn open(url: &str) -> Database {
    Config {
        database_url: url.to_string(),
    }
    .build()
    .await
    .expect("database should initialise")
}

fn fast_loop() -> LoopConfig {
    LoopConfig {
        interval: Duration::from_millis(50),
        probe_timeout: Duration::from_millis(20),
        store_attempts: 3,
        retry_backoff: Duration::from_millis(10),
    }
}

/// A running loop plus the handles needed to stop and inspect it.
struct Running {
    trigger: shutdown::ShutdownTrigger,
    handle: tokio::task::JoinHandle<LoopStatus>,
}

fn start(
    device: &VirtualDevice,
    actuator: &RecordingActuator,
    store: &Arc<SqliteDecisionStore>,
) -> Running {
    start_with(device, actuator.clone(), store)
}

fn start_with<X>(device: &VirtualDevice, executor: X, store: &Arc<SqliteDecisionStore>) -> Running
where
    X: ActionExecutor + Send + Sync + 'static,
{
    let control = ControlLoop::new(
        TelemetryCollector::new(device.clone(), device.clone()),
        RuleEngine::new(executor),
        Arc::clone(store),
        policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap(),
        fast_loop(),
    );
    let (trigger, shutdown) = shutdown::channel();
    let handle = tokio::spawn(control.run(shutdown));
    Running { trigger, handle }
}

impl Running {
    /// Request shutdown and wait for the loop, failing if it takes over a second.
    async fn stop(self) -> LoopStatus {
        self.trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), self.handle)
            .await
            .expect("loop should stop promptly")
            .expect("loop task should not panic")
    }
}

async fn wait_for_decisions(store: &SqliteDecisionStore, at_least: usize) -> Vec<Decision> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let decisions = store.query(&DecisionFilter::all()).await.unwrap();
        if decisions.len() >= at_least {
            return decisions;
        }
        assert!(
            Instant::now() < deadline,
            "only {} decisions recorded",
            decisions.len()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_record_low_battery_mobile_decisions_and_stop_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&database_url(&dir)).await;
    let store = Arc::new(db.decision_store());
    let device = VirtualDevice::new(Some(15), NetworkType::Mobile);
    let actuator = RecordingActuator::new();

    let running = start(&device, &actuator, &store);
    let decisions = wait_for_decisions(&store, 4).await;
    let status = running.stop().await;

    let first_tick: Vec<(&str, &str, DecisionStatus)> = decisions[..2]
        .iter()
        .map(|d| (d.rule_id.as_str(), d.action_type.as_str(), d.status))
        .collect();
    assert_eq!(
        first_tick,
        vec![
            ("battery", "power_save", DecisionStatus::Triggered),
            ("network", "defer_heavy_task", DecisionStatus::Triggered),
        ]
    );
    assert_eq!(status.state, LoopState::Stopped);
    assert!(status.ticks >= 2);
    assert_eq!(status.failed_ticks, 0);
    assert_eq!(
        &actuator.executed()[..2],
        &[ActionTag::PowerSave, ActionTag::DeferHeavyTask]
    );

    let persisted = store.loop_status().await.unwrap().unwrap();
    assert_eq!(persisted.state, LoopState::Stopped);
    assert_eq!(persisted.ticks, status.ticks);
}

#[tokio::test]
async fn should_keep_ticking_when_a_probe_hangs() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&database_url(&dir)).await;
    let store = Arc::new(db.decision_store());
    let device = VirtualDevice::new(Some(80), NetworkType::Wifi);
    device.set_battery(Reading::Hang);

    let running = start(&device, &RecordingActuator::new(), &store);
    let decisions = wait_for_decisions(&store, 4).await;
    running.stop().await;

    let battery: Vec<&Decision> = decisions.iter().filter(|d| d.rule_id == "battery").collect();
    assert!(battery.iter().all(|d| d.status == DecisionStatus::Skipped));
    let latest = store.latest().await.unwrap().unwrap();
    assert_eq!(latest.battery_level, BatteryLevel::Unknown);
    assert_eq!(latest.network_type, NetworkType::Wifi);
}

#[tokio::test]
async fn should_record_failed_decision_when_action_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&database_url(&dir)).await;
    let store = Arc::new(db.decision_store());
    let device = VirtualDevice::new(Some(90), NetworkType::Wifi);
    let actuator = RecordingActuator::new();
    actuator.fail_on(ActionTag::PermitHeavyTask);

    let running = start(&device, &actuator, &store);
    let decisions = wait_for_decisions(&store, 2).await;
    let status = running.stop().await;

    assert_eq!(decisions[0].status, DecisionStatus::Skipped);
    assert_eq!(decisions[1].action_type, ActionTag::PermitHeavyTask);
    assert_eq!(decisions[1].status, DecisionStatus::Failed);
    // A failed action is a recorded outcome, not a failed tick.
    assert_eq!(status.failed_ticks, 0);
}

#[tokio::test]
async fn should_stop_promptly_while_an_action_hook_hangs() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&database_url(&dir)).await;
    let store = Arc::new(db.decision_store());
    let device = VirtualDevice::new(Some(90), NetworkType::Wifi);
    let executor = HookExecutor::default().with_hook(ActionTag::PermitHeavyTask, "sleep 30");

    let running = start_with(&device, executor, &store);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!running.handle.is_finished());
    let status = running.stop().await;

    assert_eq!(status.state, LoopState::Stopped);
    assert_eq!(status.ticks, 1);
    let decisions = store.query(&DecisionFilter::all()).await.unwrap();
    let outcome: Vec<(&str, &str, DecisionStatus)> = decisions
        .iter()
        .map(|d| (d.rule_id.as_str(), d.action_type.as_str(), d.status))
        .collect();
    assert_eq!(
        outcome,
        vec![
            ("battery", "power_save", DecisionStatus::Skipped),
            ("network", "permit_heavy_task", DecisionStatus::Failed),
        ]
    );
}

#[tokio::test]
async fn should_keep_decisions_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let url = database_url(&dir);

    let recorded = {
        let db = open(&url).await;
        let store = Arc::new(db.decision_store());
        let running = start(&VirtualDevice::default(), &RecordingActuator::new(), &store);
        wait_for_decisions(&store, 6).await;
        running.stop().await;
        let recorded = store.query(&DecisionFilter::all()).await.unwrap();
        db.close().await;
        recorded
    };

    let db = open(&url).await;
    let reread = db
        .decision_store()
        .query(&DecisionFilter::all())
        .await
        .unwrap();
    assert_eq!(reread, recorded);
}

// ---------------------------------------------------------------------------
// Status API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&database_url(&dir)).await;
    let app = router::build(AppState::new(db.decision_store()));

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn should_expose_loop_results_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&database_url(&dir)).await;
    let store = Arc::new(db.decision_store());
    let device = VirtualDevice::new(Some(15), NetworkType::Mobile);

    let running = start(&device, &RecordingActuator::new(), &store);
    wait_for_decisions(&store, 2).await;
    running.stop().await;

    let app = router::build(AppState::from_arc(Arc::clone(&store)));

    let (status, body) = get_json(app.clone(), "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["battery_level"], 15);
    assert_eq!(body["snapshot"]["network_type"], "mobile");
    assert_eq!(body["loop_status"]["state"], "stopped");

    let (status, body) = get_json(app, "/api/decisions?rule_id=battery&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    let decisions = body.as_array().unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0]["rule_id"], "battery");
    assert_eq!(decisions[0]["action_type"], "power_save");
    assert_eq!(decisions[0]["status"], "triggered");
}
