//! Control loop: collect → evaluate → record, once per interval.
//!
//! The loop owns every collaborator it needs (collector, engine, store,
//! rules, configuration); there is no process-wide state. Ticks run one at
//! a time on the calling task. The suspension points that observe
//! [`Shutdown`] are the probe wait, action execution and the inter-tick
//! sleep.
//!
//! Decision timestamps never go backwards: if the wall clock steps back, a
//! tick is stamped with the previous tick's time instead.
//!
//! ```text
//! Idle → Collecting → Evaluating → Recording → Sleeping → Idle
//!   └──────────────── any ─────────────────────────→ Stopped
//! ```

use std::time::Duration;

use tokio::time::Instant;

use autopilot_domain::decision::{Decision, DecisionStatus};
use autopilot_domain::error::AutopilotError;
use autopilot_domain::id::TickId;
use autopilot_domain::rule::RuleSet;
use autopilot_domain::snapshot::SystemSnapshot;
use autopilot_domain::state::{LoopState, LoopStatus};
use autopilot_domain::time::Timestamp;

use crate::collector::TelemetryCollector;
use crate::ports::{ActionExecutor, BatteryProbe, DecisionStore, NetworkProbe};
use crate::rule_engine::RuleEngine;
use crate::shutdown::Shutdown;

/// Timing and retry knobs of the loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Time between tick starts.
    pub interval: Duration,
    /// Upper bound for each telemetry probe.
    pub probe_timeout: Duration,
    /// How many times a decision batch is offered to the store before it
    /// is reported as lost. At least one attempt is always made.
    pub store_attempts: u32,
    /// Delay before the first retry; doubled after every further failure.
    pub retry_backoff: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            store_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// What a tick achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Decisions were durably appended.
    Recorded {
        decisions: usize,
        triggered: usize,
        partial_telemetry: bool,
    },
    /// Shutdown arrived before any decision was produced.
    Abandoned,
}

/// A tick that could not complete.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The store rejected the batch on every attempt.
    #[error("{count} decisions lost after {attempts} append attempts")]
    DecisionsLost {
        count: usize,
        attempts: u32,
        #[source]
        source: AutopilotError,
    },
}

/// The device automation loop.
pub struct ControlLoop<B, N, X, S> {
    collector: TelemetryCollector<B, N>,
    engine: RuleEngine<X>,
    store: S,
    rules: RuleSet,
    config: LoopConfig,
    status: LoopStatus,
    /// Latest `taken_at` ever recorded, including by a previous run.
    stamp_floor: Option<Timestamp>,
}

impl<B, N, X, S> ControlLoop<B, N, X, S>
where
    B: BatteryProbe,
    N: NetworkProbe,
    X: ActionExecutor,
    S: DecisionStore,
{
    /// Assemble a loop from its collaborators.
    pub fn new(
        collector: TelemetryCollector<B, N>,
        engine: RuleEngine<X>,
        store: S,
        rules: RuleSet,
        config: LoopConfig,
    ) -> Self {
        Self {
            collector,
            engine,
            store,
            rules,
            config,
            status: LoopStatus::default(),
            stamp_floor: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.status.state
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn status(&self) -> &LoopStatus {
        &self.status
    }

    /// Run ticks until `shutdown` is triggered, then return the final status.
    ///
    /// A failed tick is logged and counted; it never ends the loop. Once
    /// shutdown is observed no new tick starts, and decisions already produced
    /// by the running tick are flushed before this returns.
    pub async fn run(mut self, shutdown: Shutdown) -> LoopStatus {
        tracing::info!(
            interval_secs = self.config.interval.as_secs_f64(),
            probe_timeout_secs = self.config.probe_timeout.as_secs_f64(),
            rules = self.rules.len(),
            "control loop started"
        );

        match self.store.loop_status().await {
            Ok(previous) => self.stamp_floor = previous.and_then(|status| status.last_tick_at),
            Err(err) => tracing::warn!(error = %err, "failed to read previous loop status"),
        }

        while !shutdown.is_triggered() {
            let started = Instant::now();
            let tick_id = TickId::generate();

            match self.tick(tick_id, &shutdown).await {
                Ok(TickOutcome::Abandoned) => break,
                Ok(_) => {}
                Err(err) => {
                    self.status.failed_ticks += 1;
                    self.status.last_error = Some(err.to_string());
                    tracing::error!(%tick_id, error = %err, "tick failed");
                }
            }
            self.persist_status().await;

            if shutdown.is_triggered() {
                break;
            }

            self.transition(LoopState::Sleeping);
            let deadline = started + self.config.interval;
            if Instant::now() >= deadline {
                tracing::warn!(
                    %tick_id,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "tick overran the interval, starting next tick immediately"
                );
            }
            tokio::select! {
                biased;
                () = shutdown.triggered() => break,
                () = tokio::time::sleep_until(deadline) => {}
            }
            self.transition(LoopState::Idle);
        }

        self.transition(LoopState::Stopped);
        self.persist_status().await;
        tracing::info!(
            ticks = self.status.ticks,
            failed_ticks = self.status.failed_ticks,
            lost_batches = self.status.lost_batches,
            "control loop stopped"
        );
        self.status
    }

    /// One collect → evaluate → record pass.
    #[tracing::instrument(skip_all, fields(tick_id = %tick_id))]
    async fn tick(
        &mut self,
        tick_id: TickId,
        shutdown: &Shutdown,
    ) -> Result<TickOutcome, TickError> {
        self.status.ticks += 1;
        self.status.last_tick_id = Some(tick_id);

        self.transition(LoopState::Collecting);
        let collection = self
            .collector
            .collect(self.config.probe_timeout, shutdown)
            .await;
        if shutdown.is_triggered() {
            tracing::info!("shutdown during collection, tick abandoned");
            return Ok(TickOutcome::Abandoned);
        }
        let snapshot = not_before(collection.snapshot, self.stamp_floor);
        self.stamp_floor = Some(snapshot.taken_at);
        self.status.last_tick_at = Some(snapshot.taken_at);

        if let Err(err) = self.store.record_snapshot(&snapshot).await {
            tracing::warn!(error = %err, "failed to record latest snapshot");
        }

        self.transition(LoopState::Evaluating);
        let decisions = self
            .engine
            .evaluate_until(&snapshot, &self.rules, shutdown)
            .await;

        self.transition(LoopState::Recording);
        self.append_with_retry(&decisions).await?;

        let triggered = decisions
            .iter()
            .filter(|d| d.status == DecisionStatus::Triggered)
            .count();
        tracing::info!(
            battery = %snapshot.battery_level,
            network = %snapshot.network_type,
            decisions = decisions.len(),
            triggered,
            "tick recorded"
        );

        Ok(TickOutcome::Recorded {
            decisions: decisions.len(),
            triggered,
            partial_telemetry: collection.is_partial(),
        })
    }

    /// Offer `decisions` to the store until it accepts them or attempts run out.
    async fn append_with_retry(&mut self, decisions: &[Decision]) -> Result<(), TickError> {
        if decisions.is_empty() {
            return Ok(());
        }

        let attempts = self.config.store_attempts.max(1);
        let mut backoff = self.config.retry_backoff;
        let mut attempt = 1;
        loop {
            match self.store.append(decisions).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        error = %err,
                        "failed to append decisions, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(err) => {
                    self.status.lost_batches += 1;
                    tracing::error!(
                        ?decisions,
                        error = %err,
                        "decision batch could not be stored and is lost"
                    );
                    return Err(TickError::DecisionsLost {
                        count: decisions.len(),
                        attempts,
                        source: err,
                    });
                }
            }
        }
    }

    async fn persist_status(&self) {
        if let Err(err) = self.store.record_loop_status(&self.status).await {
            tracing::warn!(error = %err, "failed to record loop status");
        }
    }

    fn transition(&mut self, next: LoopState) {
        let current = self.status.state;
        debug_assert!(
            current.can_transition_to(next),
            "invalid loop transition {current} -> {next}"
        );
        tracing::trace!(from = %current, to = %next, "loop transition");
        self.status.state = next;
    }
}

/// Move `snapshot` forward to `floor` when the clock reads earlier than it.
fn not_before(snapshot: SystemSnapshot, floor: Option<Timestamp>) -> SystemSnapshot {
    match floor {
        Some(floor) if snapshot.taken_at < floor => {
            tracing::warn!(
                clock = %snapshot.taken_at,
                floor = %floor,
                "wall clock went backwards, reusing previous tick time"
            );
            SystemSnapshot {
                taken_at: floor,
                ..snapshot
            }
        }
        _ => snapshot,
    }
}
