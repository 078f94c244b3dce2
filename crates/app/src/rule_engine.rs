//! Rule engine: evaluates the rule set against one snapshot.
//!
//! Rules run strictly in declaration order against the same immutable
//! snapshot and always produce exactly one [`Decision`] each. A failing
//! predicate or action marks that rule's decision as failed and evaluation
//! moves on to the next rule.
//!
//! [`RuleEngine::evaluate_until`] additionally races every action against a
//! [`Shutdown`] signal. Actions still pending when shutdown arrives are
//! recorded as failed, so the tick keeps its one-decision-per-rule shape and
//! can be flushed right away.

use autopilot_domain::action::ActionTag;
use autopilot_domain::decision::{Decision, DecisionStatus};
use autopilot_domain::error::ActionError;
use autopilot_domain::rule::{RuleSet, Verdict};
use autopilot_domain::snapshot::SystemSnapshot;

use crate::ports::ActionExecutor;
use crate::shutdown::Shutdown;

/// Evaluates rules and hands triggered actions to an executor.
pub struct RuleEngine<X> {
    executor: X,
}

impl<X: ActionExecutor> RuleEngine<X> {
    /// Create a new engine driving the given executor.
    pub fn new(executor: X) -> Self {
        Self { executor }
    }

    /// Evaluate every rule in `rules` against `snapshot`.
    ///
    /// The returned decisions are in rule order, one per rule, all stamped
    /// with the snapshot's `taken_at`.
    pub async fn evaluate(&self, snapshot: &SystemSnapshot, rules: &RuleSet) -> Vec<Decision> {
        self.evaluate_with(snapshot, rules, None).await
    }

    /// Like [`RuleEngine::evaluate`], but gives up on pending actions once
    /// `shutdown` is triggered.
    ///
    /// Every rule still gets its decision; an abandoned action is recorded
    /// as failed.
    pub async fn evaluate_until(
        &self,
        snapshot: &SystemSnapshot,
        rules: &RuleSet,
        shutdown: &Shutdown,
    ) -> Vec<Decision> {
        self.evaluate_with(snapshot, rules, Some(shutdown)).await
    }

    async fn evaluate_with(
        &self,
        snapshot: &SystemSnapshot,
        rules: &RuleSet,
        shutdown: Option<&Shutdown>,
    ) -> Vec<Decision> {
        let mut decisions = Vec::with_capacity(rules.len());

        for rule in rules {
            let verdict = rule.verdict(snapshot);
            let status = match &verdict {
                Verdict::Triggered(action) => match self.execute(action, shutdown).await {
                    Ok(()) => {
                        tracing::info!(rule = rule.id(), %action, "rule triggered");
                        DecisionStatus::Triggered
                    }
                    Err(err) => {
                        tracing::warn!(rule = rule.id(), %action, error = %err, "action execution failed");
                        DecisionStatus::Failed
                    }
                },
                Verdict::Skipped(action) => {
                    tracing::debug!(rule = rule.id(), %action, "rule skipped");
                    DecisionStatus::Skipped
                }
                Verdict::Failed { error, .. } => {
                    tracing::warn!(rule = rule.id(), error = %error, "rule predicate failed");
                    DecisionStatus::Failed
                }
            };

            decisions.push(Decision::new(
                rule.id(),
                verdict.action().clone(),
                status,
                snapshot.taken_at,
            ));
        }

        decisions
    }

    async fn execute(
        &self,
        action: &ActionTag,
        shutdown: Option<&Shutdown>,
    ) -> Result<(), ActionError> {
        let Some(shutdown) = shutdown else {
            return self.executor.execute(action).await;
        };
        tokio::select! {
            biased;
            () = shutdown.triggered() => Err(ActionError::Cancelled(action.to_string())),
            result = self.executor.execute(action) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;
    use autopilot_domain::error::RuleError;
    use autopilot_domain::policy;
    use autopilot_domain::rule::Rule;
    use autopilot_domain::snapshot::{BatteryLevel, NetworkType};
    use std::sync::Mutex;
    use std::time::Duration;

    // ── Spy executor ───────────────────────────────────────────────

    #[derive(Default)]
    struct SpyExecutor {
        executed: Mutex<Vec<ActionTag>>,
        failing: Option<ActionTag>,
    }

    impl SpyExecutor {
        fn failing_on(action: ActionTag) -> Self {
            Self {
                executed: Mutex::default(),
                failing: Some(action),
            }
        }

        fn executed(&self) -> Vec<ActionTag> {
            self.executed.lock().unwrap().clone()
        }
    }

    impl ActionExecutor for SpyExecutor {
        async fn execute(&self, action: &ActionTag) -> Result<(), ActionError> {
            self.executed.lock().unwrap().push(action.clone());
            if self.failing.as_ref() == Some(action) {
                return Err(ActionError::Failed {
                    action: action.to_string(),
                    reason: "spy".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Never finishes an action.
    struct StuckExecutor;

    impl ActionExecutor for StuckExecutor {
        async fn execute(&self, _action: &ActionTag) -> Result<(), ActionError> {
            std::future::pending().await
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn snapshot(battery: BatteryLevel, network: NetworkType) -> SystemSnapshot {
        SystemSnapshot::builder()
            .battery_level(battery)
            .network_type(network)
            .build()
    }

    fn rule(id: &str, result: Result<bool, RuleError>) -> Rule {
        Rule::builder()
            .id(id)
            .predicate(move |_| result.clone())
            .action(ActionTag::Custom(format!("{id}_action")))
            .build()
            .unwrap()
    }

    fn summary(decisions: &[Decision]) -> Vec<(&str, &str, DecisionStatus)> {
        decisions
            .iter()
            .map(|d| (d.rule_id.as_str(), d.action_type.as_str(), d.status))
            .collect()
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_produce_power_save_and_defer_for_low_battery_on_mobile() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();

        let decisions = engine
            .evaluate(
                &snapshot(BatteryLevel::Known(15), NetworkType::Mobile),
                &rules,
            )
            .await;

        assert_eq!(
            summary(&decisions),
            vec![
                ("battery", "power_save", DecisionStatus::Triggered),
                ("network", "defer_heavy_task", DecisionStatus::Triggered),
            ]
        );
        assert_eq!(
            engine.executor.executed(),
            vec![ActionTag::PowerSave, ActionTag::DeferHeavyTask]
        );
    }

    #[tokio::test]
    async fn should_skip_battery_and_permit_heavy_task_on_wifi() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();

        let decisions = engine
            .evaluate(&snapshot(BatteryLevel::Known(80), NetworkType::Wifi), &rules)
            .await;

        assert_eq!(
            summary(&decisions),
            vec![
                ("battery", "power_save", DecisionStatus::Skipped),
                ("network", "permit_heavy_task", DecisionStatus::Triggered),
            ]
        );
        assert_eq!(engine.executor.executed(), vec![ActionTag::PermitHeavyTask]);
    }

    #[tokio::test]
    async fn should_always_decide_network_rule_even_with_unknown_telemetry() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();

        let decisions = engine
            .evaluate(&snapshot(BatteryLevel::Unknown, NetworkType::Unknown), &rules)
            .await;

        assert_eq!(
            summary(&decisions),
            vec![
                ("battery", "power_save", DecisionStatus::Skipped),
                ("network", "defer_heavy_task", DecisionStatus::Triggered),
            ]
        );
    }

    #[tokio::test]
    async fn should_keep_evaluating_after_a_failing_predicate() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = RuleSet::new(vec![
            rule("first", Ok(false)),
            rule("second", Err(RuleError::Predicate("boom".to_string()))),
            rule("third", Ok(true)),
        ])
        .unwrap();

        let decisions = engine
            .evaluate(&snapshot(BatteryLevel::Known(50), NetworkType::Wifi), &rules)
            .await;

        let statuses: Vec<DecisionStatus> = decisions.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                DecisionStatus::Skipped,
                DecisionStatus::Failed,
                DecisionStatus::Triggered,
            ]
        );
        assert_eq!(
            engine.executor.executed(),
            vec![ActionTag::Custom("third_action".to_string())]
        );
    }

    #[tokio::test]
    async fn should_keep_evaluating_after_a_panicking_predicate() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = RuleSet::new(vec![
            rule("first", Ok(true)),
            Rule::builder()
                .id("second")
                .predicate(|_| {
                    let readings: Vec<u8> = Vec::new();
                    Ok(readings[0] > 10)
                })
                .action(ActionTag::PowerSave)
                .build()
                .unwrap(),
            rule("third", Ok(true)),
        ])
        .unwrap();

        let decisions = tokio::spawn(async move {
            engine
                .evaluate(&snapshot(BatteryLevel::Known(50), NetworkType::Wifi), &rules)
                .await
        })
        .await
        .expect("evaluation should not panic");

        assert_eq!(
            summary(&decisions),
            vec![
                ("first", "first_action", DecisionStatus::Triggered),
                ("second", "power_save", DecisionStatus::Failed),
                ("third", "third_action", DecisionStatus::Triggered),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_fail_pending_actions_once_shutdown_is_triggered() {
        let engine = RuleEngine::new(StuckExecutor);
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();
        let snap = snapshot(BatteryLevel::Known(5), NetworkType::Wifi);
        let (trigger, shutdown) = shutdown::channel();

        let started = tokio::time::Instant::now();
        let (decisions, ()) = tokio::join!(engine.evaluate_until(&snap, &rules, &shutdown), async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            trigger.trigger();
        });

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(
            summary(&decisions),
            vec![
                ("battery", "power_save", DecisionStatus::Failed),
                ("network", "permit_heavy_task", DecisionStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn should_run_actions_normally_while_shutdown_is_not_requested() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();
        let (_trigger, shutdown) = shutdown::channel();

        let decisions = engine
            .evaluate_until(
                &snapshot(BatteryLevel::Known(15), NetworkType::Mobile),
                &rules,
                &shutdown,
            )
            .await;

        assert!(
            decisions
                .iter()
                .all(|d| d.status == DecisionStatus::Triggered)
        );
        assert_eq!(
            engine.executor.executed(),
            vec![ActionTag::PowerSave, ActionTag::DeferHeavyTask]
        );
    }

    #[tokio::test]
    async fn should_record_failed_decision_when_action_fails() {
        let engine = RuleEngine::new(SpyExecutor::failing_on(ActionTag::PowerSave));
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();

        let decisions = engine
            .evaluate(&snapshot(BatteryLevel::Known(5), NetworkType::Wifi), &rules)
            .await;

        assert_eq!(
            summary(&decisions),
            vec![
                ("battery", "power_save", DecisionStatus::Failed),
                ("network", "permit_heavy_task", DecisionStatus::Triggered),
            ]
        );
    }

    #[tokio::test]
    async fn should_be_deterministic_for_the_same_snapshot() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();
        let snap = snapshot(BatteryLevel::Known(19), NetworkType::Mobile);

        let first = engine.evaluate(&snap, &rules).await;
        for _ in 0..10 {
            assert_eq!(engine.evaluate(&snap, &rules).await, first);
        }
    }

    #[tokio::test]
    async fn should_stamp_decisions_with_snapshot_time() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let rules = policy::baseline(policy::DEFAULT_BATTERY_LOW_THRESHOLD).unwrap();
        let snap = snapshot(BatteryLevel::Known(50), NetworkType::Wifi);

        let decisions = engine.evaluate(&snap, &rules).await;

        assert!(decisions.iter().all(|d| d.timestamp == snap.taken_at));
    }

    #[tokio::test]
    async fn should_return_no_decisions_for_empty_rule_set() {
        let engine = RuleEngine::new(SpyExecutor::default());
        let decisions = engine
            .evaluate(
                &snapshot(BatteryLevel::Known(50), NetworkType::Wifi),
                &RuleSet::default(),
            )
            .await;
        assert!(decisions.is_empty());
    }
}
