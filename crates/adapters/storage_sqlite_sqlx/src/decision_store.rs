//! `SQLite` implementation of [`DecisionStore`].

use chrono::SecondsFormat;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use autopilot_app::ports::DecisionStore;
use autopilot_domain::decision::{Decision, DecisionFilter, DecisionStatus};
use autopilot_domain::error::AutopilotError;
use autopilot_domain::snapshot::SystemSnapshot;
use autopilot_domain::state::{LoopStatus, OrchestratorState, StateType};
use autopilot_domain::time::{self, Timestamp};

use crate::error::StorageError;

/// Fixed-width RFC 3339 so lexical order in SQL matches time order.
fn format_timestamp(timestamp: Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

struct DecisionRow(Decision);

impl<'r> FromRow<'r, SqliteRow> for DecisionRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let rule_id: String = row.try_get("rule_id")?;
        let action_type: String = row.try_get("action_type")?;
        let status: String = row.try_get("status")?;
        let timestamp: String = row.try_get("timestamp")?;

        let status: DecisionStatus = status
            .parse()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Decision::new(
            rule_id,
            action_type.into(),
            status,
            parse_timestamp(&timestamp)?,
        )))
    }
}

struct StateRow(OrchestratorState);

impl<'r> FromRow<'r, SqliteRow> for StateRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let state_type: String = row.try_get("state_type")?;
        let timestamp: String = row.try_get("timestamp")?;
        let state_data: String = row.try_get("state_data")?;

        let state_type: StateType = serde_json::from_str(&format!("\"{state_type}\""))
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let state_data: serde_json::Value =
            serde_json::from_str(&state_data).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(OrchestratorState {
            state_type,
            timestamp: parse_timestamp(&timestamp)?,
            state_data,
        }))
    }
}

const INSERT_DECISION: &str = r"
    INSERT INTO decisions (timestamp, rule_id, action_type, status)
    VALUES (?, ?, ?, ?)
";

// The inner query keeps the newest `limit` matches (-1 means no limit),
// the outer one puts them back in insertion order.
const SELECT_DECISIONS: &str = r"
    SELECT timestamp, rule_id, action_type, status FROM (
        SELECT id, timestamp, rule_id, action_type, status
        FROM decisions
        WHERE (?1 IS NULL OR rule_id = ?1)
          AND (?2 IS NULL OR status = ?2)
          AND (?3 IS NULL OR timestamp >= ?3)
        ORDER BY id DESC
        LIMIT ?4
    )
    ORDER BY id ASC
";

const UPSERT_STATE: &str = r"
    INSERT INTO state (timestamp, state_type, state_data)
    VALUES (?, ?, ?)
    ON CONFLICT(state_type) DO UPDATE SET
        timestamp = excluded.timestamp,
        state_data = excluded.state_data
";

const SELECT_STATE: &str = "SELECT * FROM state WHERE state_type = ?";

/// `SQLite`-backed decision log and state slots.
#[derive(Clone)]
pub struct SqliteDecisionStore {
    pool: SqlitePool,
}

impl SqliteDecisionStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn write_state(
        &self,
        state_type: StateType,
        timestamp: Timestamp,
        data: serde_json::Value,
    ) -> Result<(), StorageError> {
        let state = OrchestratorState {
            state_type,
            timestamp,
            state_data: data,
        };
        let data_json = serde_json::to_string(&state.state_data)?;

        sqlx::query(UPSERT_STATE)
            .bind(format_timestamp(state.timestamp))
            .bind(state.state_type.as_str())
            .bind(&data_json)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn read_state(
        &self,
        state_type: StateType,
    ) -> Result<Option<OrchestratorState>, StorageError> {
        let row: Option<StateRow> = sqlx::query_as(SELECT_STATE)
            .bind(state_type.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.0))
    }
}

impl DecisionStore for SqliteDecisionStore {
    async fn append(&self, decisions: &[Decision]) -> Result<(), AutopilotError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        for decision in decisions {
            sqlx::query(INSERT_DECISION)
                .bind(format_timestamp(decision.timestamp))
                .bind(&decision.rule_id)
                .bind(decision.action_type.as_str())
                .bind(decision.status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(count = decisions.len(), "decisions appended");

        Ok(())
    }

    async fn record_snapshot(&self, snapshot: &SystemSnapshot) -> Result<(), AutopilotError> {
        let data = serde_json::to_value(snapshot).map_err(StorageError::from)?;
        self.write_state(StateType::Snapshot, snapshot.taken_at, data)
            .await?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<SystemSnapshot>, AutopilotError> {
        let Some(state) = self.read_state(StateType::Snapshot).await? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_value(state.state_data).map_err(StorageError::from)?;
        Ok(Some(snapshot))
    }

    async fn query(&self, filter: &DecisionFilter) -> Result<Vec<Decision>, AutopilotError> {
        let limit = filter
            .limit
            .map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));

        let rows: Vec<DecisionRow> = sqlx::query_as(SELECT_DECISIONS)
            .bind(filter.rule_id.as_deref())
            .bind(filter.status.map(DecisionStatus::as_str))
            .bind(filter.since.map(format_timestamp))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn record_loop_status(&self, status: &LoopStatus) -> Result<(), AutopilotError> {
        let data = serde_json::to_value(status).map_err(StorageError::from)?;
        self.write_state(StateType::LoopStatus, time::now(), data)
            .await?;
        Ok(())
    }

    async fn loop_status(&self) -> Result<Option<LoopStatus>, AutopilotError> {
        let Some(state) = self.read_state(StateType::LoopStatus).await? else {
            return Ok(None);
        };
        let status = serde_json::from_value(state.state_data).map_err(StorageError::from)?;
        Ok(Some(status))
    }
}
