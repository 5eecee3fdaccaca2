use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use codeloom_core::error::{CodeloomError, Result};
use codeloom_core::types::RunId;

use crate::state::WorkflowState;

/// One persisted snapshot: the state as of the run's last completed step.
#[derive(Debug, Clone)]
pub struct CheckpointRecord {
    pub run_id: RunId,
    /// The step whose application produced this snapshot.
    pub step: String,
    pub state: WorkflowState,
    pub updated_at: DateTime<Utc>,
}

/// Durable per-run state snapshots, backed by SQLite.
///
/// One row per run, upserted after every step. The connection lock
/// serializes writes, so checkpoint N for a run is durable before
/// checkpoint N+1 is observable; distinct runs need no ordering.
pub struct CheckpointStore {
    conn: Mutex<Connection>,
}

impl CheckpointStore {
    /// Open or create the checkpoint database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CodeloomError::Checkpoint(format!("failed to create checkpoint directory: {e}"))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| CodeloomError::Checkpoint(format!("failed to open store: {e}")))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;

             CREATE TABLE IF NOT EXISTS checkpoints (
                 run_id TEXT PRIMARY KEY,
                 step TEXT NOT NULL,
                 state_json TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );",
        )
        .map_err(|e| CodeloomError::Checkpoint(format!("failed to initialize schema: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Upsert the snapshot for a run.
    pub fn save(&self, run_id: &RunId, step: &str, state: &WorkflowState) -> Result<()> {
        let state_json = serde_json::to_string(state)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO checkpoints (run_id, step, state_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id.0, step, state_json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| CodeloomError::Checkpoint(format!("failed to save checkpoint: {e}")))?;
        Ok(())
    }

    /// Load the snapshot for a run, if any.
    pub fn load(&self, run_id: &RunId) -> Result<Option<CheckpointRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, step, state_json, updated_at
                 FROM checkpoints WHERE run_id = ?1",
            )
            .map_err(|e| CodeloomError::Checkpoint(format!("failed to prepare query: {e}")))?;

        let row = stmt
            .query_row(params![run_id.0], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .ok();

        row.map(Self::record_from_row).transpose()
    }

    /// All checkpointed runs, most recently updated first.
    pub fn list(&self) -> Result<Vec<CheckpointRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, step, state_json, updated_at
                 FROM checkpoints ORDER BY updated_at DESC",
            )
            .map_err(|e| CodeloomError::Checkpoint(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| CodeloomError::Checkpoint(format!("failed to list checkpoints: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let row =
                row.map_err(|e| CodeloomError::Checkpoint(format!("failed to read row: {e}")))?;
            records.push(Self::record_from_row(row)?);
        }
        Ok(records)
    }

    /// Delete a run's snapshot. Returns the number of rows removed.
    pub fn delete(&self, run_id: &RunId) -> Result<usize> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM checkpoints WHERE run_id = ?1",
            params![run_id.0],
        )
        .map_err(|e| CodeloomError::Checkpoint(format!("failed to delete checkpoint: {e}")))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CodeloomError::Checkpoint(e.to_string()))
    }

    fn record_from_row(
        (run_id, step, state_json, updated_at): (String, String, String, String),
    ) -> Result<CheckpointRecord> {
        let state: WorkflowState = serde_json::from_str(&state_json)?;
        Ok(CheckpointRecord {
            run_id: RunId(run_id),
            step,
            state,
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
