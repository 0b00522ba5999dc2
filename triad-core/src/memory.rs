//! # Interaction Log
//!
//! Append-only SQLite log of every agent reply. One row per successful
//! agent turn, never updated or deleted, read back most-recent-first.
//!
//! Every operation opens its own connection and closes it before returning,
//! so nothing is held open between a run's stages.

use crate::error::{Error, ErrorKind, Result};
use crate::role::AgentRole;
use chrono::{DateTime, FixedOffset, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, ErrorCode};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How many records `Load Memory` shows when no limit is given
pub const DEFAULT_RECENT_LIMIT: usize = 6;

/// Default database file, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "agent_memory.db";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS memory (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        agent TEXT,
        user_goal TEXT,
        output TEXT,
        timestamp TEXT
    )
";

/// One stored agent reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRecord {
    pub id: i64,
    pub agent: AgentRole,
    pub goal: String,
    pub output: String,
    /// Time as stored, offset included; rows written here are always UTC
    pub timestamp: DateTime<FixedOffset>,
}

impl InteractionRecord {
    /// Stored time without sub-second precision or offset, e.g. `2024-05-01T09:30:12`
    pub fn display_timestamp(&self) -> String {
        format_timestamp(&self.timestamp)
            .chars()
            .take(19)
            .collect()
    }
}

/// Handle to the on-disk interaction log
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
    busy_timeout: Duration,
}

impl InteractionLog {
    /// Point at `path` and make sure the table exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::from(e).with_operation("memory::open"))?;
        }

        let log = Self {
            path,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        };
        log.initialize()?;
        Ok(log)
    }

    /// How long a call waits on another writer's lock before failing with
    /// `StorageLocked`
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the `memory` table if it is missing. Safe to call repeatedly.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connect("memory::initialize")?;
        conn.execute_batch(CREATE_TABLE)
            .map_err(|e| storage_error(e, "memory::initialize"))?;
        tracing::debug!(path = %self.path.display(), "interaction log ready");
        Ok(())
    }

    /// Store one agent reply stamped with the current UTC time
    pub fn append(&self, agent: AgentRole, goal: &str, output: &str) -> Result<InteractionRecord> {
        // same precision as the stored text
        let timestamp = Utc::now().trunc_subsecs(6).fixed_offset();
        let conn = self.connect("memory::append")?;
        conn.execute(
            "INSERT INTO memory (agent, user_goal, output, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![agent.name(), goal, output, format_timestamp(&timestamp)],
        )
        .map_err(|e| storage_error(e, "memory::append").with_context("agent", agent.name()))?;

        let id = conn.last_insert_rowid();
        tracing::debug!(id, agent = %agent, "interaction stored");

        Ok(InteractionRecord {
            id,
            agent,
            goal: goal.to_string(),
            output: output.to_string(),
            timestamp,
        })
    }

    /// Up to `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<InteractionRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.connect("memory::recent")?;
        let mut stmt = conn
            .prepare(
                "SELECT id, agent, user_goal, output, timestamp FROM memory ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| storage_error(e, "memory::recent"))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(RawRecord {
                    id: row.get(0)?,
                    agent: row.get(1)?,
                    goal: row.get(2)?,
                    output: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })
            .map_err(|e| storage_error(e, "memory::recent"))?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| storage_error(e, "memory::recent"))?;
            records.push(raw.into_record()?);
        }
        Ok(records)
    }

    fn connect(&self, operation: &'static str) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(|e| {
            storage_error(e, operation).with_context("path", self.path.display().to_string())
        })?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| storage_error(e, operation))?;
        Ok(conn)
    }
}

/// Row as read from SQLite, before validation
struct RawRecord {
    id: i64,
    agent: Option<String>,
    goal: Option<String>,
    output: Option<String>,
    timestamp: Option<String>,
}

impl RawRecord {
    fn into_record(self) -> Result<InteractionRecord> {
        let agent: AgentRole = self
            .agent
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|e: Error| corrupt_row(self.id, "agent", e))?;

        let raw_ts = self.timestamp.unwrap_or_default();
        let timestamp = DateTime::parse_from_rfc3339(&raw_ts).map_err(|e| {
                corrupt_row(self.id, "timestamp", e).with_context("value", raw_ts.clone())
            })?;

        Ok(InteractionRecord {
            id: self.id,
            agent,
            goal: self.goal.unwrap_or_default(),
            output: self.output.unwrap_or_default(),
            timestamp,
        })
    }
}

/// ISO-8601 with microseconds and an explicit offset (`+00:00` for UTC)
fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn storage_error(err: rusqlite::Error, operation: &'static str) -> Error {
    let kind = match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => ErrorKind::StorageLocked,
        _ => ErrorKind::StorageFailed,
    };
    Error::new(kind, err.to_string())
        .with_operation(operation)
        .set_source(err)
}

fn corrupt_row(
    id: i64,
    column: &'static str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> Error {
    Error::serialization_failed(format!("unreadable {} in memory row {}", column, id))
        .with_operation("memory::recent")
        .with_context("id", id.to_string())
        .set_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_log() -> (TempDir, InteractionLog) {
        let dir = TempDir::new().unwrap();
        let log = InteractionLog::open(dir.path().join("agent_memory.db")).unwrap();
        (dir, log)
    }

    #[test]
    fn test_append_then_recent_returns_it_first() {
        let (_dir, log) = temp_log();
        log.append(AgentRole::Planner, "old goal", "old plan").unwrap();

        let stored = log.append(AgentRole::Coder, "build X", "print('x')").unwrap();
        let recent = log.recent(1).unwrap();

        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0], stored);
    }

    #[test]
    fn test_recent_is_reverse_insertion_order() {
        let (_dir, log) = temp_log();
        for (agent, output) in [
            (AgentRole::Planner, "plan"),
            (AgentRole::Context, "context"),
            (AgentRole::Coder, "code"),
        ] {
            log.append(agent, "build X", output).unwrap();
        }

        let agents: Vec<AgentRole> = log.recent(3).unwrap().into_iter().map(|r| r.agent).collect();
        assert_eq!(agents, vec![AgentRole::Coder, AgentRole::Context, AgentRole::Planner]);
    }

    #[test]
    fn test_recent_respects_limit() {
        let (_dir, log) = temp_log();
        for i in 0..8 {
            log.append(AgentRole::Planner, "goal", &format!("plan {}", i)).unwrap();
        }

        let recent = log.recent(DEFAULT_RECENT_LIMIT).unwrap();
        assert_eq!(recent.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent[0].output, "plan 7");

        // fewer only when fewer exist
        assert_eq!(log.recent(100).unwrap().len(), 8);

        let ids: Vec<i64> = log.recent(100).unwrap().iter().map(|r| r.id).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_empty_and_zero_limit() {
        let (_dir, log) = temp_log();
        assert!(log.recent(DEFAULT_RECENT_LIMIT).unwrap().is_empty());

        log.append(AgentRole::Planner, "goal", "plan").unwrap();
        assert!(log.recent(0).unwrap().is_empty());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (dir, log) = temp_log();
        log.append(AgentRole::Planner, "goal", "plan").unwrap();

        log.initialize().unwrap();
        log.initialize().unwrap();
        let reopened = InteractionLog::open(dir.path().join("agent_memory.db")).unwrap();

        assert_eq!(reopened.recent(10).unwrap().len(), 1);
        assert_eq!(log.recent(10).unwrap().len(), 1);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("memory.db");
        let log = InteractionLog::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(log.path(), path.as_path());
    }

    #[test]
    fn test_schema_and_timestamp_format() {
        let (_dir, log) = temp_log();
        let stored = log.append(AgentRole::Context, "goal", "ctx").unwrap();

        let conn = Connection::open(log.path()).unwrap();
        let (agent, goal, raw_ts): (String, String, String) = conn
            .query_row(
                "SELECT agent, user_goal, timestamp FROM memory WHERE id = ?1",
                params![stored.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();

        assert_eq!(agent, "ContextAgent");
        assert_eq!(goal, "goal");
        assert!(raw_ts.ends_with("+00:00"), "{}", raw_ts);
        assert_eq!(raw_ts.len(), "2024-05-01T09:30:12.123456+00:00".len());
        assert_eq!(stored.display_timestamp(), &raw_ts[..19]);
    }

    #[test]
    fn test_reads_rows_written_by_other_tools() {
        let (_dir, log) = temp_log();
        let conn = Connection::open(log.path()).unwrap();
        conn.execute(
            "INSERT INTO memory (agent, user_goal, output, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params!["PlannerAgent", "g", "p", "2024-05-01T09:30:12.654321+00:00"],
        )
        .unwrap();

        let records = log.recent(1).unwrap();
        assert_eq!(records[0].agent, AgentRole::Planner);
        assert_eq!(records[0].display_timestamp(), "2024-05-01T09:30:12");
    }

    #[test]
    fn test_unknown_agent_row_is_reported() {
        let (_dir, log) = temp_log();
        let conn = Connection::open(log.path()).unwrap();
        conn.execute(
            "INSERT INTO memory (agent, user_goal, output, timestamp) VALUES ('Ghost', 'g', 'o', '2024-05-01T09:30:12+00:00')",
            [],
        )
        .unwrap();

        let err = log.recent(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SerializationFailed);
    }

    #[test]
    fn test_unreachable_store_is_storage_error() {
        let dir = TempDir::new().unwrap();
        // a directory can't be opened as a database file
        let log = InteractionLog {
            path: dir.path().to_path_buf(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        };

        let err = log.append(AgentRole::Planner, "g", "p").unwrap_err();
        assert!(err.is_storage());
        assert_eq!(err.operation(), "memory::append");
    }

    #[test]
    fn test_display_keeps_stored_offset() {
        let (_dir, log) = temp_log();
        let conn = Connection::open(log.path()).unwrap();
        conn.execute(
            "INSERT INTO memory (agent, user_goal, output, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params!["CoderAgent", "g", "x", "2024-05-01T23:30:12.000001+02:00"],
        )
        .unwrap();

        let record = log.recent(1).unwrap().remove(0);
        // wall-clock time as written, not shifted to UTC
        assert_eq!(record.display_timestamp(), "2024-05-01T23:30:12");
        assert_eq!(record.timestamp.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_locked_store_is_reported_and_nothing_written() {
        let (_dir, log) = temp_log();
        let log = log.with_busy_timeout(Duration::from_millis(50));

        let holder = Connection::open(log.path()).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let err = log.append(AgentRole::Planner, "g", "p").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageLocked);
        assert!(err.is_storage());
        assert!(err.is_retryable());

        holder.execute_batch("ROLLBACK").unwrap();
        drop(holder);
        assert!(log.recent(10).unwrap().is_empty());
    }
}
