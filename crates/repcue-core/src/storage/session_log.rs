//! Completed workout sessions.
//!
//! When playback completes the player keeps a [`SessionSummary`]. Once the
//! user rates the session the summary becomes a [`SessionRecord`] and goes to
//! a [`SessionLogSink`]; [`SessionLog`] keeps records in SQLite.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, ValidationError};

/// Timing of a finished session, before the user rates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_sec: f64,
}

/// Subjective ratings collected after a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFeedback {
    /// Rate of perceived exertion, 1..=10.
    pub rpe: Option<u8>,
    /// 0..=10.
    pub pain_score: Option<u8>,
    pub pain_location: Option<String>,
}

impl SessionFeedback {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(rpe) = self.rpe {
            if !(1..=10).contains(&rpe) {
                return Err(ValidationError::OutOfRange {
                    field: "rpe",
                    min: 1,
                    max: 10,
                    value: rpe,
                });
            }
        }
        if let Some(pain) = self.pain_score {
            if pain > 10 {
                return Err(ValidationError::OutOfRange {
                    field: "painScore",
                    min: 0,
                    max: 10,
                    value: pain,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub project_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_sec: f64,
    pub rpe: Option<u8>,
    pub pain_score: Option<u8>,
    pub pain_location: Option<String>,
}

impl SessionRecord {
    pub fn new(project_id: &str, summary: &SessionSummary, feedback: SessionFeedback) -> Self {
        let pain_location = feedback
            .pain_location
            .map(|loc| loc.trim().to_string())
            .filter(|loc| !loc.is_empty());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            started_at: summary.started_at,
            completed_at: summary.completed_at,
            duration_sec: summary.duration_sec,
            rpe: feedback.rpe,
            pain_score: feedback.pain_score,
            pain_location,
        }
    }
}

/// Destination for completed-session records.
pub trait SessionLogSink {
    fn record(&mut self, record: &SessionRecord) -> Result<(), CoreError>;
}

/// Sink that keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    pub records: Vec<SessionRecord>,
}

impl SessionLogSink for MemoryLog {
    fn record(&mut self, record: &SessionRecord) -> Result<(), CoreError> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    pub total_sessions: u64,
    pub total_duration_sec: f64,
    pub today_sessions: u64,
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// SQLite database of completed sessions.
pub struct SessionLog {
    conn: Connection,
}

impl SessionLog {
    /// Open the log at `~/.config/repcue/sessions.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("sessions.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let log = Self { conn };
        log.migrate()?;
        Ok(log)
    }

    /// Open an in-memory log (tests and dry runs).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        let log = Self { conn };
        log.migrate()?;
        Ok(log)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id            TEXT PRIMARY KEY,
                project_id    TEXT NOT NULL,
                started_at    TEXT NOT NULL,
                completed_at  TEXT NOT NULL,
                duration_sec  REAL NOT NULL,
                rpe           INTEGER,
                pain_score    INTEGER,
                pain_location TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_project_id ON sessions(project_id);",
        )?;
        Ok(())
    }

    /// Insert a record.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert(&self, record: &SessionRecord) -> Result<(), CoreError> {
        self.conn.execute(
            "INSERT INTO sessions (id, project_id, started_at, completed_at, duration_sec,
                                   rpe, pain_score, pain_location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.project_id,
                record.started_at.to_rfc3339(),
                record.completed_at.to_rfc3339(),
                record.duration_sec,
                record.rpe,
                record.pain_score,
                record.pain_location,
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions first.
    pub fn list(&self, limit: usize) -> Result<Vec<SessionRecord>, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, started_at, completed_at, duration_sec,
                    rpe, pain_score, pain_location
             FROM sessions ORDER BY completed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let started: String = row.get(2)?;
            let completed: String = row.get(3)?;
            Ok(SessionRecord {
                id: row.get(0)?,
                project_id: row.get(1)?,
                started_at: parse_timestamp(&started),
                completed_at: parse_timestamp(&completed),
                duration_sec: row.get(4)?,
                rpe: row.get(5)?,
                pain_score: row.get(6)?,
                pain_location: row.get(7)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Totals across all sessions; "today" is the current UTC date.
    pub fn stats(&self) -> Result<LogStats, CoreError> {
        let (total_sessions, total_duration_sec): (i64, f64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_sec), 0.0) FROM sessions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let today_sessions: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE substr(completed_at, 1, 10) = ?1",
            params![today],
            |row| row.get(0),
        )?;

        let last: Option<String> = self.conn.query_row(
            "SELECT MAX(completed_at) FROM sessions",
            [],
            |row| row.get(0),
        )?;

        Ok(LogStats {
            total_sessions: total_sessions as u64,
            total_duration_sec,
            today_sessions: today_sessions as u64,
            last_completed_at: last.as_deref().map(parse_timestamp),
        })
    }
}

impl SessionLogSink for SessionLog {
    fn record(&mut self, record: &SessionRecord) -> Result<(), CoreError> {
        self.insert(record)
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn summary(minutes_ago: i64, duration_sec: f64) -> SessionSummary {
        let completed_at = Utc::now() - Duration::minutes(minutes_ago);
        SessionSummary {
            started_at: completed_at - Duration::seconds(duration_sec as i64),
            completed_at,
            duration_sec,
        }
    }

    #[test]
    fn record_and_list_newest_first() {
        let mut log = SessionLog::open_memory().unwrap();
        let older = SessionRecord::new("p1", &summary(30, 600.0), SessionFeedback::default());
        let newer = SessionRecord::new(
            "p1",
            &summary(5, 900.0),
            SessionFeedback {
                rpe: Some(7),
                pain_score: Some(2),
                pain_location: Some("  left knee ".into()),
            },
        );
        log.record(&older).unwrap();
        log.record(&newer).unwrap();

        let records = log.list(10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, newer.id);
        assert_eq!(records[0].rpe, Some(7));
        assert_eq!(records[0].pain_location.as_deref(), Some("left knee"));
        assert_eq!(records[1].rpe, None);
        assert_eq!(log.list(1).unwrap().len(), 1);
    }

    #[test]
    fn stats_sum_durations() {
        let log = SessionLog::open_memory().unwrap();
        assert_eq!(log.stats().unwrap().total_sessions, 0);

        log.insert(&SessionRecord::new("p", &summary(1, 60.0), SessionFeedback::default()))
            .unwrap();
        log.insert(&SessionRecord::new("p", &summary(2, 90.5), SessionFeedback::default()))
            .unwrap();

        let stats = log.stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert!((stats.total_duration_sec - 150.5).abs() < 1e-9);
        assert!(stats.last_completed_at.is_some());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let log = SessionLog::open_at(&path).unwrap();
            log.insert(&SessionRecord::new("p", &summary(0, 10.0), SessionFeedback::default()))
                .unwrap();
        }
        let reopened = SessionLog::open_at(&path).unwrap();
        assert_eq!(reopened.list(5).unwrap().len(), 1);
    }

    #[test]
    fn feedback_ranges() {
        assert!(SessionFeedback::default().validate().is_ok());
        let bad_rpe = SessionFeedback {
            rpe: Some(0),
            ..SessionFeedback::default()
        };
        assert!(bad_rpe.validate().is_err());
        let bad_pain = SessionFeedback {
            pain_score: Some(11),
            ..SessionFeedback::default()
        };
        assert!(bad_pain.validate().is_err());
    }

    #[test]
    fn memory_log_keeps_records() {
        let mut log = MemoryLog::default();
        let record = SessionRecord::new("p", &summary(0, 1.0), SessionFeedback::default());
        log.record(&record).unwrap();
        assert_eq!(log.records, vec![record]);
    }
}
