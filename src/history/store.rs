use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::session::{SessionEntry, SessionId, SessionSink, SessionStatus};

use super::types::SessionSummary;

/// SQLite journal of finalized sessions.
/// All operations are synchronous (rusqlite is blocking).
pub struct SessionHistory {
    conn: Connection,
}

impl SessionHistory {
    /// Create or open the history database.
    /// Typically called with `default_data_dir().join("ritual_history.db")`.
    pub fn new(db_path: &Path) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data dir: {}", e))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| format!("Failed to open history db: {}", e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ritual_sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL,
                entry_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ritual_sessions_created
                ON ritual_sessions(created_at DESC);",
        )
        .map_err(|e| format!("Failed to create history table: {}", e))?;

        info!("Opened ritual history database at {:?}", db_path);
        Ok(Self { conn })
    }

    /// Store a finalized session. Recording the same session again
    /// overwrites it.
    pub fn record_session(&self, entry: &SessionEntry) -> Result<(), String> {
        if entry.status == SessionStatus::InProgress {
            return Err(format!("Session {} is still in progress", entry.id));
        }

        let json = serde_json::to_string(entry)
            .map_err(|e| format!("Failed to serialize session: {}", e))?;
        let status = entry.status.as_str();

        self.conn
            .execute(
                "INSERT OR REPLACE INTO ritual_sessions (id, created_at, status, entry_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.id.to_string(),
                    entry.created_at.to_rfc3339(),
                    status,
                    json
                ],
            )
            .map_err(|e| format!("Failed to insert session: {}", e))?;

        info!("Recorded {} session {} ({})", status, entry.id, entry.label);
        Ok(())
    }

    /// List sessions, newest first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT entry_json FROM ritual_sessions
                 ORDER BY created_at DESC
                 LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare query: {}", e))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| row.get::<_, String>(0))
            .map_err(|e| format!("Failed to query sessions: {}", e))?;

        let mut summaries = Vec::new();
        for row in rows {
            let json = row.map_err(|e| format!("Failed to read session row: {}", e))?;
            match serde_json::from_str::<SessionEntry>(&json) {
                Ok(entry) => summaries.push(summarize(&entry)),
                Err(e) => warn!("Skipping unreadable history row: {}", e),
            }
        }
        Ok(summaries)
    }

    /// Get a full session.
    pub fn get_session(&self, id: SessionId) -> Result<SessionEntry, String> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT entry_json FROM ritual_sessions WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Session lookup failed: {}", e))?;

        let json = json.ok_or_else(|| format!("Session not found: {}", id))?;
        serde_json::from_str(&json).map_err(|e| format!("Failed to deserialize session: {}", e))
    }

    /// Mark the vow of a completed session as honored or broken.
    ///
    /// Returns the updated entry so the caller can pass it on to
    /// `MetricsLedger::record_vow_honored`.
    pub fn set_vow_honored(&self, id: SessionId, honored: bool) -> Result<SessionEntry, String> {
        let mut entry = self.get_session(id)?;
        if entry.status != SessionStatus::Completed {
            return Err(format!("Session {} was not completed", id));
        }
        if entry.vow.is_none() {
            return Err(format!("Session {} has no vow", id));
        }

        entry.vow_honored = Some(honored);
        self.record_session(&entry)?;
        info!("Marked vow of session {} as honored={}", id, honored);
        Ok(entry)
    }

    /// Number of stored sessions.
    pub fn count(&self) -> Result<usize, String> {
        self.conn
            .query_row("SELECT COUNT(*) FROM ritual_sessions", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .map_err(|e| format!("Failed to count sessions: {}", e))
    }
}

impl SessionSink for SessionHistory {
    fn record(&mut self, entry: &SessionEntry) {
        if let Err(e) = self.record_session(entry) {
            warn!("Failed to journal session {}: {}", entry.id, e);
        }
    }
}

fn summarize(entry: &SessionEntry) -> SessionSummary {
    SessionSummary {
        id: entry.id,
        bond_type: entry.bond_type,
        approach: entry.approach,
        label: entry.label.clone(),
        status: entry.status,
        created_at: entry.created_at,
        intensity_before: entry.intensity_before,
        intensity_after: entry.intensity_after,
        has_vow: entry.vow.is_some(),
        vow_honored: entry.vow_honored,
    }
}
