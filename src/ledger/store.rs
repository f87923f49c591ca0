use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::types::LedgerSnapshot;

/// Where the ledger keeps its snapshot between launches.
pub trait LedgerStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), String>;
    fn load(&self) -> Result<Option<LedgerSnapshot>, String>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), String> {
        (**self).save(snapshot)
    }

    fn load(&self) -> Result<Option<LedgerSnapshot>, String> {
        (**self).load()
    }
}

impl<S: LedgerStore + ?Sized> LedgerStore for Box<S> {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), String> {
        (**self).save(snapshot)
    }

    fn load(&self) -> Result<Option<LedgerSnapshot>, String> {
        (**self).load()
    }
}

/// SQLite store holding the snapshot as JSON in a single row.
/// All operations are synchronous (rusqlite is blocking).
pub struct SqliteLedgerStore {
    conn: Connection,
}

impl SqliteLedgerStore {
    /// Open or create the ledger database at the given path.
    pub fn new(db_path: &Path) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data dir: {}", e))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| format!("Failed to open ledger db at {:?}: {}", db_path, e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ledger_snapshot (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                snapshot_json TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| format!("Failed to create ledger table: {}", e))?;

        info!("Opened metrics ledger database at {:?}", db_path);
        Ok(Self { conn })
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), String> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| format!("Failed to serialize ledger snapshot: {}", e))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO ledger_snapshot (id, snapshot_json, saved_at)
                 VALUES (1, ?1, ?2)",
                params![json, Utc::now().to_rfc3339()],
            )
            .map_err(|e| format!("Failed to save ledger snapshot: {}", e))?;

        debug!(
            "Saved ledger snapshot ({} completed, {} points)",
            snapshot.total_completed, snapshot.total_points
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<LedgerSnapshot>, String> {
        let result = self.conn.query_row(
            "SELECT snapshot_json FROM ledger_snapshot WHERE id = 1",
            [],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(json) => {
                let snapshot = serde_json::from_str(&json)
                    .map_err(|e| format!("Failed to deserialize ledger snapshot: {}", e))?;
                Ok(Some(snapshot))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Ledger lookup failed: {}", e)),
        }
    }
}

/// In-memory store, for tests and for hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    snapshot: Mutex<Option<LedgerSnapshot>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), String> {
        let mut slot = self
            .snapshot
            .lock()
            .map_err(|_| "Ledger memory store is poisoned".to_string())?;
        *slot = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<LedgerSnapshot>, String> {
        let slot = self
            .snapshot
            .lock()
            .map_err(|_| "Ledger memory store is poisoned".to_string())?;
        Ok(slot.clone())
    }
}
