//! Metrics and achievement ledger.
//!
//! Consumes finalized sessions and keeps the user's long-running progress:
//! session counters, a daily streak, cumulative points and unlocked
//! achievements. Only the derived rollups are kept, never the raw entries.
//!
//! # Points
//!
//! A completed session earns `100 + 20 x max(0, improvement) + 25 x passed
//! readings + 50 if its vow was honored`. Each achievement adds its own
//! reward once, when it unlocks. Abandoned sessions only count as started.

mod metrics;
mod store;
mod types;

pub use metrics::{next_streak, session_points, MetricsLedger, HONORED_VOW_POINTS};
pub use store::{LedgerStore, MemoryLedgerStore, SqliteLedgerStore};
pub use types::*;
