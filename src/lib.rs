//! Guided ritual session engine.
//!
//! Drives a user through a fixed sequence of ritual phases, scores spoken
//! readings against expected phrases, records behavioral vows and keeps a
//! persistent ledger of points, streaks and achievements. Rendering, audio
//! and speech recognition belong to the host; this crate is the state and
//! the rules.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
mod error;
pub mod history;
pub mod ledger;
pub mod phase;
pub mod session;
pub mod voice;

pub use catalog::{ContentCatalog, Script};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::RitualEngine;
pub use error::{RitualError, RitualResult};
pub use history::{SessionHistory, SessionSummary};
pub use ledger::{Achievement, LedgerSnapshot, LedgerStore, MetricsLedger, RecordOutcome};
pub use phase::{Phase, TimerEvent};
pub use session::{
    Approach, BondType, SessionEntry, SessionId, SessionSink, SessionStatus, Vow, VowCategory,
};
pub use voice::{VoiceScorer, VoiceValidation};

/// Install the global tracing subscriber, filtered by `RUST_LOG`
/// (default `info`). Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
