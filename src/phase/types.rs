//! Phase identifiers and per-phase timing policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A step of the ritual.
///
/// Declaration order is ritual order: `Idle` first, the nine ordinal phases,
/// then the two terminal pseudo-phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Preparation,
    Breathing,
    Evocation,
    Recognition,
    Liberation,
    Returning,
    Cutting,
    Sealing,
    Renewal,
    Completed,
    Abandoned,
}

impl Phase {
    /// The phases a user actually walks through, in order.
    pub const ORDINAL: [Phase; 9] = [
        Phase::Preparation,
        Phase::Breathing,
        Phase::Evocation,
        Phase::Recognition,
        Phase::Liberation,
        Phase::Returning,
        Phase::Cutting,
        Phase::Sealing,
        Phase::Renewal,
    ];

    /// The last ordinal phase; the only one `complete` is legal from.
    pub const LAST: Phase = Phase::Renewal;

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Abandoned)
    }

    pub fn is_ordinal(self) -> bool {
        !self.is_terminal() && self != Phase::Idle
    }

    /// Position within [`Phase::ORDINAL`], if this is an ordinal phase.
    pub fn ordinal_index(self) -> Option<usize> {
        Self::ORDINAL.iter().position(|p| *p == self)
    }

    /// Successor in the fixed order. `Idle` leads to `Preparation`; the last
    /// ordinal phase has no ordinal successor.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Idle => Some(Phase::Preparation),
            p => p
                .ordinal_index()
                .and_then(|i| Self::ORDINAL.get(i + 1).copied()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Preparation => "preparation",
            Phase::Breathing => "breathing",
            Phase::Evocation => "evocation",
            Phase::Recognition => "recognition",
            Phase::Liberation => "liberation",
            Phase::Returning => "returning",
            Phase::Cutting => "cutting",
            Phase::Sealing => "sealing",
            Phase::Renewal => "renewal",
            Phase::Completed => "completed",
            Phase::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a phase may run and what happens when it runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhasePolicy {
    /// Maximum dwell in seconds (None = untimed)
    #[serde(default)]
    pub max_dwell_secs: Option<u64>,
    /// Advance on expiry instead of waiting for the user
    #[serde(default)]
    pub auto_advance: bool,
}

/// Emitted by a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerEvent {
    /// The phase ran out and the machine moved on by itself
    AutoAdvanced { from: Phase, to: Phase },
    /// The phase ran out; the machine waits for the user
    DwellExpired { phase: Phase },
}
