use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Phase;
use crate::voice::VoiceValidation;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The kind of bond or emotional tie a ritual works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondType {
    RomanticPartner,
    Parent,
    Sibling,
    Friendship,
    Colleague,
    /// Inherited loyalty to family patterns
    AncestralLoyalty,
    Karmic,
    SelfBond,
}

/// Content variant; changes wording, never structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    Secular,
    Spiritual,
    Traditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

// =============================================================================
// VOWS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VowCategory {
    Boundary,
    SelfCare,
    Communication,
    Forgiveness,
    Detachment,
    Gratitude,
}

/// A behavioral commitment recorded during renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vow {
    pub title: String,
    pub category: VowCategory,
    /// How many days the user commits to keeping it
    pub duration_days: u16,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SESSION ENTRY
// =============================================================================

/// One pass through the ritual.
///
/// Only the engine mutates an entry, and only while it is in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    pub bond_type: BondType,
    pub approach: Approach,
    /// User's own name for the bond (e.g. "my ex-partner")
    pub label: String,

    pub intensity_before: u8,
    pub intensity_after: Option<u8>,

    pub current_phase: Phase,
    pub phase_history: Vec<Phase>,

    pub voice_validations: Vec<VoiceValidation>,

    pub vow: Option<Vow>,
    /// Set outside the engine once the vow period is over
    pub vow_honored: Option<bool>,

    pub notes: Option<String>,
    pub status: SessionStatus,
}

impl SessionEntry {
    pub fn new(
        bond_type: BondType,
        approach: Approach,
        label: impl Into<String>,
        intensity_before: u8,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            created_at,
            completed_at: None,
            bond_type,
            approach,
            label: label.into(),
            intensity_before,
            intensity_after: None,
            current_phase: Phase::Idle,
            phase_history: Vec::new(),
            voice_validations: Vec::new(),
            vow: None,
            vow_honored: None,
            notes: None,
            status: SessionStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != SessionStatus::InProgress
    }

    /// Note the phase the ritual just entered.
    pub(crate) fn enter_phase(&mut self, phase: Phase) {
        if self.current_phase != phase {
            self.current_phase = phase;
            self.phase_history.push(phase);
        }
    }

    /// Keep one validation per phase; a retake replaces the earlier one.
    pub(crate) fn record_validation(&mut self, validation: VoiceValidation) {
        match self
            .voice_validations
            .iter_mut()
            .find(|v| v.phase == validation.phase)
        {
            Some(existing) => *existing = validation,
            None => self.voice_validations.push(validation),
        }
    }

    pub(crate) fn finalize(&mut self, status: SessionStatus, at: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(at);
        let terminal = match status {
            SessionStatus::Completed => Phase::Completed,
            _ => Phase::Abandoned,
        };
        self.enter_phase(terminal);
    }

    /// Change in the user's rating, after minus before. Only defined for
    /// completed sessions.
    pub fn improvement(&self) -> Option<i32> {
        if self.status != SessionStatus::Completed {
            return None;
        }
        self.intensity_after
            .map(|after| i32::from(after) - i32::from(self.intensity_before))
    }

    pub fn passed_validation_count(&self) -> usize {
        self.voice_validations.iter().filter(|v| v.passed).count()
    }

    /// True when at least one reading was scored and all of them passed.
    pub fn all_validations_passed(&self) -> bool {
        !self.voice_validations.is_empty() && self.voice_validations.iter().all(|v| v.passed)
    }

    pub fn vow_was_honored(&self) -> bool {
        self.vow.is_some() && self.vow_honored == Some(true)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|end| end - self.created_at)
    }
}
