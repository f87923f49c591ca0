use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Achievements a user can unlock. Once unlocked, never revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    /// Any completed session
    FirstLiberation,
    /// Three completed sessions
    BondCutter,
    /// Completed an ancestral-loyalty ritual
    AncestralLiberator,
    /// Twenty-one completed sessions
    LightSoul,
    /// A vow was kept
    VowKeeper,
    /// Seven-day streak
    StreakMaster,
    /// Intensity improved by three or more
    IntensityMaster,
    /// Every reading in a session passed
    VoiceMaster,
}

impl Achievement {
    pub const ALL: [Achievement; 8] = [
        Achievement::FirstLiberation,
        Achievement::BondCutter,
        Achievement::AncestralLiberator,
        Achievement::LightSoul,
        Achievement::VowKeeper,
        Achievement::StreakMaster,
        Achievement::IntensityMaster,
        Achievement::VoiceMaster,
    ];

    /// Points granted once, when the achievement unlocks.
    pub fn points(self) -> u64 {
        match self {
            Achievement::FirstLiberation => 50,
            Achievement::BondCutter => 100,
            Achievement::AncestralLiberator => 150,
            Achievement::LightSoul => 500,
            Achievement::VowKeeper => 100,
            Achievement::StreakMaster => 200,
            Achievement::IntensityMaster => 75,
            Achievement::VoiceMaster => 75,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Achievement::FirstLiberation => "First Liberation",
            Achievement::BondCutter => "Bond Cutter",
            Achievement::AncestralLiberator => "Ancestral Liberator",
            Achievement::LightSoul => "Light Soul",
            Achievement::VowKeeper => "Vow Keeper",
            Achievement::StreakMaster => "Streak Master",
            Achievement::IntensityMaster => "Intensity Master",
            Achievement::VoiceMaster => "Voice Master",
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Everything the ledger persists. A save followed by a load must reproduce
/// it exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub total_started: u64,
    pub total_completed: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub total_points: u64,
    pub achievements: BTreeSet<Achievement>,
    /// User-local calendar day of the last completion
    pub last_completed_on: Option<NaiveDate>,
    /// Sessions whose honored vow has already been rewarded. Holds one id
    /// per kept vow (at most one per completed session), so it grows only
    /// as fast as the user keeps vows.
    #[serde(default)]
    pub honored_vows: BTreeSet<SessionId>,
}

/// What recording one session earned, for the completion screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    /// Points from the session itself
    pub session_points: u64,
    /// Points from achievements unlocked by this session
    pub achievement_points: u64,
    pub unlocked: Vec<Achievement>,
}

impl RecordOutcome {
    pub fn total_points(&self) -> u64 {
        self.session_points + self.achievement_points
    }
}

/// Read-only stats for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total_started: u64,
    pub total_completed: u64,
    /// Streak as of today (0 once a day has been missed)
    pub current_streak: u32,
    pub best_streak: u32,
    pub total_points: u64,
    pub achievements: Vec<Achievement>,
    pub last_completed_on: Option<NaiveDate>,
}
