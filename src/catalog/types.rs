//! Content catalog types.
//!
//! These types support TOML deserialization (for loading content packs) and
//! JSON serialization (for handing scripts to the UI).

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::session::{Approach, BondType, VowCategory};

// =============================================================================
// CONFIGURATION TYPES (loaded from TOML)
// =============================================================================

/// Root of a content pack file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub scripts: Vec<ScriptEntry>,
}

/// One script and the key it is filed under.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEntry {
    pub phase: Phase,
    /// Narrow to one approach (None = any approach)
    #[serde(default)]
    pub approach: Option<Approach>,
    /// Narrow to one bond category (None = any bond)
    #[serde(default)]
    pub bond: Option<BondType>,
    #[serde(flatten)]
    pub script: Script,
}

// =============================================================================
// OUTPUT TYPES (served to the UI)
// =============================================================================

/// What the UI shows and what the user reads aloud for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub body: String,
    /// Phrases checked by the voice scorer (empty = no reading)
    #[serde(default)]
    pub voice_phrases: Vec<String>,
    #[serde(default)]
    pub suggested_vows: Vec<SuggestedVow>,
}

impl Script {
    pub fn requires_reading(&self) -> bool {
        !self.voice_phrases.is_empty()
    }
}

/// A vow offered to the user during renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedVow {
    pub title: String,
    pub category: VowCategory,
    pub duration_days: u16,
}

/// Composite lookup key. `None` parts are wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptKey {
    pub phase: Phase,
    pub approach: Option<Approach>,
    pub bond: Option<BondType>,
}

impl ScriptKey {
    pub fn new(phase: Phase, approach: Option<Approach>, bond: Option<BondType>) -> Self {
        Self {
            phase,
            approach,
            bond,
        }
    }
}
