//! Composite-key script lookup.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::RitualError;
use crate::phase::Phase;
use crate::session::{Approach, BondType};

use super::types::*;

/// Read-only map from (bond, approach, phase) to the script for that step.
///
/// Lookups fall back from the most specific entry to the least:
/// `(bond, approach)`, `(bond, *)`, `(*, approach)`, `(*, *)`. A phase with no
/// entry at all gets a neutral fallback script so the ritual never stalls on
/// missing content.
pub struct ContentCatalog {
    scripts: HashMap<ScriptKey, Script>,
    fallback: Script,
}

impl ContentCatalog {
    /// Build a catalog from a parsed content pack.
    ///
    /// Fails if an entry is filed under a non-ordinal phase or the same key
    /// appears twice.
    pub fn from_config(config: CatalogConfig) -> Result<Self, RitualError> {
        let mut scripts = HashMap::with_capacity(config.scripts.len());

        for entry in config.scripts {
            if !entry.phase.is_ordinal() {
                return Err(RitualError::Catalog(format!(
                    "script '{}' is filed under non-ritual phase '{}'",
                    entry.script.title, entry.phase
                )));
            }
            let key = ScriptKey::new(entry.phase, entry.approach, entry.bond);
            if scripts.insert(key, entry.script).is_some() {
                return Err(RitualError::Catalog(format!(
                    "duplicate script for {:?}",
                    key
                )));
            }
        }

        let catalog = Self {
            scripts,
            fallback: fallback_script(),
        };
        for phase in catalog.missing_phases() {
            warn!("Content catalog has no default script for phase '{}'", phase);
        }
        Ok(catalog)
    }

    /// Script for one step of a ritual.
    pub fn get_script(&self, bond: BondType, approach: Approach, phase: Phase) -> &Script {
        let candidates = [
            ScriptKey::new(phase, Some(approach), Some(bond)),
            ScriptKey::new(phase, None, Some(bond)),
            ScriptKey::new(phase, Some(approach), None),
            ScriptKey::new(phase, None, None),
        ];

        match candidates.iter().find_map(|key| self.scripts.get(key)) {
            Some(script) => script,
            None => {
                debug!(
                    "No script for {:?}/{:?}/{}, using fallback",
                    bond, approach, phase
                );
                &self.fallback
            }
        }
    }

    /// Ordinal phases with no phase-wide default entry. Anything listed here
    /// is a content-authoring gap.
    pub fn missing_phases(&self) -> Vec<Phase> {
        Phase::ORDINAL
            .iter()
            .copied()
            .filter(|phase| {
                !self
                    .scripts
                    .contains_key(&ScriptKey::new(*phase, None, None))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

fn fallback_script() -> Script {
    Script {
        title: "Pause and breathe".to_string(),
        body: "Take a few slow breaths and continue when you feel ready.".to_string(),
        voice_phrases: Vec::new(),
        suggested_vows: Vec::new(),
    }
}
