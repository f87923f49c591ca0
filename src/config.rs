//! Engine configuration.
//!
//! Provides two loading methods, mirroring the content catalog:
//! - `default_config()` - The defaults embedded in the binary
//! - `load_config(path)` - A custom TOML file (e.g. for a shorter demo ritual)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RitualError;
use crate::phase::{Phase, PhasePolicy};
use crate::voice::DEFAULT_PASS_THRESHOLD;

/// Defaults embedded at compile time from `config/engine.toml`.
const DEFAULT_CONFIG: &str = include_str!("../config/engine.toml");

/// Longest dwell a phase may be given: one day.
pub const MAX_DWELL_SECS: u64 = 86_400;

/// Directory name under the platform data dir.
const APP_DIR_NAME: &str = "ritual-engine";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Start directly in breathing when preparation is handled by the host UI
    #[serde(default)]
    pub skip_preparation: bool,
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Dwell policy per phase (missing = untimed)
    #[serde(default)]
    pub phases: BTreeMap<Phase, PhasePolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub pass_threshold: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        default_config()
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> Result<(), RitualError> {
        let threshold = self.voice.pass_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(RitualError::Config(format!(
                "voice.pass_threshold must be in (0, 1], got {}",
                threshold
            )));
        }

        for (phase, policy) in &self.phases {
            if !phase.is_ordinal() {
                return Err(RitualError::Config(format!(
                    "phase '{}' cannot carry a dwell policy",
                    phase
                )));
            }
            match policy.max_dwell_secs {
                Some(0) => {
                    return Err(RitualError::Config(format!(
                        "phase '{}' has a zero max_dwell_secs",
                        phase
                    )));
                }
                Some(secs) if secs > MAX_DWELL_SECS => {
                    return Err(RitualError::Config(format!(
                        "phase '{}' max_dwell_secs {} exceeds {}",
                        phase, secs, MAX_DWELL_SECS
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The phase a new session opens in.
    pub fn first_phase(&self) -> Phase {
        if self.skip_preparation {
            Phase::Breathing
        } else {
            Phase::Preparation
        }
    }
}

/// Get the default configuration embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_config() -> EngineConfig {
    toml::from_str(DEFAULT_CONFIG).expect("embedded engine.toml must be valid TOML")
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    config.validate()?;
    info!("Loaded engine config from {:?}", path);
    Ok(config)
}

/// Default directory for the ledger and history databases.
///
/// Falls back to the working directory when the platform has no data dir.
pub fn default_data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join(APP_DIR_NAME),
        None => {
            debug!("No platform data dir; using working directory");
            PathBuf::from(".").join(APP_DIR_NAME)
        }
    }
}
