//! Voice-reading validation.
//!
//! Checks a speech-to-text transcript against the anchor phrases a phase asks
//! the user to read aloud. Matching is plain substring search over normalized
//! text (case, accents and punctuation are ignored); there is no attempt at
//! understanding what was said.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::phase::Phase;

/// Share of expected phrases that must be heard for a reading to pass.
pub const DEFAULT_PASS_THRESHOLD: f32 = 0.7;

/// Outcome of scoring one phase's reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceValidation {
    pub phase: Phase,
    pub expected_phrases: Vec<String>,
    pub matched_phrases: Vec<String>,
    pub passed: bool,
}

impl VoiceValidation {
    /// Fraction of expected phrases matched (1.0 when nothing was expected).
    pub fn coverage(&self) -> f32 {
        if self.expected_phrases.is_empty() {
            1.0
        } else {
            self.matched_phrases.len() as f32 / self.expected_phrases.len() as f32
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VoiceScorer {
    pass_threshold: f32,
}

impl VoiceScorer {
    pub fn new(pass_threshold: f32) -> Self {
        Self { pass_threshold }
    }

    pub fn pass_threshold(&self) -> f32 {
        self.pass_threshold
    }

    /// Score `transcript` against `expected` for `phase`.
    ///
    /// Blank expected phrases are dropped. An empty expected list passes
    /// trivially; an empty transcript fails anything else.
    pub fn score(&self, phase: Phase, expected: &[String], transcript: &str) -> VoiceValidation {
        let expected_phrases: Vec<String> = expected
            .iter()
            .filter(|p| !normalize_phrase(p).is_empty())
            .cloned()
            .collect();

        if expected_phrases.is_empty() {
            return VoiceValidation {
                phase,
                expected_phrases,
                matched_phrases: Vec::new(),
                passed: true,
            };
        }

        let heard = normalize_phrase(transcript);
        let matched_phrases: Vec<String> = if heard.is_empty() {
            Vec::new()
        } else {
            expected_phrases
                .iter()
                .filter(|p| heard.contains(&normalize_phrase(p)))
                .cloned()
                .collect()
        };

        let ratio = matched_phrases.len() as f32 / expected_phrases.len() as f32;
        VoiceValidation {
            phase,
            passed: ratio >= self.pass_threshold,
            expected_phrases,
            matched_phrases,
        }
    }
}

impl Default for VoiceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_PASS_THRESHOLD)
    }
}

/// Normalize text for matching: strip accents, lowercase, turn punctuation
/// into spaces, collapse whitespace.
pub fn normalize_phrase(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}
