//! The ritual session engine.
//!
//! `RitualEngine` is the one surface the UI drives. It owns the single active
//! session slot, the phase machine and its timer, and forwards every
//! finalized entry to its [`SessionSink`] (usually the metrics ledger, often
//! paired with the session history).

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{RitualError, RitualResult};
use crate::phase::{Phase, PhaseMachine, TimerEvent};
use crate::session::{
    Approach, BondType, SessionEntry, SessionId, SessionSink, SessionStatus, Vow, VowCategory,
};
use crate::voice::{VoiceScorer, VoiceValidation};

const INTENSITY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

pub struct RitualEngine<K: SessionSink> {
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    scorer: VoiceScorer,
    machine: PhaseMachine,
    active: Option<SessionEntry>,
    sink: K,
}

impl<K: SessionSink> RitualEngine<K> {
    /// Build an engine. Fails if `config` does not validate.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, sink: K) -> RitualResult<Self> {
        config.validate()?;
        let machine = PhaseMachine::new(clock.clone(), config.phases.clone());
        let scorer = VoiceScorer::new(config.voice.pass_threshold);
        Ok(Self {
            clock,
            config,
            scorer,
            machine,
            active: None,
            sink,
        })
    }

    /// Open a new session and enter its first phase.
    pub fn start(
        &mut self,
        bond_type: BondType,
        approach: Approach,
        label: impl Into<String>,
        intensity_before: u8,
    ) -> RitualResult<SessionId> {
        if self.active.is_some() {
            warn!("Rejected start: a session is already in progress");
            return Err(RitualError::SessionAlreadyActive);
        }
        check_intensity(intensity_before)?;

        let mut entry = SessionEntry::new(
            bond_type,
            approach,
            label,
            intensity_before,
            self.clock.now(),
        );
        let first = self.machine.begin_at(self.config.first_phase())?;
        entry.enter_phase(first);

        let id = entry.id;
        info!(
            "Started session {} ({:?}, {:?}) at {}",
            id, bond_type, approach, first
        );
        self.active = Some(entry);
        Ok(id)
    }

    /// Finish the current phase and move on.
    ///
    /// `phase` must be the phase the engine is in; a mismatch means the UI
    /// and engine drifted apart and the call changes nothing. At the last
    /// phase the reading is recorded but the phase holds until
    /// [`RitualEngine::complete`].
    pub fn complete_phase(
        &mut self,
        phase: Phase,
        validation: Option<VoiceValidation>,
    ) -> RitualResult<Phase> {
        let current = self.machine.current();
        let entry = self.active.as_mut().ok_or(RitualError::NoActiveSession)?;

        if phase != current {
            warn!("Phase mismatch: engine in {}, UI completed {}", current, phase);
            return Err(RitualError::PhaseMismatch {
                expected: current,
                actual: phase,
            });
        }
        if let Some(v) = &validation {
            if v.phase != current {
                warn!(
                    "Reading scored for {} submitted while in {}",
                    v.phase, current
                );
                return Err(RitualError::PhaseMismatch {
                    expected: current,
                    actual: v.phase,
                });
            }
        }

        if let Some(v) = validation {
            debug!(
                "Reading for {}: {}/{} phrases, passed={}",
                v.phase,
                v.matched_phrases.len(),
                v.expected_phrases.len(),
                v.passed
            );
            entry.record_validation(v);
        }

        let next = self.machine.advance();
        entry.enter_phase(next);
        Ok(next)
    }

    /// Score a reading of `expected` for the current phase.
    pub fn score_reading(&self, expected: &[String], transcript: &str) -> RitualResult<VoiceValidation> {
        if self.active.is_none() {
            return Err(RitualError::NoActiveSession);
        }
        Ok(self
            .scorer
            .score(self.machine.current(), expected, transcript))
    }

    /// Attach a behavioral vow. Only allowed during renewal; a second call
    /// replaces the first vow.
    pub fn record_vow(
        &mut self,
        title: impl Into<String>,
        category: VowCategory,
        duration_days: u16,
    ) -> RitualResult<()> {
        let current = self.machine.current();
        let now = self.clock.now();
        let entry = self.active.as_mut().ok_or(RitualError::NoActiveSession)?;
        if current != Phase::Renewal {
            return Err(RitualError::InvalidPhaseForOperation {
                operation: "record a vow",
                phase: current,
            });
        }

        let title = title.into();
        info!("Recorded vow '{}' for {} days", title, duration_days);
        entry.vow = Some(Vow {
            title,
            category,
            duration_days,
            created_at: now,
        });
        Ok(())
    }

    pub fn pause(&mut self) -> RitualResult<()> {
        self.require_active()?;
        self.machine.pause();
        Ok(())
    }

    pub fn resume(&mut self) -> RitualResult<()> {
        self.require_active()?;
        self.machine.resume();
        Ok(())
    }

    /// Drive the phase timer; call from the host's run loop.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        let entry = self.active.as_mut()?;
        let event = self.machine.tick()?;
        if let TimerEvent::AutoAdvanced { to, .. } = event {
            entry.enter_phase(to);
        }
        Some(event)
    }

    /// Finish the ritual from its last phase.
    ///
    /// The finalized entry goes to the sink and is returned for display;
    /// the engine is idle again afterwards.
    pub fn complete(
        &mut self,
        intensity_after: u8,
        notes: Option<String>,
    ) -> RitualResult<SessionEntry> {
        self.require_active()?;
        let current = self.machine.current();
        if current != Phase::LAST {
            return Err(RitualError::InvalidPhaseForOperation {
                operation: "complete the session",
                phase: current,
            });
        }
        check_intensity(intensity_after)?;
        self.machine.complete()?;

        let mut entry = self.take_active()?;
        entry.intensity_after = Some(intensity_after);
        entry.notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        entry.finalize(SessionStatus::Completed, self.clock.now());

        info!(
            "Completed session {}: intensity {} -> {}",
            entry.id, entry.intensity_before, intensity_after
        );
        Ok(self.finish(entry))
    }

    /// Give up on the active session from any phase.
    pub fn abandon(&mut self) -> RitualResult<SessionEntry> {
        self.require_active()?;
        let from = self.machine.abandon()?;

        let mut entry = self.take_active()?;
        entry.finalize(SessionStatus::Abandoned, self.clock.now());

        info!("Abandoned session {} during {}", entry.id, from);
        Ok(self.finish(entry))
    }

    pub fn active(&self) -> Option<&SessionEntry> {
        self.active.as_ref()
    }

    pub fn current_phase(&self) -> Phase {
        self.machine.current()
    }

    pub fn progress(&self) -> f32 {
        self.machine.progress()
    }

    pub fn is_paused(&self) -> bool {
        self.machine.is_paused()
    }

    pub fn remaining_dwell(&self) -> Option<Duration> {
        self.machine.remaining_dwell()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    fn require_active(&self) -> RitualResult<()> {
        if self.active.is_some() {
            Ok(())
        } else {
            Err(RitualError::NoActiveSession)
        }
    }

    fn take_active(&mut self) -> RitualResult<SessionEntry> {
        self.active.take().ok_or(RitualError::NoActiveSession)
    }

    /// Hand a finalized entry to the sink and return to idle.
    fn finish(&mut self, entry: SessionEntry) -> SessionEntry {
        self.sink.record(&entry);
        self.machine.reset();
        entry
    }
}

fn check_intensity(value: u8) -> RitualResult<()> {
    if INTENSITY_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(RitualError::InvalidIntensity(value))
    }
}
