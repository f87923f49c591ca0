//! Ordered phase state machine with dwell timers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{RitualError, RitualResult};

use super::timer::PhaseTimer;
use super::types::{Phase, PhasePolicy, TimerEvent};

/// Drives one ritual through the fixed phase order.
///
/// Pausing is orthogonal to the phase: it only freezes the dwell timer.
/// Entering a new phase always starts unpaused with a freshly armed timer.
pub struct PhaseMachine {
    clock: Arc<dyn Clock>,
    policies: BTreeMap<Phase, PhasePolicy>,
    current: Phase,
    paused: bool,
    timer: PhaseTimer,
}

impl PhaseMachine {
    pub fn new(clock: Arc<dyn Clock>, policies: BTreeMap<Phase, PhasePolicy>) -> Self {
        Self {
            clock,
            policies,
            current: Phase::Idle,
            paused: false,
            timer: PhaseTimer::new(),
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Fraction of the ritual done, for progress bars.
    pub fn progress(&self) -> f32 {
        match self.current {
            Phase::Completed => 1.0,
            phase => match phase.ordinal_index() {
                Some(i) => i as f32 / (Phase::ORDINAL.len() - 1) as f32,
                None => 0.0,
            },
        }
    }

    /// Remaining dwell of the current phase, if it is timed.
    pub fn remaining_dwell(&self) -> Option<Duration> {
        self.timer.remaining(self.clock.now())
    }

    /// Jump straight into `phase` from idle, e.g. when preparation already
    /// happened upstream.
    pub fn begin_at(&mut self, phase: Phase) -> RitualResult<Phase> {
        if self.current != Phase::Idle && !self.current.is_terminal() {
            return Err(RitualError::SessionAlreadyActive);
        }
        if !phase.is_ordinal() {
            return Err(RitualError::InvalidPhaseForOperation {
                operation: "begin",
                phase,
            });
        }
        self.enter(phase);
        Ok(phase)
    }

    /// Move to the successor phase.
    ///
    /// From a terminal phase this resets to `Idle`. The last ordinal phase
    /// holds: only [`PhaseMachine::complete`] leaves it.
    pub fn advance(&mut self) -> Phase {
        if self.current.is_terminal() {
            self.reset();
            return self.current;
        }
        if let Some(next) = self.current.next() {
            self.enter(next);
        } else {
            debug!("{} is the last phase; waiting for completion", self.current);
        }
        self.current
    }

    pub fn abandon(&mut self) -> RitualResult<Phase> {
        if self.current == Phase::Idle || self.current.is_terminal() {
            return Err(RitualError::NoActiveSession);
        }
        let from = self.current;
        self.enter(Phase::Abandoned);
        info!("Ritual abandoned during {}", from);
        Ok(from)
    }

    pub fn complete(&mut self) -> RitualResult<()> {
        if self.current != Phase::LAST {
            return Err(RitualError::InvalidPhaseForOperation {
                operation: "complete",
                phase: self.current,
            });
        }
        self.enter(Phase::Completed);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.timer.freeze(self.clock.now());
        debug!("Paused in {}", self.current);
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.timer.thaw(self.clock.now());
        debug!("Resumed in {}", self.current);
    }

    /// Check the dwell timer. Auto-advance phases move on by themselves;
    /// the others stop their timer and wait.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.paused {
            return None;
        }
        let expiry = self.timer.poll(self.clock.now(), self.current)?;
        if expiry.auto_advance && expiry.phase != Phase::LAST {
            let from = self.current;
            let to = self.advance();
            info!("Dwell expired in {}, auto-advanced to {}", from, to);
            Some(TimerEvent::AutoAdvanced { from, to })
        } else {
            info!("Dwell expired in {}, waiting for user", expiry.phase);
            Some(TimerEvent::DwellExpired {
                phase: expiry.phase,
            })
        }
    }

    pub fn reset(&mut self) {
        self.timer.cancel();
        self.paused = false;
        self.current = Phase::Idle;
    }

    fn enter(&mut self, phase: Phase) {
        self.timer.cancel();
        self.paused = false;
        self.current = phase;
        if phase.is_ordinal() {
            let policy = self.policies.get(&phase).copied().unwrap_or_default();
            if let Some(id) = self.timer.schedule(phase, policy, self.clock.now()) {
                debug!("Armed timer {} for {} ({:?}s)", id, phase, policy.max_dwell_secs);
            }
        }
    }
}
