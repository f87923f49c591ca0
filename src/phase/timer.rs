//! Cancellable per-phase dwell timer.
//!
//! The timer never calls back on its own. The owner polls it with the current
//! instant on the single thread that owns session state, and every scheduled
//! deadline remembers the phase it was armed for, so a poll can only report
//! expiry for the phase that is still current.

use chrono::{DateTime, Duration, Utc};

use super::types::{Phase, PhasePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Armed {
    id: u64,
    phase: Phase,
    deadline: DateTime<Utc>,
    auto_advance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Disarmed,
    Running(Armed),
    Frozen {
        id: u64,
        phase: Phase,
        remaining: Duration,
        auto_advance: bool,
    },
}

/// Expiry reported by [`PhaseTimer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub timer_id: u64,
    pub phase: Phase,
    pub auto_advance: bool,
}

#[derive(Debug)]
pub struct PhaseTimer {
    next_id: u64,
    state: TimerState,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            state: TimerState::Disarmed,
        }
    }

    /// Arm the timer for `phase`, replacing whatever was armed before.
    /// Returns the new timer id, or None if the policy is untimed or its
    /// dwell does not fit a calendar instant.
    pub fn schedule(&mut self, phase: Phase, policy: PhasePolicy, now: DateTime<Utc>) -> Option<u64> {
        self.cancel();
        let secs = policy.max_dwell_secs?;
        let deadline = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|dwell| now.checked_add_signed(dwell))?;
        let id = self.next_id;
        self.next_id += 1;
        self.state = TimerState::Running(Armed {
            id,
            phase,
            deadline,
            auto_advance: policy.auto_advance,
        });
        Some(id)
    }

    pub fn cancel(&mut self) {
        self.state = TimerState::Disarmed;
    }

    /// Stop the countdown, keeping the remaining dwell.
    pub fn freeze(&mut self, now: DateTime<Utc>) {
        if let TimerState::Running(armed) = self.state {
            let remaining = (armed.deadline - now).max(Duration::zero());
            self.state = TimerState::Frozen {
                id: armed.id,
                phase: armed.phase,
                remaining,
                auto_advance: armed.auto_advance,
            };
        }
    }

    /// Restart a frozen countdown from its remaining dwell.
    pub fn thaw(&mut self, now: DateTime<Utc>) {
        if let TimerState::Frozen {
            id,
            phase,
            remaining,
            auto_advance,
        } = self.state
        {
            self.state = TimerState::Running(Armed {
                id,
                phase,
                deadline: now + remaining,
                auto_advance,
            });
        }
    }

    /// Report and disarm an expired timer armed for `current`.
    ///
    /// A timer armed for any other phase is stale; it is dropped without
    /// firing.
    pub fn poll(&mut self, now: DateTime<Utc>, current: Phase) -> Option<Expiry> {
        let TimerState::Running(armed) = self.state else {
            return None;
        };
        if armed.phase != current {
            self.cancel();
            return None;
        }
        if now < armed.deadline {
            return None;
        }
        self.cancel();
        Some(Expiry {
            timer_id: armed.id,
            phase: armed.phase,
            auto_advance: armed.auto_advance,
        })
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.state {
            TimerState::Disarmed => None,
            TimerState::Running(armed) => Some((armed.deadline - now).max(Duration::zero())),
            TimerState::Frozen { remaining, .. } => Some(remaining),
        }
    }

    pub fn is_armed(&self) -> bool {
        !matches!(self.state, TimerState::Disarmed)
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    fn timed(secs: u64, auto_advance: bool) -> PhasePolicy {
        PhasePolicy {
            max_dwell_secs: Some(secs),
            auto_advance,
        }
    }

    #[test]
    fn test_untimed_policy_does_not_arm() {
        let mut timer = PhaseTimer::new();
        assert_eq!(timer.schedule(Phase::Evocation, PhasePolicy::default(), t0()), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_out_of_range_dwell_does_not_arm() {
        let mut timer = PhaseTimer::new();
        assert_eq!(timer.schedule(Phase::Preparation, timed(u64::MAX, false), t0()), None);
        assert_eq!(
            timer.schedule(Phase::Preparation, timed(10_000_000_000_000_000, false), t0()),
            None
        );
        assert!(!timer.is_armed());
        assert_eq!(timer.poll(t0() + Duration::days(365), Phase::Preparation), None);
    }

    #[test]
    fn test_fires_once_at_deadline() {
        let mut timer = PhaseTimer::new();
        timer.schedule(Phase::Breathing, timed(60, true), t0());

        assert!(timer.poll(t0() + Duration::seconds(59), Phase::Breathing).is_none());

        let expiry = timer
            .poll(t0() + Duration::seconds(60), Phase::Breathing)
            .expect("timer should expire at its deadline");
        assert_eq!(expiry.phase, Phase::Breathing);
        assert!(expiry.auto_advance);

        assert!(timer.poll(t0() + Duration::seconds(120), Phase::Breathing).is_none());
    }

    #[test]
    fn test_stale_timer_never_fires_into_new_phase() {
        let mut timer = PhaseTimer::new();
        timer.schedule(Phase::Breathing, timed(60, true), t0());

        let late = t0() + Duration::seconds(600);
        assert!(timer.poll(late, Phase::Evocation).is_none());
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_freeze_keeps_remaining_dwell() {
        let mut timer = PhaseTimer::new();
        timer.schedule(Phase::Sealing, timed(90, false), t0());

        timer.freeze(t0() + Duration::seconds(30));
        // time passing while frozen does not count
        assert!(timer.poll(t0() + Duration::seconds(500), Phase::Sealing).is_none());
        assert_eq!(
            timer.remaining(t0() + Duration::seconds(500)),
            Some(Duration::seconds(60))
        );

        let resumed_at = t0() + Duration::seconds(500);
        timer.thaw(resumed_at);
        assert!(timer.poll(resumed_at + Duration::seconds(59), Phase::Sealing).is_none());
        assert!(timer.poll(resumed_at + Duration::seconds(60), Phase::Sealing).is_some());
    }

    #[test]
    fn test_reschedule_issues_new_id() {
        let mut timer = PhaseTimer::new();
        let first = timer.schedule(Phase::Breathing, timed(60, true), t0()).unwrap();
        let second = timer.schedule(Phase::Cutting, timed(60, true), t0()).unwrap();
        assert_ne!(first, second);
        let expiry = timer.poll(t0() + Duration::seconds(60), Phase::Cutting).unwrap();
        assert_eq!(expiry.timer_id, second);
    }
}
