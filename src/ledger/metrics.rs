//! Derives streaks, points and achievements from finalized sessions.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::clock::{local_date, Clock};
use crate::session::{BondType, SessionEntry, SessionSink, SessionStatus};

use super::store::LedgerStore;
use super::types::*;

/// Points every completed session earns.
pub const BASE_SESSION_POINTS: u64 = 100;
/// Points per step of intensity improvement.
pub const POINTS_PER_IMPROVEMENT: u64 = 20;
/// Points per passed voice reading.
pub const POINTS_PER_PASSED_READING: u64 = 25;
/// Bonus for a vow that was kept.
pub const HONORED_VOW_POINTS: u64 = 50;

const BOND_CUTTER_SESSIONS: u64 = 3;
const LIGHT_SOUL_SESSIONS: u64 = 21;
const STREAK_MASTER_DAYS: u32 = 7;
const INTENSITY_MASTER_IMPROVEMENT: i32 = 3;

/// Process-wide progress ledger.
///
/// The in-memory state is authoritative once the saved ledger has been
/// read. If a save fails the ledger keeps going and tries again on the next
/// record or [`MetricsLedger::flush`].
///
/// If the saved ledger cannot be read at open, nothing is written back
/// until a later load succeeds: records made meanwhile are kept aside and
/// replayed on top of the saved state, so stored progress is never
/// replaced by a fresh one.
pub struct MetricsLedger<S: LedgerStore> {
    store: S,
    clock: Arc<dyn Clock>,
    state: LedgerSnapshot,
    loaded: bool,
    pending: Vec<Pending>,
    dirty: bool,
    last_outcome: Option<RecordOutcome>,
}

/// A record made before the saved ledger could be read.
#[derive(Debug, Clone)]
enum Pending {
    Session(SessionEntry),
    VowHonored(SessionEntry),
}

impl<S: LedgerStore> MetricsLedger<S> {
    /// Load the ledger from `store`. Starts empty if nothing is saved; if
    /// the saved state cannot be read, the load is retried before the
    /// first save.
    pub fn open(store: S, clock: Arc<dyn Clock>) -> Self {
        let (state, loaded) = match store.load() {
            Ok(Some(snapshot)) => {
                info!(
                    "Loaded metrics ledger: {} sessions, {} points",
                    snapshot.total_completed, snapshot.total_points
                );
                (snapshot, true)
            }
            Ok(None) => {
                info!("No saved metrics ledger, starting fresh");
                (LedgerSnapshot::default(), true)
            }
            Err(e) => {
                warn!("Failed to load metrics ledger, will retry before saving: {}", e);
                (LedgerSnapshot::default(), false)
            }
        };

        Self {
            store,
            clock,
            state,
            loaded,
            pending: Vec::new(),
            dirty: false,
            last_outcome: None,
        }
    }

    /// Fold one finalized session into the ledger.
    ///
    /// Abandoned sessions only count as started. Completed ones earn points,
    /// move the streak and may unlock achievements.
    pub fn record_session(&mut self, entry: &SessionEntry) -> RecordOutcome {
        if entry.status == SessionStatus::InProgress {
            warn!("Ignoring session {} that is still in progress", entry.id);
            return RecordOutcome::default();
        }

        if !self.ensure_loaded() {
            self.pending.push(Pending::Session(entry.clone()));
        }
        let outcome = self.apply_session(entry);

        self.persist();
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    /// Reward a vow that was marked honored after its session was recorded.
    ///
    /// Pays the vow bonus at most once per session.
    pub fn record_vow_honored(&mut self, entry: &SessionEntry) -> RecordOutcome {
        if entry.status != SessionStatus::Completed || !entry.vow_was_honored() {
            debug!("Session {} has no honored vow to reward", entry.id);
            return RecordOutcome::default();
        }

        if !self.ensure_loaded() {
            self.pending.push(Pending::VowHonored(entry.clone()));
        }
        match self.apply_vow_honored(entry) {
            Some(outcome) => {
                self.persist();
                outcome
            }
            None => RecordOutcome::default(),
        }
    }

    /// Retry a load or save that failed earlier. Returns true when nothing
    /// is left unsaved.
    pub fn flush(&mut self) -> bool {
        self.ensure_loaded();
        if self.dirty {
            self.persist();
        }
        !self.dirty
    }

    /// False while the saved ledger has not been read yet.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.state
    }

    pub fn last_outcome(&self) -> Option<&RecordOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn is_unlocked(&self, achievement: Achievement) -> bool {
        self.state.achievements.contains(&achievement)
    }

    /// The streak as the user should see it today: a streak whose last
    /// completion is older than yesterday has lapsed.
    pub fn effective_streak(&self) -> u32 {
        let today = self.clock.today();
        match self.state.last_completed_on {
            Some(last) if last == today || last.succ_opt() == Some(today) => {
                self.state.current_streak
            }
            _ => 0,
        }
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_started: self.state.total_started,
            total_completed: self.state.total_completed,
            current_streak: self.effective_streak(),
            best_streak: self.state.best_streak,
            total_points: self.state.total_points,
            achievements: self.state.achievements.iter().copied().collect(),
            last_completed_on: self.state.last_completed_on,
        }
    }

    fn apply_session(&mut self, entry: &SessionEntry) -> RecordOutcome {
        if entry.status == SessionStatus::Abandoned {
            self.state.total_started += 1;
            info!("Recorded abandoned session {}", entry.id);
            return RecordOutcome::default();
        }

        self.state.total_started += 1;
        self.state.total_completed += 1;

        let session_points = session_points(entry);
        self.state.total_points += session_points;
        if entry.vow_was_honored() {
            self.state.honored_vows.insert(entry.id);
        }

        let completed_on = local_date(
            entry.completed_at.unwrap_or_else(|| self.clock.now()),
            self.clock.local_offset(),
        );
        self.update_streak(completed_on);

        let unlocked = self.evaluate_achievements(entry);
        let achievement_points = unlocked.iter().map(|a| a.points()).sum();

        info!(
            "Recorded completed session {}: +{} points, streak {}",
            entry.id, session_points, self.state.current_streak
        );
        RecordOutcome {
            session_points,
            achievement_points,
            unlocked,
        }
    }

    /// None when this session's vow was already rewarded.
    fn apply_vow_honored(&mut self, entry: &SessionEntry) -> Option<RecordOutcome> {
        if !self.state.honored_vows.insert(entry.id) {
            debug!("Vow of session {} was already rewarded", entry.id);
            return None;
        }

        self.state.total_points += HONORED_VOW_POINTS;
        let mut outcome = RecordOutcome {
            session_points: HONORED_VOW_POINTS,
            ..RecordOutcome::default()
        };
        if self.unlock(Achievement::VowKeeper) {
            outcome.achievement_points = Achievement::VowKeeper.points();
            outcome.unlocked.push(Achievement::VowKeeper);
        }

        info!("Rewarded honored vow of session {}", entry.id);
        Some(outcome)
    }

    /// Read the saved ledger if that has not happened yet, replaying
    /// anything recorded meanwhile on top of it.
    fn ensure_loaded(&mut self) -> bool {
        if self.loaded {
            return true;
        }
        match self.store.load() {
            Ok(saved) => {
                self.state = saved.unwrap_or_default();
                self.loaded = true;

                let pending = std::mem::take(&mut self.pending);
                info!(
                    "Loaded metrics ledger on retry, replaying {} records",
                    pending.len()
                );
                for record in &pending {
                    match record {
                        Pending::Session(entry) => {
                            self.apply_session(entry);
                        }
                        Pending::VowHonored(entry) => {
                            self.apply_vow_honored(entry);
                        }
                    }
                }
                if !pending.is_empty() {
                    self.dirty = true;
                }
                true
            }
            Err(e) => {
                warn!("Metrics ledger is still unreadable: {}", e);
                false
            }
        }
    }

    fn update_streak(&mut self, today: NaiveDate) {
        self.state.current_streak =
            next_streak(self.state.current_streak, self.state.last_completed_on, today);
        if self.state.last_completed_on.map_or(true, |last| today > last) {
            self.state.last_completed_on = Some(today);
        }
        self.state.best_streak = self.state.best_streak.max(self.state.current_streak);
    }

    fn evaluate_achievements(&mut self, entry: &SessionEntry) -> Vec<Achievement> {
        let candidates = [
            (Achievement::FirstLiberation, true),
            (
                Achievement::BondCutter,
                self.state.total_completed >= BOND_CUTTER_SESSIONS,
            ),
            (
                Achievement::AncestralLiberator,
                entry.bond_type == BondType::AncestralLoyalty,
            ),
            (
                Achievement::LightSoul,
                self.state.total_completed >= LIGHT_SOUL_SESSIONS,
            ),
            (Achievement::VowKeeper, entry.vow_was_honored()),
            (
                Achievement::StreakMaster,
                self.state.current_streak >= STREAK_MASTER_DAYS,
            ),
            (
                Achievement::IntensityMaster,
                entry
                    .improvement()
                    .is_some_and(|i| i >= INTENSITY_MASTER_IMPROVEMENT),
            ),
            (Achievement::VoiceMaster, entry.all_validations_passed()),
        ];

        candidates
            .into_iter()
            .filter(|(_, earned)| *earned)
            .filter_map(|(achievement, _)| self.unlock(achievement).then_some(achievement))
            .collect()
    }

    /// Unlock and pay out an achievement. No-op if already unlocked.
    fn unlock(&mut self, achievement: Achievement) -> bool {
        if !self.state.achievements.insert(achievement) {
            return false;
        }
        self.state.total_points += achievement.points();
        info!("Unlocked achievement: {}", achievement);
        true
    }

    fn persist(&mut self) {
        if !self.loaded {
            debug!("Holding ledger changes until the saved ledger can be read");
            self.dirty = true;
            return;
        }
        match self.store.save(&self.state) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                warn!("Failed to save metrics ledger, will retry: {}", e);
                self.dirty = true;
            }
        }
    }
}

impl<S: LedgerStore> SessionSink for MetricsLedger<S> {
    fn record(&mut self, entry: &SessionEntry) {
        self.record_session(entry);
    }
}

/// Points a completed session earns before achievements.
pub fn session_points(entry: &SessionEntry) -> u64 {
    let improvement = entry.improvement().unwrap_or(0).max(0) as u64;
    let readings = entry.passed_validation_count() as u64;
    let vow_bonus = if entry.vow_was_honored() {
        HONORED_VOW_POINTS
    } else {
        0
    };

    BASE_SESSION_POINTS
        + POINTS_PER_IMPROVEMENT * improvement
        + POINTS_PER_PASSED_READING * readings
        + vow_bonus
}

/// Streak after a completion on `today`.
///
/// Same day keeps the streak, the next day extends it, anything else starts
/// over at 1. A last completion dated after `today` (the clock went
/// backwards) keeps the streak as is.
pub fn next_streak(current: u32, last: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last {
        Some(last) if last >= today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ledger::store::MemoryLedgerStore;
    use crate::phase::Phase;
    use crate::session::{Approach, Vow, VowCategory};
    use crate::voice::VoiceValidation;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn noon(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, d, 12, 0, 0).unwrap()
    }

    fn ledger() -> (MetricsLedger<Arc<MemoryLedgerStore>>, Arc<ManualClock>, Arc<MemoryLedgerStore>) {
        let clock = Arc::new(ManualClock::new(noon(1)));
        let store = Arc::new(MemoryLedgerStore::new());
        (MetricsLedger::open(store.clone(), clock.clone()), clock, store)
    }

    fn completed(before: u8, after: u8, at: DateTime<Utc>) -> SessionEntry {
        let mut entry = SessionEntry::new(BondType::Parent, Approach::Secular, "mum", before, at);
        entry.intensity_after = Some(after);
        entry.finalize(SessionStatus::Completed, at);
        entry
    }

    fn reading(phase: Phase, passed: bool) -> VoiceValidation {
        VoiceValidation {
            phase,
            expected_phrases: vec!["I release you".to_string()],
            matched_phrases: if passed {
                vec!["I release you".to_string()]
            } else {
                Vec::new()
            },
            passed,
        }
    }

    fn honored_vow(entry: &mut SessionEntry) {
        entry.vow = Some(Vow {
            title: "Walk daily".to_string(),
            category: VowCategory::SelfCare,
            duration_days: 21,
            created_at: entry.created_at,
        });
        entry.vow_honored = Some(true);
    }

    #[test]
    fn test_points_formula() {
        let mut entry = completed(3, 6, noon(1));
        entry.voice_validations = vec![
            reading(Phase::Recognition, true),
            reading(Phase::Liberation, true),
        ];
        honored_vow(&mut entry);

        assert_eq!(session_points(&entry), 260);

        let (mut ledger, _clock, _store) = ledger();
        let outcome = ledger.record_session(&entry);
        assert_eq!(outcome.session_points, 260);
    }

    #[test]
    fn test_negative_improvement_earns_base_only() {
        let entry = completed(6, 2, noon(1));
        assert_eq!(session_points(&entry), BASE_SESSION_POINTS);
    }

    #[test]
    fn test_first_session_unlocks_first_liberation() {
        let (mut ledger, _clock, store) = ledger();
        let outcome = ledger.record_session(&completed(5, 6, noon(1)));

        assert_eq!(outcome.unlocked, vec![Achievement::FirstLiberation]);
        assert_eq!(ledger.snapshot().total_points, 120 + 50);
        assert_eq!(store.load().unwrap().as_ref(), Some(ledger.snapshot()));
    }

    #[test]
    fn test_achievement_idempotence() {
        let (mut ledger, _clock, _store) = ledger();
        let entry = completed(5, 6, noon(1));

        let first = ledger.record_session(&entry);
        let second = ledger.record_session(&entry);

        assert_eq!(first.achievement_points, Achievement::FirstLiberation.points());
        assert!(second.unlocked.is_empty());
        assert_eq!(second.achievement_points, 0);
        assert_eq!(
            ledger.snapshot().total_points,
            2 * first.session_points + Achievement::FirstLiberation.points()
        );
    }

    #[test]
    fn test_abandoned_session_counts_started_only() {
        let (mut ledger, _clock, _store) = ledger();
        let mut entry = SessionEntry::new(BondType::Karmic, Approach::Spiritual, "x", 8, noon(1));
        entry.finalize(SessionStatus::Abandoned, noon(1));

        let outcome = ledger.record_session(&entry);
        assert_eq!(outcome, RecordOutcome::default());
        let snap = ledger.snapshot();
        assert_eq!(snap.total_started, 1);
        assert_eq!(snap.total_completed, 0);
        assert_eq!(snap.total_points, 0);
        assert_eq!(snap.current_streak, 0);
        assert!(snap.achievements.is_empty());
    }

    #[test]
    fn test_in_progress_session_ignored() {
        let (mut ledger, _clock, _store) = ledger();
        let entry = SessionEntry::new(BondType::Karmic, Approach::Spiritual, "x", 8, noon(1));
        ledger.record_session(&entry);
        assert_eq!(ledger.snapshot().total_started, 0);
    }

    #[test]
    fn test_streak_same_day_counts_once() {
        let (mut ledger, _clock, _store) = ledger();
        ledger.record_session(&completed(4, 5, noon(1)));
        ledger.record_session(&completed(4, 5, noon(1) + Duration::hours(3)));
        assert_eq!(ledger.snapshot().current_streak, 1);
    }

    #[test]
    fn test_streak_consecutive_days() {
        let (mut ledger, _clock, _store) = ledger();
        for d in 1..=3 {
            ledger.record_session(&completed(4, 5, noon(d)));
        }
        assert_eq!(ledger.snapshot().current_streak, 3);
        assert_eq!(ledger.snapshot().best_streak, 3);
    }

    #[test]
    fn test_streak_reset_after_gap_keeps_best() {
        let (mut ledger, _clock, _store) = ledger();
        for d in 1..=4 {
            ledger.record_session(&completed(4, 5, noon(d)));
        }
        assert_eq!(ledger.snapshot().best_streak, 4);

        // two full days missed
        ledger.record_session(&completed(4, 5, noon(7)));
        assert_eq!(ledger.snapshot().current_streak, 1);
        assert_eq!(ledger.snapshot().best_streak, 4);
    }

    #[test]
    fn test_streak_master_after_seven_days() {
        let (mut ledger, _clock, _store) = ledger();
        for d in 1..=6 {
            ledger.record_session(&completed(5, 5, noon(d)));
        }
        assert!(!ledger.is_unlocked(Achievement::StreakMaster));
        let outcome = ledger.record_session(&completed(5, 5, noon(7)));
        assert!(outcome.unlocked.contains(&Achievement::StreakMaster));
    }

    #[test]
    fn test_next_streak_policy() {
        assert_eq!(next_streak(0, None, day(5)), 1);
        assert_eq!(next_streak(3, Some(day(5)), day(5)), 3);
        assert_eq!(next_streak(3, Some(day(4)), day(5)), 4);
        assert_eq!(next_streak(3, Some(day(2)), day(5)), 1);
        // clock moved backwards
        assert_eq!(next_streak(3, Some(day(9)), day(5)), 3);
    }

    #[test]
    fn test_count_based_achievements() {
        let (mut ledger, _clock, _store) = ledger();
        ledger.record_session(&completed(5, 5, noon(1)));
        ledger.record_session(&completed(5, 5, noon(1)));
        assert!(!ledger.is_unlocked(Achievement::BondCutter));
        ledger.record_session(&completed(5, 5, noon(1)));
        assert!(ledger.is_unlocked(Achievement::BondCutter));
        assert!(!ledger.is_unlocked(Achievement::LightSoul));

        for _ in 3..21 {
            ledger.record_session(&completed(5, 5, noon(2)));
        }
        assert_eq!(ledger.snapshot().total_completed, 21);
        assert!(ledger.is_unlocked(Achievement::LightSoul));
    }

    #[test]
    fn test_session_specific_achievements() {
        let (mut ledger, _clock, _store) = ledger();
        let mut entry = completed(2, 6, noon(1));
        entry.bond_type = BondType::AncestralLoyalty;
        entry.voice_validations = vec![reading(Phase::Liberation, true)];
        honored_vow(&mut entry);

        let outcome = ledger.record_session(&entry);
        for a in [
            Achievement::FirstLiberation,
            Achievement::AncestralLiberator,
            Achievement::VowKeeper,
            Achievement::IntensityMaster,
            Achievement::VoiceMaster,
        ] {
            assert!(outcome.unlocked.contains(&a), "{} should unlock", a);
        }
        assert!(!outcome.unlocked.contains(&Achievement::StreakMaster));
    }

    #[test]
    fn test_failed_reading_blocks_voice_master() {
        let (mut ledger, _clock, _store) = ledger();
        let mut entry = completed(5, 5, noon(1));
        entry.voice_validations = vec![
            reading(Phase::Liberation, true),
            reading(Phase::Sealing, false),
        ];
        ledger.record_session(&entry);
        assert!(!ledger.is_unlocked(Achievement::VoiceMaster));
    }

    #[test]
    fn test_vow_honored_later_pays_once() {
        let (mut ledger, _clock, _store) = ledger();
        let mut entry = completed(5, 5, noon(1));
        entry.vow = Some(Vow {
            title: "No contact for a month".to_string(),
            category: VowCategory::Boundary,
            duration_days: 30,
            created_at: noon(1),
        });
        ledger.record_session(&entry);
        let before = ledger.snapshot().total_points;

        entry.vow_honored = Some(true);
        let outcome = ledger.record_vow_honored(&entry);
        assert_eq!(outcome.session_points, HONORED_VOW_POINTS);
        assert_eq!(outcome.unlocked, vec![Achievement::VowKeeper]);
        assert_eq!(
            ledger.snapshot().total_points,
            before + HONORED_VOW_POINTS + Achievement::VowKeeper.points()
        );

        let again = ledger.record_vow_honored(&entry);
        assert_eq!(again.total_points(), 0);
    }

    #[test]
    fn test_vow_honored_at_record_time_not_paid_twice() {
        let (mut ledger, _clock, _store) = ledger();
        let mut entry = completed(5, 5, noon(1));
        honored_vow(&mut entry);
        ledger.record_session(&entry);
        assert_eq!(ledger.record_vow_honored(&entry).total_points(), 0);
    }

    #[test]
    fn test_effective_streak_lapses() {
        let (mut ledger, clock, _store) = ledger();
        ledger.record_session(&completed(5, 5, noon(1)));
        ledger.record_session(&completed(5, 5, noon(2)));

        clock.set(noon(3));
        assert_eq!(ledger.effective_streak(), 2);
        clock.set(noon(4));
        assert_eq!(ledger.effective_streak(), 0);
        assert_eq!(ledger.stats().current_streak, 0);
        assert_eq!(ledger.stats().best_streak, 2);
    }

    #[test]
    fn test_reopen_restores_state() {
        let (mut ledger, clock, store) = ledger();
        ledger.record_session(&completed(3, 8, noon(1)));
        let saved = ledger.snapshot().clone();

        let reopened = MetricsLedger::open(store, clock);
        assert_eq!(reopened.snapshot(), &saved);
    }

    struct FlakyStore {
        fail: std::sync::atomic::AtomicBool,
        inner: MemoryLedgerStore,
    }

    impl LedgerStore for FlakyStore {
        fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), String> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err("disk full".to_string());
            }
            self.inner.save(snapshot)
        }

        fn load(&self) -> Result<Option<LedgerSnapshot>, String> {
            self.inner.load()
        }
    }

    #[test]
    fn test_failed_save_keeps_state_and_retries() {
        let clock = Arc::new(ManualClock::new(noon(1)));
        let store = Arc::new(FlakyStore {
            fail: std::sync::atomic::AtomicBool::new(true),
            inner: MemoryLedgerStore::new(),
        });
        let mut ledger = MetricsLedger::open(store.clone(), clock);

        ledger.record_session(&completed(5, 7, noon(1)));
        assert!(ledger.is_dirty());
        assert_eq!(ledger.snapshot().total_completed, 1);
        assert_eq!(store.load().unwrap(), None);
        assert!(!ledger.flush());

        store.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        assert!(ledger.flush());
        assert!(!ledger.is_dirty());
        assert_eq!(store.load().unwrap().as_ref(), Some(ledger.snapshot()));
    }

    #[test]
    fn test_unreadable_store_starts_fresh() {
        struct Broken;
        impl LedgerStore for Broken {
            fn save(&self, _: &LedgerSnapshot) -> Result<(), String> {
                Err("read-only".to_string())
            }
            fn load(&self) -> Result<Option<LedgerSnapshot>, String> {
                Err("corrupt".to_string())
            }
        }

        let clock = Arc::new(ManualClock::new(noon(1)));
        let mut ledger = MetricsLedger::open(Broken, clock);
        assert_eq!(ledger.snapshot(), &LedgerSnapshot::default());

        // the ritual still finishes
        let outcome = ledger.record_session(&completed(5, 6, noon(1)));
        assert_eq!(outcome.session_points, 120);
        assert!(ledger.is_dirty());
        assert!(!ledger.is_loaded());
        assert!(!ledger.flush());
    }

    /// Memory store whose first `load_failures` loads report a locked db.
    struct LockedStore {
        load_failures: AtomicUsize,
        inner: MemoryLedgerStore,
    }

    impl LockedStore {
        fn new(load_failures: usize, saved: LedgerSnapshot) -> Self {
            Self {
                load_failures: AtomicUsize::new(load_failures),
                inner: MemoryLedgerStore::with_snapshot(saved),
            }
        }
    }

    impl LedgerStore for LockedStore {
        fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), String> {
            self.inner.save(snapshot)
        }

        fn load(&self) -> Result<Option<LedgerSnapshot>, String> {
            let remaining = self.load_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.load_failures.store(remaining - 1, Ordering::SeqCst);
                return Err("database is locked".to_string());
            }
            self.inner.load()
        }
    }

    fn veteran_snapshot() -> LedgerSnapshot {
        LedgerSnapshot {
            total_started: 30,
            total_completed: 25,
            current_streak: 3,
            best_streak: 12,
            total_points: 9000,
            achievements: BTreeSet::from([
                Achievement::FirstLiberation,
                Achievement::BondCutter,
                Achievement::LightSoul,
            ]),
            last_completed_on: NaiveDate::from_ymd_opt(2026, 5, 20),
            honored_vows: BTreeSet::new(),
        }
    }

    #[test]
    fn test_failed_load_never_overwrites_saved_ledger() {
        let clock = Arc::new(ManualClock::new(noon(1)));
        let store = Arc::new(LockedStore::new(1, veteran_snapshot()));
        let mut ledger = MetricsLedger::open(store.clone(), clock);
        assert!(!ledger.is_loaded());

        let mut entry = SessionEntry::new(BondType::Karmic, Approach::Spiritual, "x", 8, noon(1));
        entry.finalize(SessionStatus::Abandoned, noon(1));
        ledger.record_session(&entry);

        assert!(ledger.is_loaded());
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.total_points, 9000);
        assert_eq!(saved.total_started, 31);
        assert_eq!(saved.best_streak, 12);
        assert!(saved.achievements.contains(&Achievement::LightSoul));
        assert_eq!(&saved, ledger.snapshot());
    }

    #[test]
    fn test_records_replayed_once_ledger_is_readable() {
        let clock = Arc::new(ManualClock::new(noon(1)));
        let store = Arc::new(LockedStore::new(3, veteran_snapshot()));
        let mut ledger = MetricsLedger::open(store.clone(), clock);

        // still locked: the session is held back, the saved row untouched
        let mut entry = completed(5, 7, noon(1));
        entry.vow = Some(Vow {
            title: "Walk daily".to_string(),
            category: VowCategory::SelfCare,
            duration_days: 7,
            created_at: noon(1),
        });
        ledger.record_session(&entry);
        entry.vow_honored = Some(true);
        ledger.record_vow_honored(&entry);
        assert!(ledger.is_dirty());
        assert_eq!(store.inner.load().unwrap(), Some(veteran_snapshot()));

        assert!(ledger.flush());
        let snap = ledger.snapshot();
        assert_eq!(snap.total_completed, 26);
        assert_eq!(snap.total_started, 31);
        // 140 for the session, 50 for the vow, 100 for Vow Keeper
        assert_eq!(snap.total_points, 9000 + 140 + 50 + 100);
        assert_eq!(snap.current_streak, 1);
        assert_eq!(snap.best_streak, 12);
        assert!(snap.achievements.contains(&Achievement::LightSoul));
        assert_eq!(store.load().unwrap().as_ref(), Some(snap));
    }

    #[test]
    fn test_honored_vows_only_track_kept_vows() {
        let (mut ledger, _clock, _store) = ledger();
        ledger.record_session(&completed(5, 5, noon(1)));

        let mut broken = completed(5, 5, noon(1));
        broken.vow = Some(Vow {
            title: "No contact".to_string(),
            category: VowCategory::Detachment,
            duration_days: 30,
            created_at: noon(1),
        });
        broken.vow_honored = Some(false);
        ledger.record_session(&broken);

        let mut kept = completed(5, 5, noon(1));
        honored_vow(&mut kept);
        ledger.record_session(&kept);
        ledger.record_vow_honored(&kept);

        assert_eq!(ledger.snapshot().honored_vows, BTreeSet::from([kept.id]));
    }
}
