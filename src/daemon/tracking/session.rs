use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    daemon::events::ActivitySignal, storage::entities::DailyRecord, utils::time::delta_ms,
};

use super::idle::{IdleEvaluator, Split};

/// Upper bound for active time reported by the page, one day.
const MAX_REPORTED_ACTIVE_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not tracking.
    Idle,
    /// Tracking, the user interacted recently.
    Active,
    /// Tracking session is open but nobody interacted for at least the idle threshold.
    AwayWhileActive,
}

/// The problem the user currently has open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentProblem {
    pub id: Option<String>,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub active_time: TimeDelta,
    pub last_active_at: DateTime<Utc>,
}

impl CurrentProblem {
    pub fn opened(
        id: Option<String>,
        title: String,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            started_at,
            active_time: TimeDelta::zero(),
            last_active_at: now,
        }
    }

    pub fn active_ms(&self) -> u64 {
        delta_ms(self.active_time)
    }
}

/// Transient state of a tracking session. Never persisted.
#[derive(Debug)]
pub struct TrackingSession {
    phase: Phase,
    /// Point up to which time was already accrued.
    tracking_start: Option<DateTime<Utc>>,
    last_activity: Option<DateTime<Utc>>,
    last_idle_start: Option<DateTime<Utc>>,
    current_problem: Option<CurrentProblem>,
    monitored_tabs: usize,
    /// Id and acceptance time of the last accepted submission. Survives rollovers.
    last_submission: Option<(String, i64)>,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            tracking_start: None,
            last_activity: None,
            last_idle_start: None,
            current_problem: None,
            monitored_tabs: 0,
            last_submission: None,
        }
    }
}

impl TrackingSession {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_tracking(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    pub fn current_problem(&self) -> Option<&CurrentProblem> {
        self.current_problem.as_ref()
    }

    pub fn monitored_tabs(&self) -> usize {
        self.monitored_tabs
    }

    pub fn set_monitored_tabs(&mut self, tabs: usize) {
        self.monitored_tabs = tabs;
    }

    /// Time away so far, zero unless the session is away.
    pub fn idle_duration(&self, now: DateTime<Utc>) -> TimeDelta {
        self.last_idle_start
            .map(|start| (now - start).max(TimeDelta::zero()))
            .unwrap_or_else(TimeDelta::zero)
    }

    pub fn is_away(&self) -> bool {
        self.last_idle_start.is_some()
    }

    /// True when `id` was accepted less than `window` milliseconds before `timestamp`.
    pub fn is_recent_submission(&self, id: &str, timestamp: i64, window: i64) -> bool {
        self.last_submission
            .as_ref()
            .is_some_and(|(last_id, last)| last_id == id && timestamp - last < window)
    }

    pub fn note_submission(&mut self, id: &str, timestamp: i64) {
        self.last_submission = Some((id.to_owned(), timestamp));
    }

    /// `Idle -> Active`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.phase = Phase::Active;
        self.tracking_start = Some(now);
        self.last_activity = Some(now);
        self.last_idle_start = None;
    }

    /// Any state `-> Idle`. Accrue before calling this, unaccrued time is dropped.
    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
        self.tracking_start = None;
        self.last_idle_start = None;
    }

    /// Keeps the session open but starts measuring from `now`, used when a new day begins.
    pub fn restart_accrual(&mut self, now: DateTime<Utc>) {
        if self.is_tracking() {
            self.tracking_start = Some(now);
        }
    }

    /// `Active -> AwayWhileActive`.
    pub fn go_away(&mut self, now: DateTime<Utc>) {
        if self.phase == Phase::Active {
            self.phase = Phase::AwayWhileActive;
            self.last_idle_start = Some(now);
        }
    }

    /// Registers an interaction. Returns true when the session came back from being away.
    pub fn touch(&mut self, now: DateTime<Utc>) -> bool {
        self.last_activity = Some(now);
        if self.phase == Phase::AwayWhileActive {
            self.phase = Phase::Active;
            self.last_idle_start = None;
            return true;
        }
        false
    }

    /// Moves time between the last accrual point and `now` into the record. The part past the
    /// idle boundary counts as idle, the rest as active. The accrual point always moves to
    /// `now`, so no span is counted twice.
    pub fn accrue(
        &mut self,
        record: &mut DailyRecord,
        now: DateTime<Utc>,
        evaluator: &IdleEvaluator,
    ) -> Split {
        if !self.is_tracking() {
            return Split::default();
        }
        let start = self.tracking_start.unwrap_or(now);
        let last_activity = self.last_activity.unwrap_or(start);
        let split = evaluator.split(start, now, last_activity);

        record.total_time_spent += delta_ms(split.active);
        record.idle_time_spent += delta_ms(split.idle);
        self.tracking_start = Some(now);
        split
    }

    pub fn open_problem(&mut self, problem: CurrentProblem) {
        self.current_problem = Some(problem);
    }

    /// Follows the problem mentioned by an activity signal. Time between two signals counts
    /// toward the problem up to `cap`.
    pub fn note_problem_activity(
        &mut self,
        signal: &ActivitySignal,
        now: DateTime<Utc>,
        cap: TimeDelta,
    ) {
        let title = signal
            .problem_title
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let same_problem = matches!(
            (&self.current_problem, title),
            (Some(current), Some(title)) if current.title == title
        );

        match title {
            Some(title) if !same_problem => {
                let mut problem =
                    CurrentProblem::opened(signal.problem_id.clone(), title.to_owned(), now, now);
                let measured = signal.active_time.unwrap_or(0).min(MAX_REPORTED_ACTIVE_MS);
                problem.active_time = TimeDelta::milliseconds(measured as i64);
                self.current_problem = Some(problem);
            }
            _ => {
                if let Some(current) = self.current_problem.as_mut() {
                    Self::extend_problem(current, now, cap);
                }
            }
        }
    }

    fn extend_problem(current: &mut CurrentProblem, now: DateTime<Utc>, cap: TimeDelta) {
        let gained = (now - current.last_active_at).clamp(TimeDelta::zero(), cap);
        current.active_time += gained;
        current.last_active_at = now;
    }
}
