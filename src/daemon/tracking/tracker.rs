use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    daemon::{
        config::TrackerConfig,
        events::{ActivitySignal, OpenedProblem, ReadQuery, Submission, TabState, TrackerEvent},
    },
    storage::entities::{DailyRecord, SolvedProblem},
    utils::time::{delta_ms, format_duration, next_day_start, until_next_day},
};

use super::{
    idle::IdleEvaluator,
    session::{CurrentProblem, Phase, TrackingSession},
    timers::{TimerKind, Timers},
};

/// Something the tracker needs the outside world to do after handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the full record.
    Persist(DailyRecord),
    /// Make sure the store has a record for a freshly started day.
    OpenDay(NaiveDate),
    Reply(Reply),
    /// Look a past day up in the store and reply with it.
    FetchHistory(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    CurrentStats(Box<CurrentStats>),
    History {
        date: NaiveDate,
        record: Option<DailyRecord>,
    },
}

/// The current record together with fields ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStats {
    #[serde(flatten)]
    pub record: DailyRecord,
    pub total_time: String,
    pub idle_time: String,
    pub current_problem: Option<String>,
    pub is_tracking: bool,
    pub is_idle: bool,
    pub idle_duration: String,
}

/// Owns the record of the current day and the tracking session. All changes go through
/// [Tracker::handle], which returns the effects the caller has to carry out.
pub struct Tracker<Tz: TimeZone = Local> {
    config: TrackerConfig,
    idle: IdleEvaluator,
    timezone: Tz,
    record: DailyRecord,
    session: TrackingSession,
    timers: Timers,
}

impl<Tz: TimeZone> Tracker<Tz> {
    pub fn new(config: TrackerConfig, timezone: Tz, now: DateTime<Utc>) -> Self {
        let date = now.with_timezone(&timezone).date_naive();
        let mut tracker = Self {
            idle: IdleEvaluator::from_seconds(config.idle_threshold_secs),
            config,
            timezone,
            record: DailyRecord::empty(date),
            session: TrackingSession::default(),
            timers: Timers::default(),
        };
        tracker.arm_midnight(now);
        tracker
    }

    pub fn record(&self) -> &DailyRecord {
        &self.record
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next()
    }

    pub fn due_timers(&mut self, now: DateTime<Utc>) -> Vec<TimerKind> {
        self.timers.take_due(now)
    }

    /// Takes over a record loaded from the store at startup. A record of an earlier day is
    /// closed and a new day is opened before any event is handled.
    pub fn restore(&mut self, stored: Option<DailyRecord>, now: DateTime<Utc>) -> Vec<Effect> {
        let today = self.today(now);
        let mut effects = vec![];
        match stored {
            Some(record) if record.date <= today => {
                info!("Restoring stats of {}", record.date);
                self.record = record.normalized();
                self.reconcile_date(now, &mut effects);
            }
            Some(record) => {
                warn!(
                    "Stored stats are dated {} which is after {today}, starting fresh",
                    record.date
                );
                effects.push(Effect::OpenDay(today));
            }
            None => effects.push(Effect::OpenDay(today)),
        }
        effects
    }

    pub fn handle(&mut self, event: TrackerEvent, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = vec![];
        self.reconcile_date(now, &mut effects);

        match event {
            TrackerEvent::Activity(signal) => self.on_activity(signal, now, &mut effects),
            TrackerEvent::ProblemOpened(problem) => {
                self.on_problem_opened(problem, now, &mut effects)
            }
            TrackerEvent::ProblemSolved(submission) => {
                self.on_problem_solved(submission, now, &mut effects)
            }
            TrackerEvent::Tabs(tabs) => self.on_tabs(tabs, now, &mut effects),
            TrackerEvent::Tick(kind) => self.on_tick(kind, now, &mut effects),
            TrackerEvent::Query(query) => self.on_query(query, now, &mut effects),
        }
        effects
    }

    /// Final accrual before shutdown.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = vec![];
        self.reconcile_date(now, &mut effects);
        self.accrue(now);
        effects.push(Effect::Persist(self.record.clone()));
        effects
    }

    /// Brings times up to date and returns the record with display fields.
    pub fn get_current_stats(&mut self, now: DateTime<Utc>) -> CurrentStats {
        self.accrue(now);
        CurrentStats {
            record: self.record.clone(),
            total_time: format_duration(self.record.total_time_spent),
            idle_time: format_duration(self.record.idle_time_spent),
            current_problem: self.session.current_problem().map(|v| v.title.clone()),
            is_tracking: self.session.is_tracking(),
            is_idle: self.session.is_away(),
            idle_duration: format_duration(delta_ms(self.session.idle_duration(now))),
        }
    }

    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    fn day_start(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        self.timezone
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()
            .map(|v| v.with_timezone(&Utc))
    }

    fn arm_midnight(&mut self, now: DateTime<Utc>) {
        let local = now.with_timezone(&self.timezone);
        debug!(
            "Next day starts in {}",
            format_duration(delta_ms(until_next_day(&local)))
        );
        let midnight = next_day_start(&local).with_timezone(&Utc);
        self.timers.arm(TimerKind::Midnight, midnight);
    }

    fn accrue(&mut self, now: DateTime<Utc>) {
        let split = self.session.accrue(&mut self.record, now, &self.idle);
        if !split.idle.is_zero() {
            debug!("Credited {}ms as idle", split.idle.num_milliseconds());
        }
    }

    fn reconcile_date(&mut self, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let today = self.today(now);
        if today > self.record.date {
            self.rollover(today, now, effects);
        } else if today < self.record.date {
            warn!(
                "Clock reports {today} which is before {}, keeping the current record",
                self.record.date
            );
        }
    }

    /// Closes the current record and opens `today`. The closed record only gets time up to its
    /// own end of day. Days skipped while nothing ran get no time at all.
    fn rollover(&mut self, today: NaiveDate, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let closed_until = self
            .record
            .date
            .succ_opt()
            .and_then(|next| self.day_start(next))
            .map_or(now, |end| end.min(now));
        self.accrue(closed_until);
        let boundary = self.day_start(today).map_or(now, |start| start.min(now));
        if self.session.is_tracking() && boundary > closed_until {
            info!(
                "Dropping {} of the session spent on days with no record",
                format_duration(delta_ms(boundary - closed_until))
            );
        }

        let finished = std::mem::replace(&mut self.record, DailyRecord::empty(today));
        info!(
            "Closing {} with {} tracked, {} idle and {} solved",
            finished.date,
            format_duration(finished.total_time_spent),
            format_duration(finished.idle_time_spent),
            finished.problems_solved_count
        );
        effects.push(Effect::Persist(finished));

        if self.session.is_tracking() {
            if self.session.monitored_tabs() > 0 {
                info!("Continuing tracking into {today}");
                self.session.restart_accrual(boundary);
            } else {
                self.stop_tracking();
            }
        }

        effects.push(Effect::OpenDay(today));
        self.arm_midnight(now);
    }

    fn start_tracking(&mut self, now: DateTime<Utc>) {
        info!("Started tracking");
        self.session.start(now);
        self.timers
            .arm(TimerKind::Accrual, now + self.config.accrual_period);
    }

    fn stop_tracking(&mut self) {
        info!("Stopped tracking");
        self.session.stop();
        self.timers.cancel(TimerKind::Idle);
        self.timers.cancel(TimerKind::Accrual);
    }

    /// Any interaction with the site. Returns true when the phase changed.
    fn register_interaction(&mut self, now: DateTime<Utc>) -> bool {
        if self.session.monitored_tabs() == 0 {
            self.session.set_monitored_tabs(1);
        }

        let changed = if self.session.is_tracking() {
            self.accrue(now);
            let away_for = self.session.idle_duration(now);
            let returned = self.session.touch(now);
            if returned {
                info!("User returned after {}", format_duration(delta_ms(away_for)));
            }
            returned
        } else {
            self.start_tracking(now);
            true
        };

        self.timers
            .arm(TimerKind::Idle, self.idle.idle_from(now));
        changed
    }

    fn on_activity(&mut self, signal: ActivitySignal, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let changed = self.register_interaction(now);
        self.session
            .note_problem_activity(&signal, now, self.idle.threshold());
        if changed {
            effects.push(Effect::Persist(self.record.clone()));
        }
    }

    fn on_problem_opened(
        &mut self,
        problem: OpenedProblem,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        let changed = self.register_interaction(now);
        debug!("Opened problem {}", problem.title);
        self.session.open_problem(CurrentProblem::opened(
            problem.id,
            problem.title,
            problem.start_time.unwrap_or(now),
            now,
        ));
        if changed {
            effects.push(Effect::Persist(self.record.clone()));
        }
    }

    fn on_problem_solved(
        &mut self,
        submission: Submission,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        let timestamp = now.timestamp_millis();
        let window = self.config.duplicate_window.num_milliseconds();
        let in_record = self
            .record
            .last_solved(&submission.id)
            .is_some_and(|previous| timestamp - previous.timestamp < window);
        if in_record
            || self
                .session
                .is_recent_submission(&submission.id, timestamp, window)
        {
            debug!(
                "Ignoring duplicate submission {:?} of {}",
                submission.submission_id, submission.id
            );
            return;
        }

        let time_spent = submission
            .time_spent
            .or_else(|| {
                self.session
                    .current_problem()
                    .map(|v| v.active_time.num_milliseconds())
            })
            .unwrap_or(0)
            .max(0) as u64;

        info!(
            "Solved {} ({}) in {}",
            submission.title,
            submission.difficulty,
            format_duration(time_spent)
        );
        self.session.note_submission(&submission.id, timestamp);
        self.record.push_solved(SolvedProblem {
            id: submission.id,
            title: submission.title,
            difficulty: submission.difficulty,
            language: submission.language,
            time_spent,
            timestamp,
            url: submission.url,
        });
        effects.push(Effect::Persist(self.record.clone()));
    }

    fn on_tabs(&mut self, tabs: TabState, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let on_site = tabs
            .active_url
            .as_deref()
            .is_some_and(|url| self.config.is_monitored_url(url));

        if on_site {
            self.session.set_monitored_tabs(tabs.monitored_tabs.max(1));
            if !self.session.is_tracking() {
                self.start_tracking(now);
                self.timers
                    .arm(TimerKind::Idle, self.idle.idle_from(now));
                effects.push(Effect::Persist(self.record.clone()));
            }
            return;
        }

        self.session.set_monitored_tabs(tabs.monitored_tabs);
        if tabs.monitored_tabs == 0 && self.session.is_tracking() {
            info!("No {} tabs left", self.config.site);
            self.accrue(now);
            self.stop_tracking();
            effects.push(Effect::Persist(self.record.clone()));
        }
    }

    fn on_tick(&mut self, kind: TimerKind, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        match kind {
            TimerKind::Idle => self.on_idle_timer(now, effects),
            TimerKind::Accrual => {
                if self.session.is_tracking() {
                    self.accrue(now);
                    self.timers
                        .arm(TimerKind::Accrual, now + self.config.accrual_period);
                    effects.push(Effect::Persist(self.record.clone()));
                }
            }
            // The date was reconciled before the tick was dispatched.
            TimerKind::Midnight => self.arm_midnight(now),
        }
    }

    fn on_idle_timer(&mut self, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        if self.session.phase() != Phase::Active {
            return;
        }
        let Some(last_activity) = self.session.last_activity() else {
            return;
        };

        if self.idle.is_idle(last_activity, now) {
            self.accrue(now);
            self.session.go_away(now);
            info!("No activity since {last_activity}, marking the session idle");
            effects.push(Effect::Persist(self.record.clone()));
        } else {
            self.timers
                .arm(TimerKind::Idle, self.idle.idle_from(last_activity));
        }
    }

    fn on_query(&mut self, query: ReadQuery, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        match query {
            ReadQuery::CurrentStats => {
                let stats = self.get_current_stats(now);
                effects.push(Effect::Reply(Reply::CurrentStats(Box::new(stats))));
            }
            ReadQuery::History(date) if date == self.record.date => {
                self.accrue(now);
                effects.push(Effect::Reply(Reply::History {
                    date,
                    record: Some(self.record.clone()),
                }));
            }
            ReadQuery::History(date) => effects.push(Effect::FetchHistory(date)),
        }
    }
}
