//! Events the tracker reacts to. Everything that can change tracking state, including timers and
//! read queries, arrives as a [TrackerEvent] and goes through a single handler.

pub mod message;
pub mod source;

use chrono::{DateTime, NaiveDate, Utc};

use crate::storage::entities::Difficulty;

use super::tracking::timers::TimerKind;

/// User interaction on the site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivitySignal {
    pub problem_id: Option<String>,
    pub problem_title: Option<String>,
    /// Active milliseconds the page already measured for the problem.
    pub active_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedProblem {
    pub id: Option<String>,
    pub title: String,
    pub start_time: Option<DateTime<Utc>>,
}

/// An accepted submission as reported by the page. Text fields are already defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub language: String,
    pub url: Option<String>,
    /// Milliseconds, may be negative when the page clock misbehaves.
    pub time_spent: Option<i64>,
    pub submission_id: Option<String>,
}

/// Browser tab state. `monitored_tabs` counts open tabs on the monitored site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabState {
    pub active_url: Option<String>,
    pub monitored_tabs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadQuery {
    CurrentStats,
    History(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    Activity(ActivitySignal),
    ProblemOpened(OpenedProblem),
    ProblemSolved(Submission),
    Tabs(TabState),
    Tick(TimerKind),
    Query(ReadQuery),
}
