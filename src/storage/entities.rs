use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Problem";
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl From<Option<String>> for Difficulty {
    /// Anything the scraper couldn't classify counts as Medium.
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("easy") => Difficulty::Easy,
            Some(v) if v.eq_ignore_ascii_case("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        })
    }
}

/// An accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvedProblem {
    /// Problem slug on the site.
    pub id: String,
    #[serde(default = "unknown_title")]
    pub title: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "unknown_language")]
    pub language: String,
    /// Milliseconds spent on the problem.
    #[serde(default)]
    pub time_spent: u64,
    /// Epoch milliseconds of acceptance.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn unknown_title() -> String {
    UNKNOWN_TITLE.into()
}

fn unknown_language() -> String {
    UNKNOWN_LANGUAGE.into()
}

/// Aggregate of a single calendar day. Total and idle time are disjoint, both in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Newest first.
    #[serde(default)]
    pub problems_solved: Vec<SolvedProblem>,
    #[serde(default)]
    pub problems_solved_count: usize,
    #[serde(default)]
    pub total_time_spent: u64,
    #[serde(default)]
    pub idle_time_spent: u64,
}

impl DailyRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            problems_solved: vec![],
            problems_solved_count: 0,
            total_time_spent: 0,
            idle_time_spent: 0,
        }
    }

    /// Recomputes derived fields. The count is never trusted from the outside.
    pub fn normalized(mut self) -> Self {
        self.problems_solved_count = self.problems_solved.len();
        self
    }

    pub fn push_solved(&mut self, problem: SolvedProblem) {
        self.problems_solved.insert(0, problem);
        self.problems_solved_count = self.problems_solved.len();
    }

    /// Most recent accepted submission of the problem.
    pub fn last_solved(&self, id: &str) -> Option<&SolvedProblem> {
        self.problems_solved.iter().find(|v| v.id == id)
    }
}

/// Body of a write. `is_new_day` asks the store to only make sure the date exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPayload {
    #[serde(flatten)]
    pub record: DailyRecord,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new_day: bool,
}

/// What the store keeps on disk and returns to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStats {
    #[serde(flatten)]
    pub record: DailyRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
