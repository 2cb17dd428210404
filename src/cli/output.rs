use std::fmt::Display;

use ansi_term::Colour;
use chrono::{DateTime, TimeZone};

use crate::{
    storage::entities::{DailyRecord, Difficulty, SolvedProblem},
    utils::time::format_duration,
};

/// Whether the terminal output gets colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Styling {
    Plain,
    Coloured,
}

impl Styling {
    fn paint(self, colour: Colour, text: impl Display) -> String {
        match self {
            Styling::Plain => text.to_string(),
            Styling::Coloured => colour.paint(text.to_string()).to_string(),
        }
    }
}

fn difficulty_colour(difficulty: Difficulty) -> Colour {
    match difficulty {
        Difficulty::Easy => Colour::Green,
        Difficulty::Medium => Colour::Yellow,
        Difficulty::Hard => Colour::Red,
    }
}

/// One line summary of a day.
pub fn render_summary(record: &DailyRecord, styling: Styling) -> String {
    format!(
        "{}\ttracked {}\tidle {}\tsolved {}",
        styling.paint(Colour::Cyan, record.date),
        format_duration(record.total_time_spent),
        format_duration(record.idle_time_spent),
        record.problems_solved_count,
    )
}

/// A day with every solved problem, newest first. Acceptance times are shown in `timezone`.
pub fn render_record<Tz: TimeZone>(record: &DailyRecord, timezone: &Tz, styling: Styling) -> String
where
    Tz::Offset: Display,
{
    let mut output = render_summary(record, styling);
    for problem in &record.problems_solved {
        output.push('\n');
        output.push_str(&render_problem(problem, timezone, styling));
    }
    output
}

fn render_problem<Tz: TimeZone>(problem: &SolvedProblem, timezone: &Tz, styling: Styling) -> String
where
    Tz::Offset: Display,
{
    let accepted_at = DateTime::from_timestamp_millis(problem.timestamp)
        .map(|v| v.with_timezone(timezone).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".into());

    format!(
        "  {}\t{}\t{}\t{}\t{}",
        accepted_at,
        styling.paint(
            difficulty_colour(problem.difficulty),
            format!("{:<6}", problem.difficulty)
        ),
        format_duration(problem.time_spent),
        problem.language,
        problem.title,
    )
}
