use std::{fmt::Display, path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    daemon::{config::DEFAULT_API_URL, create_gateway},
    gateway::StatsGateway,
    utils::dir::create_application_default_path,
};

use super::{
    output::{render_record, render_summary, Styling},
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Where records are read from. Same defaults as the tracker.
#[derive(Debug, Parser)]
pub struct SourceArgs {
    #[arg(long, help = "Tracker data directory, used for the local mirror")]
    dir: Option<PathBuf>,
    #[arg(long, env = "LEETTRACK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    #[arg(long, help = "Read the local mirror only")]
    offline: bool,
    #[arg(long, help = "Disable colours")]
    plain: bool,
}

impl SourceArgs {
    fn gateway(&self) -> Result<Arc<dyn StatsGateway>> {
        let dir = self
            .dir
            .clone()
            .map_or_else(create_application_default_path, Ok)?;
        create_gateway(&self.api_url, self.offline, &dir)
    }

    fn styling(&self) -> Styling {
        if self.plain {
            Styling::Plain
        } else {
            Styling::Coloured
        }
    }
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(help = "Day to show. Examples are \"yesterday\", \"2024-01-15\", \"15/01/2024\". \
                  Without it every recorded day is listed")]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[command(flatten)]
    source: SourceArgs,
}

/// `today`: the record of the current local date.
pub async fn process_today_command(source: SourceArgs) -> Result<()> {
    let gateway = source.gateway()?;
    print_day(gateway.as_ref(), Local::now().date_naive(), source.styling()).await
}

/// `history`: one day in detail, or a summary line per recorded day.
pub async fn process_history_command(
    HistoryCommand {
        date,
        date_style,
        source,
    }: HistoryCommand,
) -> Result<()> {
    let gateway = source.gateway()?;
    let styling = source.styling();

    match date {
        Some(date) => {
            let date = parse_day(&date, Local::now(), date_style)?;
            print_day(gateway.as_ref(), date, styling).await
        }
        None => {
            let records = gateway.list().await?;
            if records.is_empty() {
                println!("Nothing recorded yet");
            }
            for record in records {
                println!("{}", render_summary(&record, styling));
            }
            Ok(())
        }
    }
}

async fn print_day(gateway: &dyn StatsGateway, date: NaiveDate, styling: Styling) -> Result<()> {
    match gateway.get(date).await? {
        Some(record) => println!("{}", render_record(&record, &Local, styling)),
        None => println!("No stats found for {date}"),
    }
    Ok(())
}

fn parse_day<Tz: TimeZone>(value: &str, now: DateTime<Tz>, style: DateStyle) -> Result<NaiveDate>
where
    Tz::Offset: Copy,
{
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    match parse_date_string(value, now, style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {value:?}: {e}"),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{parse_day, DateStyle};

    #[test]
    fn test_parse_day() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();

        assert_eq!(parse_day("2024-01-10", now, DateStyle::Uk).unwrap(), day(10));
        assert_eq!(parse_day("yesterday", now, DateStyle::Uk).unwrap(), day(14));
        assert_eq!(parse_day("12/01/2024", now, DateStyle::Uk).unwrap(), day(12));
        assert_eq!(parse_day("01/12/2024", now, DateStyle::Us).unwrap(), day(12));
        assert!(parse_day("someday", now, DateStyle::Uk).is_err());
    }
}
