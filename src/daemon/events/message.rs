//! Newline-delimited JSON messages exchanged with the browser host.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    daemon::tracking::tracker::{CurrentStats, Reply},
    storage::entities::{DailyRecord, Difficulty, UNKNOWN_LANGUAGE, UNKNOWN_TITLE},
};

use super::{
    ActivitySignal, OpenedProblem, ReadQuery, Submission, TabState, TrackerEvent,
};

/// A parsed inbound line. `request_id` is echoed back verbatim in the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub request_id: Option<Value>,
    pub event: TrackerEvent,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum MessageBody {
    #[serde(rename_all = "camelCase")]
    Activity {
        #[serde(default)]
        problem_id: Option<String>,
        #[serde(default)]
        problem_title: Option<String>,
        #[serde(default)]
        active_time: Option<f64>,
    },
    ProblemOpened {
        data: OpenedData,
    },
    ProblemSolved {
        data: SolvedData,
    },
    #[serde(rename_all = "camelCase")]
    Tabs {
        #[serde(default)]
        active_url: Option<String>,
        #[serde(default)]
        monitored_tabs: i64,
    },
    GetCurrentStats,
    GetHistoryStats {
        date: NaiveDate,
    },
}

#[derive(Debug, Deserialize)]
struct OpenedData {
    #[serde(default)]
    problem_id: Option<String>,
    #[serde(default)]
    problem_name: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    start_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolvedData {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    time_spent: Option<f64>,
    #[serde(default)]
    submission_id: Option<Value>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<MessageBody> for TrackerEvent {
    fn from(body: MessageBody) -> Self {
        match body {
            MessageBody::Activity {
                problem_id,
                problem_title,
                active_time,
            } => TrackerEvent::Activity(ActivitySignal {
                problem_id: non_empty(problem_id),
                problem_title: non_empty(problem_title),
                active_time: active_time.map(|v| v.max(0.0) as u64),
            }),
            MessageBody::ProblemOpened { data } => TrackerEvent::ProblemOpened(OpenedProblem {
                id: non_empty(data.problem_id),
                title: non_empty(data.problem_name).unwrap_or_else(|| UNKNOWN_TITLE.into()),
                start_time: data.start_time.and_then(DateTime::from_timestamp_millis),
            }),
            MessageBody::ProblemSolved { data } => TrackerEvent::ProblemSolved(Submission {
                id: data.id,
                title: non_empty(data.title).unwrap_or_else(|| UNKNOWN_TITLE.into()),
                difficulty: data.difficulty,
                language: non_empty(data.language).unwrap_or_else(|| UNKNOWN_LANGUAGE.into()),
                url: non_empty(data.url),
                time_spent: data.time_spent.map(|v| v as i64),
                submission_id: data.submission_id.map(|v| match v {
                    Value::String(v) => v,
                    other => other.to_string(),
                }),
            }),
            MessageBody::Tabs {
                active_url,
                monitored_tabs,
            } => TrackerEvent::Tabs(TabState {
                active_url: non_empty(active_url),
                monitored_tabs: monitored_tabs.max(0) as usize,
            }),
            MessageBody::GetCurrentStats => TrackerEvent::Query(ReadQuery::CurrentStats),
            MessageBody::GetHistoryStats { date } => {
                TrackerEvent::Query(ReadQuery::History(date))
            }
        }
    }
}

pub fn parse_line(line: &str) -> Result<Inbound> {
    let value: Value = serde_json::from_str(line).context("Line is not valid json")?;
    let request_id = value.get("requestId").filter(|v| !v.is_null()).cloned();
    let body: MessageBody = serde_json::from_value(value).context("Unknown message")?;
    Ok(Inbound {
        request_id,
        event: body.into(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ReplyBody {
    CurrentStats(Box<CurrentStats>),
    HistoryStats(Option<DailyRecord>),
    Ack { success: bool },
}

impl From<Reply> for ReplyBody {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::CurrentStats(stats) => ReplyBody::CurrentStats(stats),
            Reply::History { record, .. } => ReplyBody::HistoryStats(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(flatten)]
    pub body: ReplyBody,
}

impl Outbound {
    pub fn ack(request_id: Value) -> Self {
        Self {
            request_id: Some(request_id),
            body: ReplyBody::Ack { success: true },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use crate::{
        daemon::events::{
            ActivitySignal, OpenedProblem, ReadQuery, Submission, TabState, TrackerEvent,
        },
        storage::entities::{DailyRecord, Difficulty},
    };

    use super::{parse_line, Outbound, ReplyBody};

    #[test]
    fn test_parse_activity() {
        let inbound = parse_line(
            r#"{"type":"activity","problemTitle":"Two Sum","activeTime":-5,"requestId":7}"#,
        )
        .unwrap();
        assert_eq!(inbound.request_id, Some(json!(7)));
        assert_eq!(
            inbound.event,
            TrackerEvent::Activity(ActivitySignal {
                problem_id: None,
                problem_title: Some("Two Sum".into()),
                active_time: Some(0),
            })
        );

        let bare = parse_line(r#"{"type":"activity"}"#).unwrap();
        assert_eq!(bare.request_id, None);
        assert_eq!(bare.event, TrackerEvent::Activity(ActivitySignal::default()));
    }

    #[test]
    fn test_parse_problem_opened() {
        let inbound = parse_line(
            r#"{"type":"problemOpened","data":{"problem_id":"two-sum","problem_name":"","start_time":1530698400000}}"#,
        )
        .unwrap();
        assert_eq!(
            inbound.event,
            TrackerEvent::ProblemOpened(OpenedProblem {
                id: Some("two-sum".into()),
                title: "Unknown Problem".into(),
                start_time: Some(Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap()),
            })
        );
    }

    #[test]
    fn test_parse_problem_solved_defaults() {
        let inbound = parse_line(
            r#"{"type":"problemSolved","data":{"id":"two-sum","difficulty":"Hardest","timeSpent":1500.7,"submissionId":123}}"#,
        )
        .unwrap();
        assert_eq!(
            inbound.event,
            TrackerEvent::ProblemSolved(Submission {
                id: "two-sum".into(),
                title: "Unknown Problem".into(),
                difficulty: Difficulty::Medium,
                language: "Unknown".into(),
                url: None,
                time_spent: Some(1500),
                submission_id: Some("123".into()),
            })
        );
    }

    #[test]
    fn test_parse_tabs_and_queries() {
        let tabs = parse_line(r#"{"type":"tabs","activeUrl":"https://leetcode.com","monitoredTabs":-1}"#)
            .unwrap();
        assert_eq!(
            tabs.event,
            TrackerEvent::Tabs(TabState {
                active_url: Some("https://leetcode.com".into()),
                monitored_tabs: 0,
            })
        );

        let query = parse_line(r#"{"type":"getHistoryStats","date":"2024-01-15","requestId":"h"}"#)
            .unwrap();
        assert_eq!(
            query.event,
            TrackerEvent::Query(ReadQuery::History(
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
            ))
        );
        assert_eq!(
            parse_line(r#"{"type":"getCurrentStats"}"#).unwrap().event,
            TrackerEvent::Query(ReadQuery::CurrentStats)
        );
    }

    #[test]
    fn test_malformed_lines() {
        assert!(parse_line("not json").is_err());
        assert!(parse_line(r#"{"type":"selfDestruct"}"#).is_err());
        assert!(parse_line(r#"{"type":"getHistoryStats","date":"yesterday"}"#).is_err());
        assert!(parse_line(r#"{"type":"problemSolved","data":{}}"#).is_err());
    }

    #[test]
    fn test_reply_shape() {
        let reply = Outbound {
            request_id: Some(json!("h")),
            body: ReplyBody::HistoryStats(Some(DailyRecord::empty(
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            ))),
        };
        assert_eq!(
            serde_json::to_value(reply).unwrap(),
            json!({
                "requestId": "h",
                "type": "historyStats",
                "data": {
                    "date": "2024-01-15",
                    "problemsSolved": [],
                    "problemsSolvedCount": 0,
                    "totalTimeSpent": 0,
                    "idleTimeSpent": 0,
                }
            })
        );

        let missing = Outbound {
            request_id: None,
            body: ReplyBody::HistoryStats(None),
        };
        assert_eq!(
            serde_json::to_value(missing).unwrap(),
            json!({ "type": "historyStats", "data": null })
        );
        assert_eq!(
            serde_json::to_value(Outbound::ack(json!(1))).unwrap(),
            json!({ "requestId": 1, "type": "ack", "data": { "success": true } })
        );
    }
}
