use anyhow::Result;
use chrono::NaiveDate;
use leettrack::{
    gateway::{http::HttpGateway, StatsGateway},
    server::serve,
    storage::{
        entities::{DailyRecord, Difficulty, SolvedProblem},
        record_storage::RecordStorageImpl,
    },
};
use tempfile::tempdir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// The tracker's client against a real server on a random port.
#[tokio::test]
async fn test_gateway_round_trip_through_server() -> Result<()> {
    let dir = tempdir()?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve(
        listener,
        RecordStorageImpl::new(dir.path().to_owned())?,
        shutdown.clone(),
    ));

    let gateway = HttpGateway::new(format!("http://{addr}/api/"))?;
    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

    assert_eq!(gateway.get(date).await?, None);
    assert_eq!(gateway.open_day(date).await?, DailyRecord::empty(date));

    let mut record = DailyRecord::empty(date);
    record.total_time_spent = 300_000;
    record.idle_time_spent = 60_000;
    record.push_solved(SolvedProblem {
        id: "two-sum".into(),
        title: "Two Sum".into(),
        difficulty: Difficulty::Easy,
        language: "rust".into(),
        time_spent: 120_000,
        timestamp: 1_705_312_800_000,
        url: Some("https://leetcode.com/problems/two-sum/".into()),
    });
    assert_eq!(gateway.upsert(record.clone()).await?, record);

    // Opening an existing day leaves it alone
    assert_eq!(gateway.open_day(date).await?, record);
    assert_eq!(gateway.get(date).await?, Some(record.clone()));
    assert_eq!(gateway.list().await?, vec![record]);

    shutdown.cancel();
    server.await??;
    Ok(())
}
