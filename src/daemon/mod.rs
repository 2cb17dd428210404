use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use args::DaemonArgs;
use chrono::{Local, TimeZone};
use config::TrackerConfig;
use events::source::{LineSource, ReplyWriter};
use persistence::PersistenceModule;
use tokio::{
    io::{AsyncBufRead, AsyncWrite, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracking::{module::TrackingModule, tracker::Tracker};

use crate::{
    gateway::{fallback::FallbackGateway, http::HttpGateway, local::LocalGateway, StatsGateway},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};

pub mod args;
pub mod config;
pub mod events;
pub mod persistence;
pub mod shutdown;
pub mod tracking;

const INBOUND_BUFFER: usize = 32;
const STDIN_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Represents the starting point for the daemon. Reads messages from stdin until it closes or
/// the process is asked to stop.
pub async fn start_daemon(args: DaemonArgs, dir: &Path) -> Result<()> {
    let gateway = create_gateway(&args.api_url, args.offline, dir)?;
    let shutdown_token = CancellationToken::new();

    let (_, result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        run_tracker(
            args.tracker_config(),
            Local,
            gateway,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            Box::new(DefaultClock),
            shutdown_token,
        ),
    );
    result
}

/// Blocking entry point shared by the daemon binary and `leettrack track`.
pub fn run_daemon(args: DaemonArgs) -> Result<()> {
    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(
        DAEMON_PREFIX,
        &app_dir.join("logs"),
        args.log,
        args.log_console,
    )?;

    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(start_daemon(args, &app_dir));
    // A read of stdin can't be cancelled, don't wait for it.
    runtime.shutdown_timeout(STDIN_SHUTDOWN_TIMEOUT);
    result.inspect_err(|e| error!("Daemon stopped with an error {e:?}"))
}

/// Remote store mirrored into `<dir>/records`, or the local files alone when offline.
pub fn create_gateway(api_url: &str, offline: bool, dir: &Path) -> Result<Arc<dyn StatsGateway>> {
    let local = LocalGateway::in_dir(dir.join("records"))?;
    if offline {
        info!("Running offline, records stay in {dir:?}");
        return Ok(Arc::new(local));
    }
    info!("Using the stats api at {api_url}");
    let remote = HttpGateway::new(api_url)?;
    Ok(Arc::new(FallbackGateway::new(remote, local)))
}

/// Wires the line source, the tracker, persistence and the reply writer together and runs them
/// until the input ends or `shutdown` is cancelled.
pub async fn run_tracker<Tz: TimeZone>(
    config: TrackerConfig,
    timezone: Tz,
    gateway: Arc<dyn StatsGateway>,
    input: impl AsyncBufRead + Unpin,
    output: impl AsyncWrite + Unpin,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
) -> Result<()> {
    let (inbound_sender, inbound_receiver) = mpsc::channel(INBOUND_BUFFER);
    let (persist_sender, persist_receiver) = mpsc::unbounded_channel();
    let (reply_sender, reply_receiver) = mpsc::unbounded_channel();

    let tracker = Tracker::new(config, timezone, clock.time());
    let source = LineSource::new(input, inbound_sender, shutdown.clone());
    let tracking = TrackingModule::new(
        tracker,
        inbound_receiver,
        persist_sender,
        reply_sender,
        gateway.clone(),
        shutdown,
        clock,
    );
    let persistence = PersistenceModule::new(persist_receiver, gateway);
    let writer = ReplyWriter::new(output, reply_receiver);

    let (source_result, tracking_result, persistence_result, writer_result) = tokio::join!(
        source.run(),
        tracking.run(),
        persistence.run(),
        writer.run(),
    );

    if let Err(source_result) = source_result {
        error!("Input module got an error {:?}", source_result);
    }

    if let Err(persistence_result) = persistence_result {
        error!("Persistence module got an error {:?}", persistence_result);
    }

    if let Err(writer_result) = writer_result {
        error!("Reply writer got an error {:?}", writer_result);
    }

    tracking_result
}
