use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    select,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::message::{parse_line, Inbound, Outbound};

/// Reads one message per line and forwards it to the tracker. End of input closes the channel,
/// which ends the tracker loop.
pub struct LineSource<R> {
    input: R,
    next: mpsc::Sender<Inbound>,
    shutdown: CancellationToken,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn new(input: R, next: mpsc::Sender<Inbound>, shutdown: CancellationToken) -> Self {
        Self {
            input,
            next,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut lines = self.input.lines();
        loop {
            let line = select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                info!("Input closed");
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line) {
                Ok(inbound) => {
                    debug!("Received {:?}", inbound.event);
                    if self.next.send(inbound).await.is_err() {
                        // Tracker is gone, nothing left to feed.
                        return Ok(());
                    }
                }
                Err(e) => warn!("Skipping malformed message {line:?}: {e:#}"),
            }
        }
    }
}

/// Writes replies as json lines.
pub struct ReplyWriter<W> {
    output: W,
    receiver: mpsc::UnboundedReceiver<Outbound>,
}

impl<W: AsyncWrite + Unpin> ReplyWriter<W> {
    pub fn new(output: W, receiver: mpsc::UnboundedReceiver<Outbound>) -> Self {
        Self { output, receiver }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(reply) = self.receiver.recv().await {
            let mut line = match serde_json::to_vec(&reply) {
                Ok(v) => v,
                Err(e) => {
                    error!("Failed to serialize reply {reply:?}: {e:?}");
                    continue;
                }
            };
            line.push(b'\n');
            self.output.write_all(&line).await?;
            self.output.flush().await?;
        }
        self.output.shutdown().await?;
        Ok(())
    }
}
