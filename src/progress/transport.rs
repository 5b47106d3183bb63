//! NDJSON transport: drains a `ProgressReceiver` into any async writer.

use crate::error::ApiError;
use crate::progress::channel::ProgressReceiver;
use crate::progress::event::{ProgressEvent, WireMessage};
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

pub struct NdjsonTransport<W> {
    writer: W,
    lines_written: usize,
}

impl<W: AsyncWrite + Unpin + Send> NdjsonTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
        }
    }

    /// Write one event as a line and flush it to the client.
    pub async fn write_event(&mut self, event: ProgressEvent) -> Result<(), ApiError> {
        let line = WireMessage::from(event)
            .to_ndjson_line()
            .map_err(|e| ApiError::ChannelClosed(format!("failed to encode event: {}", e)))?;
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ApiError::ChannelClosed(format!("transport write failed: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ApiError::ChannelClosed(format!("transport flush failed: {}", e)))?;
        self.lines_written += 1;
        Ok(())
    }

    /// Forward events until `complete` has been written or the channel ends.
    ///
    /// On a write failure the receiver is dropped, so the producer sees a closed channel.
    pub async fn drain(mut self, mut receiver: ProgressReceiver) -> Result<W, ApiError> {
        while let Some(event) = receiver.next().await {
            let terminal = event.is_terminal();
            if let Err(err) = self.write_event(event).await {
                warn!(error = %err, lines = self.lines_written, "Progress transport stopped");
                receiver.close();
                return Err(err);
            }
            if terminal {
                break;
            }
        }
        debug!(lines = self.lines_written, "Progress transport finished");
        Ok(self.writer)
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
