//! Bounded in-process Progress Channel.

use crate::error::ApiError;
use crate::progress::event::ProgressEvent;
use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Ordered, one-directional destination for batch events.
///
/// `send` fails with `ApiError::ChannelClosed` once the consumer is gone; the
/// orchestrator treats that as cancellation.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn send(&self, event: ProgressEvent) -> Result<(), ApiError>;
}

/// Create a bounded channel. Sends wait while `capacity` events are unread.
pub fn progress_channel(capacity: usize) -> (ChannelSink, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink { tx }, ProgressReceiver { rx })
}

/// Writing half of `progress_channel`
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn send(&self, event: ProgressEvent) -> Result<(), ApiError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ApiError::ChannelClosed("progress receiver dropped".to_string()))
    }
}

/// Reading half of `progress_channel`. Ends when every sink is dropped.
pub struct ProgressReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Stop accepting events; pending sends fail with `ChannelClosed`.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for ProgressReceiver {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sink that keeps every event in memory.
///
/// `closing_after(n)` accepts `n` events and then behaves like a disconnected client.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProgressEvent>>,
    accept_limit: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn closing_after(accept_limit: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            accept_limit: Some(accept_limit),
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(ProgressEvent::kind).collect()
    }
}

#[async_trait]
impl ProgressSink for MemorySink {
    async fn send(&self, event: ProgressEvent) -> Result<(), ApiError> {
        let mut events = self.events.lock();
        if let Some(limit) = self.accept_limit {
            if events.len() >= limit {
                return Err(ApiError::ChannelClosed("client disconnected".to_string()));
            }
        }
        events.push(event);
        Ok(())
    }
}
