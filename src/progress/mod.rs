//! Progress Channel primitives.
//!
//! The orchestrator writes `ProgressEvent`s into a `ProgressSink`; a transport drains
//! the receiving end and serializes each event to the wire.

pub mod channel;
pub mod event;
pub mod transport;

pub use channel::{progress_channel, ChannelSink, MemorySink, ProgressReceiver, ProgressSink};
pub use event::{ProgressEvent, WireMessage};
pub use transport::NdjsonTransport;
