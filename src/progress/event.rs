//! Event schema for batch progress.

use crate::artifact::Artifact;
use serde::{Deserialize, Serialize};

/// One ordered message from the orchestrator to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// An item is about to be attempted.
    Progress {
        percent_complete: f64,
        current_title: String,
    },
    /// An item produced a persisted artifact (generated or fallback).
    Artifact(Artifact),
    /// An item produced no artifact.
    ItemError { spec_id: String, message: String },
    /// Final totals. Always the last event of a batch.
    Summary {
        total_attempted: usize,
        total_generated: usize,
        total_fallback: usize,
    },
}

impl ProgressEvent {
    /// Progress event for the item at `index` (0-based) out of `total`.
    pub fn progress(index: usize, total: usize, current_title: impl Into<String>) -> Self {
        let percent_complete = if total == 0 {
            0.0
        } else {
            index as f64 / total as f64 * 100.0
        };
        ProgressEvent::Progress {
            percent_complete,
            current_title: current_title.into(),
        }
    }

    /// Wire `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Artifact(_) => "document",
            ProgressEvent::ItemError { .. } => "error",
            ProgressEvent::Summary { .. } => "complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Summary { .. })
    }

    /// Spec id the event belongs to, for item-level events.
    pub fn spec_id(&self) -> Option<&str> {
        match self {
            ProgressEvent::Artifact(artifact) => Some(&artifact.spec_id),
            ProgressEvent::ItemError { spec_id, .. } => Some(spec_id),
            _ => None,
        }
    }
}

/// Wire representation: one JSON object per line, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Progress {
        percent_complete: f64,
        current_title: String,
    },
    Document {
        document: Artifact,
    },
    Error {
        spec_id: String,
        message: String,
    },
    Complete {
        total_attempted: usize,
        total_generated: usize,
        total_fallback: usize,
    },
}

impl WireMessage {
    /// Serialize as a single newline-terminated JSON line.
    pub fn to_ndjson_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn into_event(self) -> ProgressEvent {
        match self {
            WireMessage::Progress {
                percent_complete,
                current_title,
            } => ProgressEvent::Progress {
                percent_complete,
                current_title,
            },
            WireMessage::Document { document } => ProgressEvent::Artifact(document),
            WireMessage::Error { spec_id, message } => ProgressEvent::ItemError { spec_id, message },
            WireMessage::Complete {
                total_attempted,
                total_generated,
                total_fallback,
            } => ProgressEvent::Summary {
                total_attempted,
                total_generated,
                total_fallback,
            },
        }
    }
}

impl From<ProgressEvent> for WireMessage {
    fn from(event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::Progress {
                percent_complete,
                current_title,
            } => WireMessage::Progress {
                percent_complete,
                current_title,
            },
            ProgressEvent::Artifact(document) => WireMessage::Document { document },
            ProgressEvent::ItemError { spec_id, message } => WireMessage::Error { spec_id, message },
            ProgressEvent::Summary {
                total_attempted,
                total_generated,
                total_fallback,
            } => WireMessage::Complete {
                total_attempted,
                total_generated,
                total_fallback,
            },
        }
    }
}
