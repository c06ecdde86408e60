//! Domain events for the application.
//!
//! Processing milestones are broadcast on an event bus so observers such as
//! the CLI progress output can follow along without being wired into the
//! pipeline itself.

use serde::Serialize;
use std::path::PathBuf;

/// Sender half of the event bus. Emitting with no live subscribers is fine.
pub type EventBus = tokio::sync::broadcast::Sender<ProcessingEvent>;

#[must_use]
pub fn event_channel(buffer: usize) -> EventBus {
    tokio::sync::broadcast::channel(buffer).0
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ProcessingEvent {
    ScanStarted {
        root: PathBuf,
    },
    ScanFinished {
        processed: usize,
        skipped: usize,
        failed: usize,
    },
    FolderProcessed {
        path: PathBuf,
        kind: String,
        success: bool,
    },
    FolderSkipped {
        path: PathBuf,
        reason: String,
    },
    Error {
        message: String,
    },
}
