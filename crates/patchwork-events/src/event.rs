#![forbid(unsafe_code)]

use crate::{DownloadEvent, TaskEvent};

/// Unified event for the update engine.
///
/// Hierarchical: each subsystem has its own variant with a sub-enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Download(DownloadEvent),
    Task(TaskEvent),
}

impl From<DownloadEvent> for Event {
    fn from(e: DownloadEvent) -> Self {
        Self::Download(e)
    }
}

impl From<TaskEvent> for Event {
    fn from(e: TaskEvent) -> Self {
        Self::Task(e)
    }
}
