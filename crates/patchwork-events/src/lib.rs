#![forbid(unsafe_code)]

//! Unified event bus for the update engine.

mod bus;
mod download;
mod event;
mod task;

pub use bus::EventBus;
pub use download::{DownloadEvent, percent_of};
pub use event::Event;
pub use task::TaskEvent;
