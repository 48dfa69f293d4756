#![forbid(unsafe_code)]

use std::path::PathBuf;

use patchwork_events::EventBus;
use patchwork_net::{Headers, NetOptions};
use patchwork_versions::RetentionPolicy;

/// Bundle file name inside every version directory.
pub const DEFAULT_BUNDLE_FILE: &str = "index.bundlejs";

/// Configuration of an [`UpdateContext`](crate::UpdateContext).
#[derive(Clone, Debug)]
pub struct UpdateConfig {
    /// Version root. Created on context construction.
    pub root_dir: PathBuf,
    /// Name of the executable bundle inside a version directory.
    pub bundle_file: String,
    /// Event bus channel capacity (used when `bus` is not provided).
    pub event_channel_capacity: usize,
    /// Event bus (optional - if not provided, one is created internally).
    pub bus: Option<EventBus>,
    pub retention: RetentionPolicy,
    /// Write buffer for staging files, in bytes.
    pub chunk_size: usize,
    /// Additional HTTP headers to include in all requests.
    pub headers: Option<Headers>,
    pub net: NetOptions,
}

impl UpdateConfig {
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            bundle_file: DEFAULT_BUNDLE_FILE.to_string(),
            event_channel_capacity: 64,
            bus: None,
            retention: RetentionPolicy::default(),
            chunk_size: 64 * 1024,
            headers: None,
            net: NetOptions::default(),
        }
    }

    #[must_use]
    pub fn with_bundle_file(mut self, name: impl Into<String>) -> Self {
        self.bundle_file = name.into();
        self
    }

    /// Set event bus for subscribing to update events.
    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn with_net(mut self, net: NetOptions) -> Self {
        self.net = net;
        self
    }
}
