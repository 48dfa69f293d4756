#![forbid(unsafe_code)]

use std::{path::Path, sync::Arc};

use futures::StreamExt;
use patchwork_events::{DownloadEvent, EventBus, percent_of};
use patchwork_net::{Headers, Net};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use url::Url;

use crate::{UpdateError, UpdateResult};

/// Streams an update artifact to a staging file with progress accounting.
#[derive(Clone)]
pub struct Downloader {
    net: Arc<dyn Net>,
    bus: EventBus,
    headers: Option<Headers>,
    buffer: usize,
}

impl Downloader {
    pub fn new(net: Arc<dyn Net>, bus: EventBus) -> Self {
        Self {
            net,
            bus,
            headers: None,
            buffer: 64 * 1024,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Option<Headers>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_buffer(mut self, bytes: usize) -> Self {
        self.buffer = bytes.max(1);
        self
    }

    /// Fetch `url` into `dest`, replacing any existing file.
    ///
    /// Publishes [`DownloadEvent::Progress`] whenever the rounded percentage
    /// grows, then once more with the exact final counts. Returns the number
    /// of bytes written. Without a declared length the received byte count
    /// is taken as the total.
    ///
    /// The caller removes `dest` on failure.
    pub async fn fetch(&self, url: &Url, dest: &Path, hash: &str) -> UpdateResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = self.net.stream(url.clone(), self.headers.clone()).await?;
        let declared = body.content_length;
        debug!(%url, hash, declared = ?declared, "download started");

        let file = tokio::fs::File::create(dest).await?;
        let mut out = BufWriter::with_capacity(self.buffer, file);
        let mut stream = body.stream;
        let mut received: u64 = 0;
        let mut last_percent = None;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    return Err(match declared {
                        Some(expected) if received < expected => {
                            debug!(hash, received, expected, error = %e, "stream ended early");
                            UpdateError::TruncatedTransfer { received, expected }
                        }
                        _ => e.into(),
                    });
                }
            };
            out.write_all(&bytes).await?;
            received += bytes.len() as u64;

            if let Some(total) = declared {
                let percent = percent_of(received, total);
                if percent > last_percent {
                    last_percent = percent;
                    self.progress(hash, received, total);
                }
            }
        }
        out.flush().await?;
        out.into_inner().sync_all().await?;

        let total = declared.unwrap_or(received);
        if received != total {
            return Err(UpdateError::TruncatedTransfer {
                received,
                expected: total,
            });
        }
        self.progress(hash, received, total);
        info!(%url, hash, bytes = received, "download finished");
        Ok(received)
    }

    fn progress(&self, hash: &str, received: u64, total: u64) {
        self.bus.publish(DownloadEvent::Progress {
            hash: hash.to_string(),
            received,
            total,
        });
    }
}
