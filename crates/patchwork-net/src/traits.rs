use std::{pin::Pin, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use url::Url;

use crate::{
    error::NetError,
    timeout::TimeoutNet,
    types::Headers,
};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, NetError>> + Send>>;

/// A successful response whose body has not been read yet.
pub struct ResponseBody {
    /// Declared `Content-Length`, if the server sent one.
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Net: Send + Sync {
    /// Open a streamed GET. Non-success statuses are reported as [`NetError::HttpStatus`].
    async fn stream(&self, url: Url, headers: Option<Headers>) -> Result<ResponseBody, NetError>;
}

pub trait NetExt: Net + Sized {
    /// Add timeout layer
    fn with_timeout(self, timeout: Duration) -> TimeoutNet<Self> {
        TimeoutNet::new(self, timeout)
    }
}

impl<T: Net> NetExt for T {}
