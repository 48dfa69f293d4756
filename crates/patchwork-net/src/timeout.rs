use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::{
    error::NetError,
    traits::{Net, ResponseBody},
    types::Headers,
};

/// Bounds the request/response phase of another [`Net`]; the body is not timed.
pub struct TimeoutNet<N> {
    inner: N,
    timeout: Duration,
}

impl<N: Net> TimeoutNet<N> {
    pub fn new(inner: N, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<N: Net> Net for TimeoutNet<N> {
    async fn stream(&self, url: Url, headers: Option<Headers>) -> Result<ResponseBody, NetError> {
        tokio::time::timeout(self.timeout, self.inner.stream(url, headers))
            .await
            .map_err(|_| NetError::timeout())?
    }
}
