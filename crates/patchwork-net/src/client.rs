use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use url::Url;

use crate::{
    error::{NetError, NetResult},
    traits::{Net, ResponseBody},
    types::{Headers, NetOptions},
};

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
    options: NetOptions,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns [`NetError::Config`] if the underlying reqwest client cannot be built
    /// (e.g. the TLS backend fails to initialize).
    pub fn new(options: NetOptions) -> NetResult<Self> {
        let inner = Client::builder()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| NetError::Config(e.to_string()))?;
        Ok(Self { inner, options })
    }

    #[must_use]
    pub fn options(&self) -> &NetOptions {
        &self.options
    }

    fn apply_headers(
        &self,
        mut req: reqwest::RequestBuilder,
        headers: Option<Headers>,
    ) -> reqwest::RequestBuilder {
        let merged = self.options.default_headers.merged(headers.as_ref());
        for (k, v) in merged.iter() {
            req = req.header(k, v);
        }
        req
    }

    async fn send_checked(
        &self,
        url: Url,
        headers: Option<Headers>,
    ) -> NetResult<reqwest::Response> {
        let req = self.apply_headers(self.inner.get(url.clone()), headers);

        let resp = req.send().await.map_err(NetError::from)?;
        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "non-success response");
            return Err(NetError::http_status(status.as_u16(), url));
        }
        Ok(resp)
    }
}

#[async_trait]
impl Net for HttpClient {
    async fn stream(&self, url: Url, headers: Option<Headers>) -> Result<ResponseBody, NetError> {
        // No whole-request timeout for streaming: update packages can take arbitrary time.
        let resp = self.send_checked(url, headers).await?;
        let content_length = resp.content_length();
        let stream = resp.bytes_stream().map_err(NetError::from);
        Ok(ResponseBody {
            content_length,
            stream: Box::pin(stream),
        })
    }
}
