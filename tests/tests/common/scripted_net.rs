use async_trait::async_trait;
use bytes::Bytes;
use patchwork::net::{Headers, Net, NetError, ResponseBody};
use url::Url;

/// Transport that declares a length, sends some bytes, then drops.
pub struct ScriptedNet {
    pub declared: u64,
    pub sent: usize,
}

#[async_trait]
impl Net for ScriptedNet {
    async fn stream(&self, _url: Url, _headers: Option<Headers>) -> Result<ResponseBody, NetError> {
        let items: Vec<Result<Bytes, NetError>> = vec![
            Ok(Bytes::from(vec![0x5a; self.sent])),
            Err(NetError::http("connection reset by peer")),
        ];
        Ok(ResponseBody {
            content_length: Some(self.declared),
            stream: Box::pin(futures::stream::iter(items)),
        })
    }
}
