//! Remote sources fetched with an HTTP GET

use crate::{Error, Result, source::ByteSource};
use bytes::Bytes;
use tracing::debug;

/// Body of a successful HTTP response, pulled chunk by chunk
///
/// The total length is the declared `Content-Length`, absent when the
/// server omits it.
#[derive(Debug)]
pub struct HttpSource {
    response: reqwest::Response,
    total: Option<u64>,
}

impl HttpSource {
    /// Issue a GET with a default client
    pub async fn fetch(url: &str) -> Result<Self> {
        Self::get(&reqwest::Client::new(), url).await
    }

    /// Issue a GET with the given client; non-success statuses fail
    pub async fn get(client: &reqwest::Client, url: &str) -> Result<Self> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!("GET {url}: HTTP {status}")));
        }

        let total = response.content_length();
        debug!(%url, %status, ?total, "remote source opened");
        Ok(Self { response, total })
    }
}

impl ByteSource for HttpSource {
    fn total_len(&self) -> Option<u64> {
        self.total
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response
            .chunk()
            .await
            .map_err(|e| Error::transport(format!("reading response body: {e}")))
    }
}
