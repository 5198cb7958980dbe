use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PriceError, Result};

/// Issues a GET and hands back the response body.
///
/// Connection failures and non-success statuses are both reported as
/// [`PriceError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceError::Transport {
                url: String::new(),
                message: format!("could not build HTTP client: {e}"),
            })?;
        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let transport_err = |message: String| PriceError::Transport {
            url: url.to_string(),
            message,
        };

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(transport_err(format!("upstream returned status {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| PriceError::Decode(format!("unreadable response body: {e}")))?;
        tracing::trace!("Nord Pool response: {} bytes", body.len());
        Ok(body)
    }
}
