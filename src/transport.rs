//! HTTP transport used by the endpoint probes

use crate::errors::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::debug;

/// Status and (optionally) body of a probe response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A GET-only transport. Timeouts are the caller's responsibility.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn get(&self, url: &str, accept: &str, with_body: bool) -> Result<ProbeResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("provider_diagnostics/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn get(&self, url: &str, accept: &str, with_body: bool) -> Result<ProbeResponse> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = if with_body {
            response.text().await.map_err(classify)?
        } else {
            String::new()
        };

        Ok(ProbeResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> MonitorError {
    if err.is_builder() {
        MonitorError::InvalidRequest(err.to_string())
    } else if err.is_timeout() {
        MonitorError::Timeout
    } else {
        MonitorError::Http(err)
    }
}
