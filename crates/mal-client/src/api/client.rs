//! HTTP transport.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::ClientConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of raw page bodies.
///
/// A missing page is not a transport failure: a 404 body is returned so the
/// page parsers can recognise the site's not-found markers.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

/// Fetcher backed by a shared reqwest client, one GET per call.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

/// Statuses whose body is handed to the parsers.
fn is_readable(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_FOUND
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        debug!(url = %url, "Fetching page");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request error");
            Error::Http(e)
        })?;

        let status = response.status();
        if !is_readable(status) {
            warn!(url = %url, status = %status, "Request failed");
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(url = %url, status = %status, bytes = body.len(), "Page fetched");
        Ok(body)
    }
}
