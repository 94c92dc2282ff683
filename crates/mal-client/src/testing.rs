//! Canned transport for unit tests.

use crate::api::Fetch;
use crate::error::{Error, Result};
use crate::session::Session;
use async_trait::async_trait;
use shared::ClientConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) const BASE_URL: &str = "https://mal.test";

/// Serves registered bodies by URL and records every request.
#[derive(Clone, Default)]
pub(crate) struct StubFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(&self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.lock().unwrap().insert(url.into(), body.into());
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| *r == url).count()
    }
}

#[async_trait]
impl Fetch for StubFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("no stub for {url}")))
    }
}

/// Session over `fetcher` rooted at [`BASE_URL`].
pub(crate) fn session(fetcher: &StubFetcher, suppress_parse_errors: bool) -> Session {
    let config = ClientConfig {
        base_url: BASE_URL.to_string(),
        suppress_parse_errors,
        ..ClientConfig::default()
    };
    Session::with_fetcher(&config, Arc::new(fetcher.clone()))
}
