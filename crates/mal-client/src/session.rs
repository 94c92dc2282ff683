//! Client sessions.

use crate::api::{Fetch, HttpFetcher};
use crate::catalog::{Character, Genre, Producer, Publication};
use crate::error::Result;
use crate::media::{Anime, Manga};
use crate::media_list::{AnimeList, MangaList};
use crate::models::Tag;
use crate::person::Person;
use crate::registry::Registry;
use crate::resource::{Entity, Resource};
use shared::ClientConfig;
use std::fmt;
use std::sync::Arc;
use tracing::info;

struct SessionState {
    base_url: String,
    suppress_parse_errors: bool,
    fetcher: Arc<dyn Fetch>,
    registry: Registry,
}

/// Shared client context: transport, parse-error policy and identity registry.
///
/// Cloning is cheap; clones share the same registry, so handles created from
/// any clone for the same identity share one attribute cache.
#[derive(Clone)]
pub struct Session {
    state: Arc<SessionState>,
}

impl Session {
    /// Session against the live site with default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    /// Session over HTTP using `config`'s base URL, user agent and timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Session using a caller-provided transport.
    pub fn with_fetcher(config: &ClientConfig, fetcher: Arc<dyn Fetch>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!(
            base_url = %base_url,
            suppress_parse_errors = config.suppress_parse_errors,
            "Session created"
        );

        Self {
            state: Arc::new(SessionState {
                base_url,
                suppress_parse_errors: config.suppress_parse_errors,
                fetcher,
                registry: Registry::new(),
            }),
        }
    }

    /// Site root, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.state.base_url
    }

    /// When set, unparsable optional fields are left unset instead of
    /// failing the page.
    pub fn suppress_parse_errors(&self) -> bool {
        self.state.suppress_parse_errors
    }

    /// Handle for any entity type. No network traffic happens here.
    pub fn resource<E: Entity>(&self, id: E::Id) -> Result<Resource<E>> {
        Resource::intern(self, id)
    }

    /// Anime handle for `id`.
    pub fn anime(&self, id: u32) -> Result<Anime> {
        self.resource(id)
    }

    /// Manga handle for `id`.
    pub fn manga(&self, id: u32) -> Result<Manga> {
        self.resource(id)
    }

    /// Person handle for `id`.
    pub fn person(&self, id: u32) -> Result<Person> {
        self.resource(id)
    }

    /// Character handle for `id`.
    pub fn character(&self, id: u32) -> Result<Character> {
        self.resource(id)
    }

    /// Producer (studio, licensor) handle for `id`.
    pub fn producer(&self, id: u32) -> Result<Producer> {
        self.resource(id)
    }

    /// Genre handle for `id`.
    pub fn genre(&self, id: u32) -> Result<Genre> {
        self.resource(id)
    }

    /// Magazine handle for `id`.
    pub fn publication(&self, id: u32) -> Result<Publication> {
        self.resource(id)
    }

    /// Tags are plain values; nothing is fetched for them.
    pub fn tag(&self, name: impl Into<String>) -> Tag {
        Tag::new(name)
    }

    /// Anime list of `username`, who needs at least 4 characters.
    pub fn anime_list(&self, username: impl Into<String>) -> Result<AnimeList> {
        self.resource(username.into())
    }

    /// Manga list of `username`, who needs at least 4 characters.
    pub fn manga_list(&self, username: impl Into<String>) -> Result<MangaList> {
        self.resource(username.into())
    }

    pub(crate) async fn fetch(&self, url: &str) -> Result<String> {
        self.state.fetcher.get(url).await
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.state.registry
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.state.base_url)
            .field("suppress_parse_errors", &self.state.suppress_parse_errors)
            .field("live_resources", &self.state.registry.live())
            .finish()
    }
}
