//! Lazily populated resource handles.
//!
//! A [`Resource`] is a cheap, clonable handle on shared per-entity state: the
//! identity, the owning [`Session`] and an attribute cache. Reading an
//! attribute that is not cached runs the fetch routine for the page that
//! carries it, merges everything that page yields, and returns the slot.
//!
//! Attribute records refer to other resources through
//! [`Link`](crate::link::Link)s, never through handles, so state is freed
//! once its last handle is dropped.

use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::link::Resolve;
use crate::session::Session;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// The kinds of remote entity the client knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Anime,
    Manga,
    Person,
    Character,
    Producer,
    Genre,
    Publication,
    AnimeList,
    MangaList,
}

impl ResourceKind {
    /// Lower-case name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Anime => "anime",
            ResourceKind::Manga => "manga",
            ResourceKind::Person => "person",
            ResourceKind::Character => "character",
            ResourceKind::Producer => "producer",
            ResourceKind::Genre => "genre",
            ResourceKind::Publication => "publication",
            ResourceKind::AnimeList => "anime list",
            ResourceKind::MangaList => "manga list",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page variants a resource can be populated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Main,
    Stats,
    Characters,
}

impl Page {
    /// Lower-case name, also the URL segment of slugged pages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Main => "main",
            Page::Stats => "stats",
            Page::Characters => "characters",
        }
    }

    /// Whether the page URL embeds the resource's title slug.
    pub fn needs_slug(&self) -> bool {
        matches!(self, Page::Stats | Page::Characters)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource type: its identity, attribute record, URLs and parsers.
pub trait Entity: Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Attributes: Attributes;

    const KIND: ResourceKind;

    /// Construction-time identity check.
    fn validate(id: &Self::Id) -> Result<()>;

    /// URL of `page` for `id`. `slug` is present for pages that need one.
    fn url(base_url: &str, id: &Self::Id, page: Page, slug: Option<&str>) -> String;

    /// Parse a fetched page into a partial attribute record.
    fn parse(session: &Session, id: &Self::Id, page: Page, body: &str) -> Result<Self::Attributes>;

    /// URL slug derived from cached attributes, for pages that need one.
    fn slug(_attributes: &Self::Attributes) -> Option<String> {
        None
    }
}

/// Attribute names of entity `E`.
pub type AttributeOf<E> = <<E as Entity>::Attributes as Attributes>::Attribute;

/// Numeric identities must be positive.
pub(crate) fn validate_numeric_id(kind: ResourceKind, id: u32) -> Result<()> {
    if id == 0 {
        return Err(Error::InvalidEntity {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

pub(crate) struct State<E: Entity> {
    id: E::Id,
    session: Session,
    attributes: Mutex<E::Attributes>,
    /// Pages fetched so far; the lock also serializes fetches.
    loaded: tokio::sync::Mutex<HashSet<Page>>,
}

/// Shared handle on one remote entity.
///
/// Equality and hashing use only the kind and identity, never cache state.
pub struct Resource<E: Entity> {
    state: Arc<State<E>>,
}

impl<E: Entity> Resource<E> {
    /// Look up or create the shared handle for `id` in `session`.
    pub(crate) fn intern(session: &Session, id: E::Id) -> Result<Self> {
        E::validate(&id)?;
        let state = session
            .registry()
            .get_or_insert(E::KIND, id.to_string(), || {
                Arc::new(State::<E> {
                    id: id.clone(),
                    session: session.clone(),
                    attributes: Mutex::new(E::Attributes::default()),
                    loaded: tokio::sync::Mutex::new(HashSet::new()),
                })
            });
        Ok(Self { state })
    }

    /// Identity the handle was created with.
    pub fn id(&self) -> &E::Id {
        &self.state.id
    }

    /// Kind of entity behind the handle.
    pub fn kind(&self) -> ResourceKind {
        E::KIND
    }

    /// Session the handle was created in.
    pub fn session(&self) -> &Session {
        &self.state.session
    }

    /// Whether `page` has already been fetched for this handle.
    pub async fn is_loaded(&self, page: Page) -> bool {
        self.state.loaded.lock().await.contains(&page)
    }

    /// Fetch `page` unless it was already loaded, then return the handle.
    pub async fn load(&self, page: Page) -> Result<&Self> {
        self.ensure_loaded(page).await?;
        Ok(self)
    }

    /// Snapshot of the attribute cache.
    pub fn attributes(&self) -> E::Attributes {
        self.lock_attributes().clone()
    }

    /// Fill unset slots from a seed record discovered on another page.
    pub(crate) fn seed(self, seed: E::Attributes) -> Self {
        self.lock_attributes().fill(seed);
        self
    }

    /// The get-or-fetch accessor behind every attribute getter.
    pub(crate) async fn get<T, F>(&self, attribute: AttributeOf<E>, slot: F) -> Result<Option<T>>
    where
        T: Clone + Send,
        F: Fn(&E::Attributes) -> Option<&T> + Send,
    {
        if let Some(value) = self.cached(&slot) {
            return Ok(Some(value));
        }

        let page = E::Attributes::page(attribute);
        debug!(
            kind = %E::KIND,
            id = %self.state.id,
            attribute = ?attribute,
            page = %page,
            "Attribute not cached"
        );
        self.ensure_loaded(page).await?;
        Ok(self.cached(&slot))
    }

    /// [`get`](Self::get) for slots holding links; the stored value is
    /// resolved into handles from this resource's session.
    pub(crate) async fn get_linked<T, F>(
        &self,
        attribute: AttributeOf<E>,
        slot: F,
    ) -> Result<Option<T::Output>>
    where
        T: Resolve + Clone + Send,
        F: Fn(&E::Attributes) -> Option<&T> + Send,
    {
        let stored = self.get(attribute, slot).await?;
        stored.map(|value| value.resolve(self.session())).transpose()
    }

    pub(crate) fn cached<T, F>(&self, slot: F) -> Option<T>
    where
        T: Clone,
        F: Fn(&E::Attributes) -> Option<&T>,
    {
        slot(&self.lock_attributes()).cloned()
    }

    async fn ensure_loaded(&self, page: Page) -> Result<()> {
        if self.is_loaded(page).await {
            return Ok(());
        }

        let slug = if page.needs_slug() {
            Some(self.slug().await?)
        } else {
            None
        };
        self.fetch(page, slug.as_deref()).await
    }

    /// The title-derived slug; loads the main page first when it is not cached.
    async fn slug(&self) -> Result<String> {
        let cached = E::slug(&self.lock_attributes());
        if let Some(slug) = cached {
            return Ok(slug);
        }

        self.fetch(Page::Main, None).await?;
        let loaded = E::slug(&self.lock_attributes());
        loaded.ok_or_else(|| Error::MalformedPage {
            kind: E::KIND,
            id: self.state.id.to_string(),
            field: "title",
            message: "a title is required to build the page URL".to_string(),
        })
    }

    async fn fetch(&self, page: Page, slug: Option<&str>) -> Result<()> {
        let mut loaded = self.state.loaded.lock().await;
        if loaded.contains(&page) {
            return Ok(());
        }

        let session = &self.state.session;
        let url = E::url(session.base_url(), &self.state.id, page, slug);
        let body = session.fetch(&url).await?;
        let parsed = E::parse(session, &self.state.id, page, &body)?;

        self.lock_attributes().merge(parsed);
        loaded.insert(page);

        info!(
            kind = %E::KIND,
            id = %self.state.id,
            page = %page,
            "Page loaded"
        );
        Ok(())
    }

    fn lock_attributes(&self) -> MutexGuard<'_, E::Attributes> {
        self.state
            .attributes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Entity> Clone for Resource<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Entity> PartialEq for Resource<E> {
    fn eq(&self, other: &Self) -> bool {
        self.state.id == other.state.id
    }
}

impl<E: Entity> Eq for Resource<E> {}

impl<E: Entity> Hash for Resource<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        E::KIND.hash(state);
        self.state.id.hash(state);
    }
}

impl<E: Entity> fmt::Debug for Resource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", E::KIND, self.state.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session, StubFetcher, BASE_URL};
    use std::collections::hash_map::DefaultHasher;

    /// Minimal two-page entity: `name` lives on the main page and `role` on
    /// the stats page, whose URL needs the name as slug.
    struct Probe;

    attributes! {
        struct ProbeAttributes: ProbeAttribute {
            name: String => Name @ Main,
            role: String => Role @ Stats,
        }
    }

    impl Entity for Probe {
        type Id = u32;
        type Attributes = ProbeAttributes;
        const KIND: ResourceKind = ResourceKind::Character;

        fn validate(id: &u32) -> Result<()> {
            validate_numeric_id(Self::KIND, *id)
        }

        fn url(base_url: &str, id: &u32, page: Page, slug: Option<&str>) -> String {
            match page {
                Page::Main => format!("{base_url}/probe/{id}"),
                _ => format!("{base_url}/probe/{id}/{}/{page}", slug.unwrap_or_default()),
            }
        }

        fn parse(_session: &Session, _id: &u32, page: Page, body: &str) -> Result<ProbeAttributes> {
            Ok(match page {
                Page::Main => ProbeAttributes {
                    name: Some(body.to_string()),
                    role: None,
                },
                _ => ProbeAttributes {
                    name: None,
                    role: Some(body.to_string()),
                },
            })
        }

        fn slug(attributes: &ProbeAttributes) -> Option<String> {
            attributes.name.clone()
        }
    }

    impl Resource<Probe> {
        async fn name(&self) -> Result<Option<String>> {
            self.get(ProbeAttribute::Name, |a| a.name.as_ref()).await
        }

        async fn role(&self) -> Result<Option<String>> {
            self.get(ProbeAttribute::Role, |a| a.role.as_ref()).await
        }
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[tokio::test]
    async fn test_construction_is_lazy() -> Result<()> {
        let fetcher = StubFetcher::new();
        let session = session(&fetcher, false);

        let probe = Resource::<Probe>::intern(&session, 1)?;
        assert_eq!(*probe.id(), 1);
        assert!(!probe.is_loaded(Page::Main).await);
        assert_eq!(fetcher.request_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_attribute_fetched_once() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(format!("{BASE_URL}/probe/1"), "Holo");
        let session = session(&fetcher, false);
        let probe = Resource::<Probe>::intern(&session, 1)?;

        assert_eq!(probe.name().await?.as_deref(), Some("Holo"));
        assert_eq!(probe.name().await?.as_deref(), Some("Holo"));
        assert_eq!(fetcher.request_count(), 1);
        assert!(probe.is_loaded(Page::Main).await);

        Ok(())
    }

    #[tokio::test]
    async fn test_slug_page_loads_title_first() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(format!("{BASE_URL}/probe/1"), "Holo");
        fetcher.serve(format!("{BASE_URL}/probe/1/Holo/stats"), "Main");
        let session = session(&fetcher, false);
        let probe = Resource::<Probe>::intern(&session, 1)?;

        assert_eq!(probe.role().await?.as_deref(), Some("Main"));
        assert_eq!(
            fetcher.requests(),
            vec![
                format!("{BASE_URL}/probe/1"),
                format!("{BASE_URL}/probe/1/Holo/stats"),
            ]
        );

        // Both pages are cached now.
        probe.name().await?;
        probe.role().await?;
        assert_eq!(fetcher.request_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_seeded_attribute_needs_no_fetch() -> Result<()> {
        let fetcher = StubFetcher::new();
        let session = session(&fetcher, false);
        let probe = Resource::<Probe>::intern(&session, 3)?.seed(ProbeAttributes {
            name: Some("Seeded".to_string()),
            role: None,
        });

        assert_eq!(probe.name().await?.as_deref(), Some("Seeded"));
        assert_eq!(fetcher.request_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_fetch() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(format!("{BASE_URL}/probe/9"), "Nine");
        let session = session(&fetcher, false);
        let probe = Resource::<Probe>::intern(&session, 9)?;

        let (a, b) = tokio::join!(probe.name(), probe.name());
        assert_eq!(a?, b?);
        assert_eq!(fetcher.request_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_on_next_read() -> Result<()> {
        let fetcher = StubFetcher::new();
        let session = session(&fetcher, false);
        let probe = Resource::<Probe>::intern(&session, 4)?;

        assert!(probe.name().await.is_err());
        assert!(!probe.is_loaded(Page::Main).await);

        fetcher.serve(format!("{BASE_URL}/probe/4"), "Four");
        assert_eq!(probe.name().await?.as_deref(), Some("Four"));
        assert_eq!(fetcher.request_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_identity_equality_ignores_load_state() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(format!("{BASE_URL}/probe/5"), "Five");
        let session = session(&fetcher, false);

        let loaded = Resource::<Probe>::intern(&session, 5)?;
        loaded.name().await?;
        let other_session = crate::testing::session(&fetcher, false);
        let fresh = Resource::<Probe>::intern(&other_session, 5)?;

        assert_eq!(loaded, fresh);
        assert_eq!(hash_of(&loaded), hash_of(&fresh));
        assert_ne!(loaded, Resource::<Probe>::intern(&session, 6)?);
        assert_eq!(format!("{loaded:?}"), "character(5)");

        Ok(())
    }

    #[test]
    fn test_zero_id_rejected_before_fetch() {
        let fetcher = StubFetcher::new();
        let session = session(&fetcher, false);

        let err = Resource::<Probe>::intern(&session, 0).unwrap_err();
        assert!(err.is_invalid());
        assert_eq!(fetcher.request_count(), 0);
    }
}
