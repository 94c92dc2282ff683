//! Anime and manga.
//!
//! Both share one resource type, [`Media<K>`], parameterised by a
//! [`MediaKind`] that supplies the kind's URL segment, status tables and the
//! parsers for its extra attributes.

mod anime;
mod manga;
mod page;

pub use anime::{AnimeAttribute, AnimeAttributes, AnimeKind};
pub use manga::{MangaAttribute, MangaAttributes, MangaKind};

use crate::attributes::Attributes;
use crate::catalog::{Character, CharacterLink, Genre, GenreLink};
use crate::error::{Error, Result};
use crate::link::Link;
use crate::models::{CharacterRole, DateRange, RelatedLink, RelatedMedia, Score, Tag};
use crate::person::PersonLink;
use crate::parse::PageParser;
use crate::resource::{validate_numeric_id, Entity, Page, Resource, ResourceKind};
use crate::session::Session;
use scraper::Html;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use tracing::info;

/// Per-kind constants and extra parsers.
pub trait MediaKind: Send + Sync + 'static {
    const KIND: ResourceKind;
    /// Kind of the per-user list of this media
    const LIST_KIND: ResourceKind;
    /// URL segment, also the list export `type`
    const PATH: &'static str;
    /// Publication status by list-export ordinal
    const STATUS_TERMS: &'static [&'static str];
    /// User list status by ordinal; 5 is unused by the site
    const USER_STATUS_TERMS: [&'static str; 7];
    const CONSUMING_VERB: &'static str;

    type Extra: Attributes;

    fn parse_main_extra(parser: &PageParser, doc: &Html) -> Result<Self::Extra>;

    fn parse_characters_extra(
        _parser: &PageParser,
        _doc: &Html,
        _characters: Option<&HashMap<CharacterLink, CharacterRole<PersonLink>>>,
    ) -> Result<Self::Extra> {
        Ok(Self::Extra::default())
    }

    /// Extra record carrying an airing or publishing range.
    fn seed_dates(range: DateRange) -> Self::Extra;
}

attributes! {
    /// Attributes shared by anime and manga.
    pub struct CommonAttributes: CommonAttribute {
        title: String => Title @ Main,
        picture: String => Picture @ Main,
        /// Language → names
        alternative_titles: HashMap<String, Vec<String>> => AlternativeTitles @ Main,
        media_type: String => Type @ Main,
        status: String => Status @ Main,
        genres: Vec<GenreLink> => Genres @ Main,
        score: Score => Score @ Main,
        rank: u32 => Rank @ Main,
        popularity: u32 => Popularity @ Main,
        members: u32 => Members @ Main,
        favorites: u32 => Favorites @ Main,
        popular_tags: HashMap<Tag, Option<u32>> => PopularTags @ Main,
        synopsis: String => Synopsis @ Main,
        /// Relation ("Sequel", "Adaptation") → entries
        related: HashMap<String, Vec<RelatedLink>> => Related @ Main,
        characters: HashMap<CharacterLink, CharacterRole<PersonLink>> => Characters @ Characters,
        status_stats: HashMap<String, u32> => StatusStats @ Stats,
        score_stats: BTreeMap<u8, u32> => ScoreStats @ Stats,
    }
}

/// Common plus kind-specific attributes.
#[derive(Debug, Clone, Default)]
pub struct MediaAttributes<X> {
    pub common: CommonAttributes,
    pub extra: X,
}

impl<X: Default> MediaAttributes<X> {
    pub(crate) fn titled(title: String) -> Self {
        Self {
            common: CommonAttributes {
                title: Some(title),
                ..CommonAttributes::default()
            },
            extra: X::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaAttribute<A> {
    Common(CommonAttribute),
    Extra(A),
}

impl<X: Attributes> Attributes for MediaAttributes<X> {
    type Attribute = MediaAttribute<X::Attribute>;

    fn page(attribute: Self::Attribute) -> Page {
        match attribute {
            MediaAttribute::Common(common) => CommonAttributes::page(common),
            MediaAttribute::Extra(extra) => X::page(extra),
        }
    }

    fn merge(&mut self, other: Self) {
        self.common.merge(other.common);
        self.extra.merge(other.extra);
    }

    fn fill(&mut self, other: Self) {
        self.common.fill(other.common);
        self.extra.fill(other.extra);
    }
}

pub struct MediaEntity<K>(PhantomData<fn() -> K>);

pub type Media<K> = Resource<MediaEntity<K>>;
pub type Anime = Media<AnimeKind>;
pub type Manga = Media<MangaKind>;

pub type MediaLink<K> = Link<MediaEntity<K>>;
pub type AnimeLink = MediaLink<AnimeKind>;
pub type MangaLink = MediaLink<MangaKind>;

impl<K: MediaKind> Entity for MediaEntity<K> {
    type Id = u32;
    type Attributes = MediaAttributes<K::Extra>;
    const KIND: ResourceKind = K::KIND;

    fn validate(id: &u32) -> Result<()> {
        validate_numeric_id(K::KIND, *id)
    }

    fn url(base_url: &str, id: &u32, page: Page, slug: Option<&str>) -> String {
        let path = K::PATH;
        match (page, slug) {
            (Page::Main, _) | (_, None) => format!("{base_url}/{path}/{id}"),
            (page, Some(slug)) => format!("{base_url}/{path}/{id}/{slug}/{page}"),
        }
    }

    fn parse(session: &Session, id: &u32, page: Page, body: &str) -> Result<Self::Attributes> {
        page::parse::<K>(session, *id, page, body)
    }

    fn slug(attributes: &Self::Attributes) -> Option<String> {
        attributes
            .common
            .title
            .as_deref()
            .map(|title| urlencoding::encode(title).into_owned())
    }
}

impl<K: MediaKind> Media<K> {
    /// The entry most recently added to the site.
    pub async fn newest(session: &Session) -> Result<Self> {
        let url = format!(
            "{}/{}.php?o=9&c[]=a&c[]=d&cv=2&w=1",
            session.base_url(),
            K::PATH
        );
        let body = session.fetch(&url).await?;
        let id = page::newest_id(&body).map_err(|e| Error::MalformedPage {
            kind: K::KIND,
            id: "newest".to_string(),
            field: "newest",
            message: format!("{e:#}"),
        })?;

        info!(kind = %K::KIND, id, "Newest entry found");
        session.resource(id)
    }

    getters! {
        title: String => MediaAttribute::Common(CommonAttribute::Title), |a| a.common.title;
        /// URL of the cover picture.
        picture: String => MediaAttribute::Common(CommonAttribute::Picture), |a| a.common.picture;
        /// Language ("English", "Japanese", "Synonyms") → titles.
        alternative_titles: HashMap<String, Vec<String>>
            => MediaAttribute::Common(CommonAttribute::AlternativeTitles), |a| a.common.alternative_titles;
        /// "TV", "Movie", "Manga", ...
        media_type: String => MediaAttribute::Common(CommonAttribute::Type), |a| a.common.media_type;
        /// Publication status, one of the kind's status terms.
        status: String => MediaAttribute::Common(CommonAttribute::Status), |a| a.common.status;
        /// None while unscored.
        score: Score => MediaAttribute::Common(CommonAttribute::Score), |a| a.common.score;
        /// None while unranked.
        rank: u32 => MediaAttribute::Common(CommonAttribute::Rank), |a| a.common.rank;
        popularity: u32 => MediaAttribute::Common(CommonAttribute::Popularity), |a| a.common.popularity;
        members: u32 => MediaAttribute::Common(CommonAttribute::Members), |a| a.common.members;
        favorites: u32 => MediaAttribute::Common(CommonAttribute::Favorites), |a| a.common.favorites;
        /// Tag → number of users applying it, when shown.
        popular_tags: HashMap<Tag, Option<u32>>
            => MediaAttribute::Common(CommonAttribute::PopularTags), |a| a.common.popular_tags;
        synopsis: String => MediaAttribute::Common(CommonAttribute::Synopsis), |a| a.common.synopsis;
        /// List status key ("watching", "on_hold", ...) → users.
        status_stats: HashMap<String, u32>
            => MediaAttribute::Common(CommonAttribute::StatusStats), |a| a.common.status_stats;
        /// Score 1..=10 → votes.
        score_stats: BTreeMap<u8, u32>
            => MediaAttribute::Common(CommonAttribute::ScoreStats), |a| a.common.score_stats;
    }

    linked_getters! {
        genres: Vec<Genre> => MediaAttribute::Common(CommonAttribute::Genres), |a| a.common.genres;
        /// None when the page lists no related entries.
        related: HashMap<String, Vec<RelatedMedia>>
            => MediaAttribute::Common(CommonAttribute::Related), |a| a.common.related;
        /// Character → role and voice cast.
        characters: HashMap<Character, CharacterRole>
            => MediaAttribute::Common(CommonAttribute::Characters), |a| a.common.characters;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session, StubFetcher, BASE_URL};

    const BEBOP: &str = include_str!("../../fixtures/anime_1.html");
    const BEBOP_STATS: &str = include_str!("../../fixtures/anime_1_stats.html");
    const NOT_FOUND: &str = include_str!("../../fixtures/not_found.html");
    const FAVORITES_ROW: &str =
        r#"<div class="spaceit_pad"><span class="dark_text">Favorites:</span> 78,525</div>"#;

    fn main_url() -> String {
        format!("{BASE_URL}/anime/1")
    }

    fn without_favorites() -> String {
        assert!(BEBOP.contains(FAVORITES_ROW));
        BEBOP.replace(FAVORITES_ROW, "")
    }

    #[tokio::test]
    async fn test_construction_is_lazy() -> Result<()> {
        let fetcher = StubFetcher::new();
        let session = session(&fetcher, false);

        let anime = session.anime(1)?;
        let _manga = session.manga(1)?;
        assert!(!anime.is_loaded(Page::Main).await);
        assert_eq!(fetcher.request_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_main_page_fetched_once() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(main_url(), BEBOP);
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        assert_eq!(anime.title().await?.as_deref(), Some("Cowboy Bebop"));
        assert_eq!(anime.title().await?.as_deref(), Some("Cowboy Bebop"));
        assert_eq!(anime.rank().await?, Some(28));
        assert_eq!(fetcher.requests(), vec![main_url()]);

        Ok(())
    }

    #[tokio::test]
    async fn test_main_page_fields() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(main_url(), BEBOP);
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        assert_eq!(
            anime.picture().await?.as_deref(),
            Some("https://cdn.mal.test/images/anime/4/19644.jpg")
        );
        let titles = anime.alternative_titles().await?.expect("alternative titles");
        assert_eq!(titles["English"], vec!["Cowboy Bebop".to_string()]);
        assert_eq!(titles["Synonyms"], vec!["Kauboi Bebappu".to_string()]);
        assert_eq!(anime.media_type().await?.as_deref(), Some("TV"));
        assert_eq!(anime.status().await?.as_deref(), Some("Finished Airing"));
        assert_eq!(
            anime.genres().await?,
            Some(vec![session.genre(1)?, session.genre(24)?])
        );
        assert_eq!(
            anime.score().await?,
            Some(Score {
                value: 8.75,
                votes: 914_193
            })
        );
        assert_eq!(anime.popularity().await?, Some(39));
        assert_eq!(anime.members().await?, Some(1_771_505));
        assert_eq!(anime.favorites().await?, Some(78_525));

        let tags = anime.popular_tags().await?.expect("tags");
        assert_eq!(tags.get(&Tag::new("sci-fi")), Some(&None));

        let synopsis = anime.synopsis().await?.expect("synopsis");
        assert!(synopsis.starts_with("Crime is timeless."));
        assert!(synopsis.contains("Jet Black"));
        assert_eq!(fetcher.request_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_related_entries_are_seeded() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(main_url(), BEBOP);
        let session = session(&fetcher, false);

        let related = session.anime(1)?.related().await?.expect("related");
        let source = session.manga(173)?;
        let side_story = session.anime(5)?;
        assert_eq!(related["Adaptation"].len(), 2);
        assert!(related["Adaptation"].contains(&RelatedMedia::Manga(source.clone())));
        assert!(related["Side story"].contains(&RelatedMedia::Anime(side_story.clone())));

        // Both arms carry the link text as the entry's title.
        assert_eq!(source.title().await?.as_deref(), Some("Cowboy Bebop"));
        assert_eq!(
            side_story.title().await?.as_deref(),
            Some("Cowboy Bebop: Tengoku no Tobira")
        );
        assert_eq!(fetcher.request_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_stats_url_uses_title_slug() -> Result<()> {
        let stats_url = format!("{BASE_URL}/anime/1/Cowboy%20Bebop/stats");
        let fetcher = StubFetcher::new();
        fetcher.serve(main_url(), BEBOP);
        fetcher.serve(stats_url.clone(), BEBOP_STATS);
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        let stats = anime.status_stats().await?.expect("status stats");
        assert_eq!(fetcher.requests(), vec![main_url(), stats_url]);
        assert_eq!(stats["watching"], 104_683);
        assert_eq!(stats["on_hold"], 62_519);
        assert_eq!(stats["plan_to_watch"], 253_488);
        assert_eq!(stats.len(), 5);

        let scores = anime.score_stats().await?.expect("score stats");
        assert_eq!(scores[&10], 362_164);
        assert_eq!(scores[&1], 2_788);
        assert_eq!(scores[&5], 0);
        assert_eq!(scores.len(), 10);
        assert_eq!(fetcher.request_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_not_found_is_invalid() -> Result<()> {
        for suppress in [false, true] {
            let fetcher = StubFetcher::new();
            fetcher.serve(main_url(), NOT_FOUND);
            let session = session(&fetcher, suppress);

            let err = session.anime(1)?.title().await.unwrap_err();
            assert!(err.is_invalid(), "{err}");
            assert!(!err.is_malformed());
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_suppressed_field_left_unset() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(main_url(), without_favorites());
        let session = session(&fetcher, true);
        let anime = session.anime(1)?;

        assert_eq!(anime.favorites().await?, None);
        assert_eq!(anime.title().await?.as_deref(), Some("Cowboy Bebop"));
        assert_eq!(anime.members().await?, Some(1_771_505));
        assert_eq!(anime.episodes().await?, Some(26));
        assert_eq!(fetcher.request_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_unsuppressed_field_fails_page() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(main_url(), without_favorites());
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        let err = anime.title().await.unwrap_err();
        assert!(
            matches!(err, Error::MalformedPage { kind: ResourceKind::Anime, field: "favorites", .. }),
            "{err}"
        );
        assert!(!anime.is_loaded(Page::Main).await);
        assert!(anime.attributes().common.title.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_newest() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(
            format!("{BASE_URL}/anime.php?o=9&c[]=a&c[]=d&cv=2&w=1"),
            r##"<table><tr><td><div class="hoverinfo" rel="#41587"></div></td></tr></table>"##,
        );
        fetcher.serve(
            format!("{BASE_URL}/manga.php?o=9&c[]=a&c[]=d&cv=2&w=1"),
            "<p>nothing here</p>",
        );
        let session = session(&fetcher, false);

        assert_eq!(*Anime::newest(&session).await?.id(), 41587);
        let err = Manga::newest(&session).await.unwrap_err();
        assert!(matches!(err, Error::MalformedPage { field: "newest", .. }));

        Ok(())
    }
}
