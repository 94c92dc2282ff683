//! Name-only catalog resources: characters, producers, genres and publications.
//!
//! These are mostly discovered as links on other pages and seeded with the
//! link text; reading `name` on an unseeded handle loads its own page.

use crate::attributes::{NameAttribute, NameAttributes};
use crate::error::Result;
use crate::link::Link;
use crate::parse::{first_of, first_text, reorder_name, PageParser};
use crate::resource::{validate_numeric_id, Entity, Page, Resource, ResourceKind};
use crate::session::Session;
use scraper::Html;
use std::marker::PhantomData;

/// Site section a catalog resource lives in.
pub trait CatalogKind: Send + Sync + 'static {
    const KIND: ResourceKind;
    /// Path below the site root, without slashes
    const PATH: &'static str;
    /// Whether page headings are written "Family, Given"
    const REORDER_NAME: bool = false;
}

/// Characters; headings are written "Family, Given".
pub struct CharacterKind;
/// Studios, licensors and producers.
pub struct ProducerKind;
/// Anime and manga genres.
pub struct GenreKind;
/// Magazines manga are serialized in.
pub struct PublicationKind;

impl CatalogKind for CharacterKind {
    const KIND: ResourceKind = ResourceKind::Character;
    const PATH: &'static str = "character";
    const REORDER_NAME: bool = true;
}

impl CatalogKind for ProducerKind {
    const KIND: ResourceKind = ResourceKind::Producer;
    const PATH: &'static str = "anime/producer";
}

impl CatalogKind for GenreKind {
    const KIND: ResourceKind = ResourceKind::Genre;
    const PATH: &'static str = "anime/genre";
}

impl CatalogKind for PublicationKind {
    const KIND: ResourceKind = ResourceKind::Publication;
    const PATH: &'static str = "manga/magazine";
}

pub struct CatalogEntity<C>(PhantomData<fn() -> C>);

pub type Character = Resource<CatalogEntity<CharacterKind>>;
pub type Producer = Resource<CatalogEntity<ProducerKind>>;
pub type Genre = Resource<CatalogEntity<GenreKind>>;
pub type Publication = Resource<CatalogEntity<PublicationKind>>;

pub type CharacterLink = Link<CatalogEntity<CharacterKind>>;
pub type ProducerLink = Link<CatalogEntity<ProducerKind>>;
pub type GenreLink = Link<CatalogEntity<GenreKind>>;
pub type PublicationLink = Link<CatalogEntity<PublicationKind>>;

impl<C: CatalogKind> Entity for CatalogEntity<C> {
    type Id = u32;
    type Attributes = NameAttributes;
    const KIND: ResourceKind = C::KIND;

    fn validate(id: &u32) -> Result<()> {
        validate_numeric_id(C::KIND, *id)
    }

    fn url(base_url: &str, id: &u32, _page: Page, _slug: Option<&str>) -> String {
        format!("{base_url}/{}/{id}", C::PATH)
    }

    fn parse(session: &Session, id: &u32, _page: Page, body: &str) -> Result<NameAttributes> {
        let doc = Html::parse_document(body);
        let parser = PageParser::new(session, C::KIND, id);
        parser.check_exists(&doc)?;

        let name = parser.field("name", heading(&doc))?.map(|name| {
            if C::REORDER_NAME {
                reorder_name(&name)
            } else {
                name
            }
        });
        Ok(NameAttributes { name })
    }
}

/// Page heading, across both markup generations.
pub(crate) fn heading(doc: &Html) -> anyhow::Result<String> {
    first_of(&[
        &|| first_text(doc, selector!("h1.title-name")),
        &|| first_text(doc, selector!("div#contentWrapper h1.h1")),
        &|| first_text(doc, selector!("h1")),
    ])
}

impl<C: CatalogKind> Resource<CatalogEntity<C>> {
    getters! {
        /// Display name.
        name: String => NameAttribute::Name, |a| a.name;
    }
}
