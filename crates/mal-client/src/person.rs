//! People: voice actors, authors and staff.

use crate::attributes::NameAttributes;
use crate::catalog::{heading, Character, CharacterLink};
use crate::error::Result;
use crate::link::Link;
use crate::media::{Anime, AnimeLink, MediaAttributes};
use crate::parse::{
    child_text, first_of, href, id_from_href, is_tag, next_elements, normal_header,
    reorder_name, text, text_link, PageParser,
};
use crate::resource::{validate_numeric_id, Entity, Page, Resource, ResourceKind};
use crate::session::Session;
use anyhow::Context;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

attributes! {
    /// Attributes of a person page.
    pub struct PersonAttributes: PersonAttribute {
        name: String => Name @ Main,
        voice_acting_roles: HashMap<AnimeLink, HashMap<CharacterLink, String>> => VoiceActingRoles @ Main,
        anime_staff_positions: HashMap<AnimeLink, Vec<String>> => AnimeStaffPositions @ Main,
    }
}

impl PersonAttributes {
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

pub struct PersonEntity;

pub type Person = Resource<PersonEntity>;
pub type PersonLink = Link<PersonEntity>;

impl Entity for PersonEntity {
    type Id = u32;
    type Attributes = PersonAttributes;
    const KIND: ResourceKind = ResourceKind::Person;

    fn validate(id: &u32) -> Result<()> {
        validate_numeric_id(Self::KIND, *id)
    }

    fn url(base_url: &str, id: &u32, _page: Page, _slug: Option<&str>) -> String {
        format!("{base_url}/people/{id}")
    }

    fn parse(session: &Session, id: &u32, _page: Page, body: &str) -> Result<PersonAttributes> {
        let doc = Html::parse_document(body);
        let parser = PageParser::new(session, Self::KIND, id);
        parser.check_exists(&doc)?;

        let name = parser.field("name", heading(&doc).map(|name| reorder_name(&name)))?;
        if name.as_deref() == Some("Invalid") {
            return Err(parser.invalid());
        }

        Ok(PersonAttributes {
            name,
            voice_acting_roles: parser
                .field("voice_acting_roles", voice_acting_roles(&doc))?
                .flatten(),
            anime_staff_positions: parser
                .field("anime_staff_positions", staff_positions(&doc))?
                .flatten(),
        })
    }
}

impl Person {
    getters! {
        /// Name in "Given Family" order.
        name: String => PersonAttribute::Name, |a| a.name;
    }

    linked_getters! {
        /// Anime → character voiced → role ("Main", "Supporting").
        voice_acting_roles: HashMap<Anime, HashMap<Character, String>>
            => PersonAttribute::VoiceActingRoles, |a| a.voice_acting_roles;
        /// Anime → staff duties.
        anime_staff_positions: HashMap<Anime, Vec<String>>
            => PersonAttribute::AnimeStaffPositions, |a| a.anime_staff_positions;
    }
}

type Rows<'a> = Option<Vec<ElementRef<'a>>>;

fn table_rows<'a>(doc: &'a Html, table: &Selector) -> anyhow::Result<Rows<'a>> {
    let table = doc.select(table).next().context("table not found")?;
    Ok(Some(table.select(selector!("tr")).collect()))
}

/// Rows of the table following a `div.normal_header` section title; None
/// when the section is absent.
fn header_rows<'a>(doc: &'a Html, header: &str) -> anyhow::Result<Rows<'a>> {
    let Some(header) = normal_header(doc, header) else {
        return Ok(None);
    };
    Ok(next_elements(header)
        .find(|el| is_tag(*el, "table"))
        .map(|table| table.select(selector!("tr")).collect()))
}

fn anime_link(row: ElementRef) -> anyhow::Result<Option<AnimeLink>> {
    let Some(link) = text_link(row, selector!("a[href*=\"/anime/\"]")) else {
        return Ok(None);
    };
    let id = id_from_href(href(link)?, "anime")?;
    Ok(Some(Link::new(id, MediaAttributes::titled(text(link)))?))
}

fn voice_acting_roles(
    doc: &Html,
) -> anyhow::Result<Option<HashMap<AnimeLink, HashMap<CharacterLink, String>>>> {
    let rows = first_of(&[
        &|| table_rows(doc, selector!("table.js-table-people-character")),
        &|| header_rows(doc, "Voice Acting Roles"),
    ])?;
    let Some(rows) = rows else {
        return Ok(None);
    };

    let mut roles: HashMap<AnimeLink, HashMap<CharacterLink, String>> = HashMap::new();
    for row in rows {
        let Some(anime) = anime_link(row)? else {
            continue;
        };
        let Some(link) = text_link(row, selector!("a[href*=\"/character/\"]")) else {
            continue;
        };

        let character = Link::new(
            id_from_href(href(link)?, "character")?,
            NameAttributes::named(reorder_name(&text(link))),
        )?;
        let cell = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| is_tag(*el, "td"))
            .context("character link outside a table cell")?;
        let role = cell
            .select(selector!("div"))
            .find(|div| div.select(selector!("a")).next().is_none())
            .map(text)
            .filter(|role| !role.is_empty())
            .context("voice acting role not found")?;

        roles.entry(anime).or_default().insert(character, role);
    }

    Ok((!roles.is_empty()).then_some(roles))
}

fn staff_positions(doc: &Html) -> anyhow::Result<Option<HashMap<AnimeLink, Vec<String>>>> {
    let rows = first_of(&[
        &|| table_rows(doc, selector!("table.js-table-people-staff")),
        &|| header_rows(doc, "Anime Staff Positions"),
    ])?;
    let Some(rows) = rows else {
        return Ok(None);
    };

    let mut positions: HashMap<AnimeLink, Vec<String>> = HashMap::new();
    for row in rows {
        let Some(anime) = anime_link(row)? else {
            continue;
        };
        let duty = child_text(row, selector!("small")).context("staff position not found")?;
        positions.entry(anime).or_default().push(duty);
    }

    Ok((!positions.is_empty()).then_some(positions))
}
