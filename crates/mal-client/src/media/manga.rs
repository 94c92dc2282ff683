//! Manga: volumes, chapters and authorship.

use super::page::person_link;
use super::{Manga, MediaAttribute, MediaKind};
use crate::attributes::NameAttributes;
use crate::catalog::{Publication, PublicationLink};
use crate::error::Result;
use crate::link::Link;
use crate::models::DateRange;
use crate::parse::dates::parse_date_range;
use crate::parse::{
    href, id_from_href, labelled, parse_known_count, sidebar_text, text, text_link, PageParser,
};
use crate::person::{Person, PersonLink};
use crate::resource::ResourceKind;
use anyhow::Context;
use scraper::Html;
use std::collections::HashMap;

pub struct MangaKind;

attributes! {
    /// Manga-only attributes.
    pub struct MangaAttributes: MangaAttribute {
        volumes: u32 => Volumes @ Main,
        chapters: u32 => Chapters @ Main,
        published: DateRange => Published @ Main,
        authors: HashMap<PersonLink, String> => Authors @ Main,
        serialization: PublicationLink => Serialization @ Main,
    }
}

impl MediaKind for MangaKind {
    const KIND: ResourceKind = ResourceKind::Manga;
    const LIST_KIND: ResourceKind = ResourceKind::MangaList;
    const PATH: &'static str = "manga";
    const STATUS_TERMS: &'static [&'static str] =
        &["Unknown", "Publishing", "Finished", "Not yet published"];
    const USER_STATUS_TERMS: [&'static str; 7] = [
        "Unknown",
        "Reading",
        "Completed",
        "On-Hold",
        "Dropped",
        "Unknown",
        "Plan to Read",
    ];
    const CONSUMING_VERB: &'static str = "read";

    type Extra = MangaAttributes;

    fn parse_main_extra(parser: &PageParser, doc: &Html) -> Result<MangaAttributes> {
        Ok(MangaAttributes {
            volumes: parser
                .field("volumes", sidebar_text(doc, "Volumes:").and_then(|v| parse_known_count(&v)))?
                .flatten(),
            chapters: parser
                .field("chapters", sidebar_text(doc, "Chapters:").and_then(|v| parse_known_count(&v)))?
                .flatten(),
            published: parser
                .field("published", sidebar_text(doc, "Published:").and_then(|v| parse_date_range(&v)))?,
            authors: parser.field("authors", authors(doc))?,
            serialization: parser.field("serialization", serialization(doc))?.flatten(),
        })
    }

    fn seed_dates(range: DateRange) -> MangaAttributes {
        MangaAttributes {
            published: Some(range),
            ..MangaAttributes::default()
        }
    }
}

/// Author → role, from links written `Urasawa, Naoki (Story & Art)`.
fn authors(doc: &Html) -> anyhow::Result<HashMap<PersonLink, String>> {
    let row = labelled(doc, "Authors:")?;
    let mut authors = HashMap::new();
    for link in row.select(selector!("a[href*=\"/people/\"]")) {
        let role = link
            .next_sibling()
            .and_then(|node| node.value().as_text().map(|t| t.to_string()))
            .and_then(|after| {
                regex!(r"\(([^)]*)\)")
                    .captures(&after)
                    .map(|caps| caps[1].trim().to_string())
            })
            .with_context(|| format!("no role for author {:?}", text(link)))?;
        authors.insert(person_link(link)?, role);
    }
    Ok(authors)
}

/// None when the row reads "None".
fn serialization(doc: &Html) -> anyhow::Result<Option<PublicationLink>> {
    let row = labelled(doc, "Serialization:")?;
    let Some(link) = text_link(row, selector!("a[href*=\"/magazine/\"]")) else {
        return Ok(None);
    };
    let id = id_from_href(href(link)?, "magazine")?;
    Ok(Some(Link::new(id, NameAttributes::named(text(link)))?))
}

impl Manga {
    getters! {
        /// None while the count is unknown.
        volumes: u32 => MediaAttribute::Extra(MangaAttribute::Volumes), |a| a.extra.volumes;
        /// None while the count is unknown.
        chapters: u32 => MediaAttribute::Extra(MangaAttribute::Chapters), |a| a.extra.chapters;
        published: DateRange => MediaAttribute::Extra(MangaAttribute::Published), |a| a.extra.published;
    }

    linked_getters! {
        /// Author → role ("Story", "Art", "Story & Art").
        authors: HashMap<Person, String> => MediaAttribute::Extra(MangaAttribute::Authors), |a| a.extra.authors;
        /// Magazine the manga runs in.
        serialization: Publication
            => MediaAttribute::Extra(MangaAttribute::Serialization), |a| a.extra.serialization;
    }
}
