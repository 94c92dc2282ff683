//! Page parsers shared by anime and manga.

use super::{CommonAttributes, MediaAttributes, MediaKind};
use crate::attributes::NameAttributes;
use crate::catalog::{CharacterLink, GenreLink};
use crate::error::Result;
use crate::link::Link;
use crate::models::{CharacterRole, RelatedLink, RelatedMedia, Score, Tag};
use crate::parse::{
    child_elements, child_text, first_of, first_text, h2, has_class, href, id_from_href, is_tag,
    labelled, next_elements, parse_count, parse_ranking, raw_text, reorder_name, sidebar_text,
    sidebar_value, text, text_link, PageParser,
};
use crate::person::{PersonAttributes, PersonLink};
use crate::resource::Page;
use crate::session::Session;
use anyhow::{bail, ensure, Context};
use scraper::{ElementRef, Html};
use std::collections::{BTreeMap, HashMap};

pub(super) fn parse<K: MediaKind>(
    session: &Session,
    id: u32,
    page: Page,
    body: &str,
) -> Result<MediaAttributes<K::Extra>> {
    let doc = Html::parse_document(body);
    let parser = PageParser::new(session, K::KIND, &id);
    parser.check_exists(&doc)?;

    match page {
        Page::Main => Ok(MediaAttributes {
            common: parse_main(&parser, &doc)?,
            extra: K::parse_main_extra(&parser, &doc)?,
        }),
        Page::Stats => Ok(MediaAttributes {
            common: CommonAttributes {
                status_stats: parser.field("status_stats", status_stats::<K>(&doc))?,
                score_stats: parser.field("score_stats", score_stats(&doc))?,
                ..CommonAttributes::default()
            },
            extra: K::Extra::default(),
        }),
        Page::Characters => {
            let characters = parser.field("characters", characters(&doc))?;
            let extra = K::parse_characters_extra(&parser, &doc, characters.as_ref())?;
            Ok(MediaAttributes {
                common: CommonAttributes {
                    characters,
                    ..CommonAttributes::default()
                },
                extra,
            })
        }
    }
}

fn parse_main(parser: &PageParser, doc: &Html) -> Result<CommonAttributes> {
    Ok(CommonAttributes {
        title: parser.field("title", title(doc))?,
        picture: parser.field("picture", picture(doc))?,
        alternative_titles: parser.field("alternative_titles", alternative_titles(doc))?,
        media_type: parser.field("type", sidebar_text(doc, "Type:"))?,
        status: parser.field("status", sidebar_text(doc, "Status:"))?,
        genres: parser.field("genres", genres(doc))?,
        score: parser.field("score", score(doc))?.flatten(),
        rank: parser.field("rank", ranking(doc, "Ranked:"))?.flatten(),
        popularity: parser.field("popularity", ranking(doc, "Popularity:"))?.flatten(),
        members: parser.field("members", count(doc, "Members:"))?,
        favorites: parser.field("favorites", count(doc, "Favorites:"))?,
        popular_tags: parser.field("popular_tags", popular_tags(doc))?,
        synopsis: parser.field("synopsis", synopsis(doc))?,
        related: parser.field("related", related(doc))?.flatten(),
        ..CommonAttributes::default()
    })
}

/// Id of the first entry on the recently-added listing.
pub(super) fn newest_id(body: &str) -> anyhow::Result<u32> {
    let doc = Html::parse_document(body);
    let entry = doc
        .select(selector!("div.hoverinfo"))
        .next()
        .context("no entries on the recently-added page")?;
    let rel = entry.value().attr("rel").context("entry has no rel")?;
    let id = rel.get(1..).unwrap_or_default();
    id.parse()
        .with_context(|| format!("bad entry reference {rel:?}"))
}

fn title(doc: &Html) -> anyhow::Result<String> {
    first_of(&[
        &|| first_text(doc, selector!("h1.title-name")),
        &|| first_text(doc, selector!("div#contentWrapper h1.h1 span")),
        &|| first_text(doc, selector!("span[itemprop=\"name\"]")),
    ])
    .context("title not found")
}

fn image_source(img: Option<ElementRef>) -> anyhow::Result<String> {
    let img = img.context("picture not found")?;
    let source = img
        .value()
        .attr("data-src")
        .or_else(|| img.value().attr("src"))
        .context("picture has no source")?;
    Ok(source.to_string())
}

fn picture(doc: &Html) -> anyhow::Result<String> {
    first_of(&[
        &|| image_source(doc.select(selector!("img[itemprop=\"image\"]")).next()),
        &|| image_source(doc.select(selector!("div#content table td img")).next()),
    ])
}

/// Language rows following the "Alternative Titles" heading; empty when the
/// heading is absent.
fn alternative_titles(doc: &Html) -> anyhow::Result<HashMap<String, Vec<String>>> {
    let mut titles = HashMap::new();
    let Some(header) = h2(doc, "Alternative Titles") else {
        return Ok(titles);
    };

    for row in next_elements(header) {
        if !(is_tag(row, "div") && has_class(row, "spaceit_pad")) {
            break;
        }
        let Some(label) = row.select(selector!("span.dark_text")).next() else {
            break;
        };
        let language = text(label).trim_end_matches(':').to_string();
        let names = sidebar_value(row)
            .split(", ")
            .map(str::to_string)
            .collect();
        titles.insert(language, names);
    }
    Ok(titles)
}

fn genre_row(doc: &Html) -> anyhow::Result<ElementRef<'_>> {
    first_of(&[&|| labelled(doc, "Genres:"), &|| labelled(doc, "Genre:")])
}

fn genres(doc: &Html) -> anyhow::Result<Vec<GenreLink>> {
    genre_row(doc)?
        .select(selector!("a[href*=\"/genre/\"]"))
        .map(|link| -> anyhow::Result<GenreLink> {
            let id = id_from_href(href(link)?, "genre")?;
            Ok(Link::new(id, NameAttributes::named(text(link)))?)
        })
        .collect()
}

fn score(doc: &Html) -> anyhow::Result<Option<Score>> {
    first_of(&[&|| score_microdata(doc), &|| score_sidebar(doc)])
}

fn score_microdata(doc: &Html) -> anyhow::Result<Option<Score>> {
    let value = first_text(doc, selector!("[itemprop=\"ratingValue\"]"))?;
    let votes = first_text(doc, selector!("[itemprop=\"ratingCount\"]"))?;
    if value == "N/A" {
        return Ok(None);
    }
    Ok(Some(Score {
        value: value.parse().with_context(|| format!("bad score {value:?}"))?,
        votes: parse_count(&votes)?,
    }))
}

fn score_sidebar(doc: &Html) -> anyhow::Result<Option<Score>> {
    let value = sidebar_text(doc, "Score:")?;
    let caps = regex!(r"^(N/A|\d+(?:\.\d+)?)\s*(?:\(scored by ([\d,]+) users?\))?")
        .captures(&value)
        .with_context(|| format!("bad score {value:?}"))?;
    if &caps[1] == "N/A" {
        return Ok(None);
    }
    Ok(Some(Score {
        value: caps[1].parse()?,
        votes: caps.get(2).map(|m| parse_count(m.as_str())).transpose()?.unwrap_or(0),
    }))
}

fn ranking(doc: &Html, label: &str) -> anyhow::Result<Option<u32>> {
    parse_ranking(&sidebar_text(doc, label)?)
}

fn count(doc: &Html, label: &str) -> anyhow::Result<u32> {
    parse_count(&sidebar_text(doc, label)?)
}

fn tag_count(link: ElementRef) -> Option<u32> {
    let title = link.value().attr("title")?;
    regex!(r"(\d+) people").captures(title)?[1].parse().ok()
}

fn popular_tags(doc: &Html) -> anyhow::Result<HashMap<Tag, Option<u32>>> {
    first_of(&[&|| tag_section(doc), &|| tags_from_genres(doc)])
}

fn tag_section(doc: &Html) -> anyhow::Result<HashMap<Tag, Option<u32>>> {
    let header = h2(doc, "Popular Tags").context("no tag section")?;
    let tags = next_elements(header)
        .find(|el| is_tag(*el, "span"))
        .context("tag section is empty")?;
    tags.select(selector!("a"))
        .map(|link| -> anyhow::Result<(Tag, Option<u32>)> {
            let count = tag_count(link).context("tag without a user count")?;
            Ok((Tag::new(text(link)), Some(count)))
        })
        .collect()
}

fn tags_from_genres(doc: &Html) -> anyhow::Result<HashMap<Tag, Option<u32>>> {
    Ok(genre_row(doc)?
        .select(selector!("a[href*=\"/genre/\"]"))
        .map(|link| (Tag::new(text(link).to_lowercase()), tag_count(link)))
        .collect())
}

fn synopsis(doc: &Html) -> anyhow::Result<String> {
    first_of(&[&|| synopsis_section(doc), &|| synopsis_microdata(doc)])
}

/// Text between the "Synopsis" heading and the next heading.
fn synopsis_section(doc: &Html) -> anyhow::Result<String> {
    let header = h2(doc, "Synopsis").context("no synopsis heading")?;
    let mut synopsis = String::new();
    for node in header.next_siblings() {
        if let Some(el) = ElementRef::wrap(node) {
            if is_tag(el, "h2") {
                break;
            }
            synopsis.extend(el.text());
        } else if let Some(t) = node.value().as_text() {
            synopsis.push_str(t);
        }
    }

    let synopsis = synopsis.trim();
    ensure!(!synopsis.is_empty(), "synopsis section is empty");
    Ok(synopsis.to_string())
}

fn synopsis_microdata(doc: &Html) -> anyhow::Result<String> {
    let el = doc
        .select(selector!("[itemprop=\"description\"]"))
        .next()
        .context("no description")?;
    Ok(raw_text(el))
}

/// Relation → entries. None when the page has no related-entries block.
fn related(doc: &Html) -> anyhow::Result<Option<HashMap<String, Vec<RelatedLink>>>> {
    let legacy = doc.select(selector!("table.anime_detail_related_anime")).next();
    let modern = doc.select(selector!("div.related-entries")).next();
    let related = match (legacy, modern) {
        (None, None) => return Ok(None),
        (Some(table), _) => related_table(table)?,
        (None, Some(block)) => related_entries(block)?,
    };
    Ok((!related.is_empty()).then_some(related))
}

/// An `/anime/{id}` or `/manga/{id}` link, titled with its text; other links are skipped.
fn related_link(link: ElementRef) -> anyhow::Result<Option<RelatedLink>> {
    let href = href(link)?;
    if let Ok(id) = id_from_href(href, "anime") {
        let seed = MediaAttributes::titled(text(link));
        return Ok(Some(RelatedMedia::Anime(Link::new(id, seed)?)));
    }
    if let Ok(id) = id_from_href(href, "manga") {
        let seed = MediaAttributes::titled(text(link));
        return Ok(Some(RelatedMedia::Manga(Link::new(id, seed)?)));
    }
    Ok(None)
}

fn relation_name(label: &str) -> String {
    let label = label.split(':').next().unwrap_or_default();
    let label = label.split(" (").next().unwrap_or_default();
    label.trim().to_string()
}

fn push_links<'a>(
    related: &mut HashMap<String, Vec<RelatedLink>>,
    relation: String,
    links: impl Iterator<Item = ElementRef<'a>>,
) -> anyhow::Result<()> {
    for link in links {
        if let Some(media) = related_link(link)? {
            related.entry(relation.clone()).or_default().push(media);
        }
    }
    Ok(())
}

fn related_table(table: ElementRef) -> anyhow::Result<HashMap<String, Vec<RelatedLink>>> {
    let mut related = HashMap::new();
    for row in table.select(selector!("tr")) {
        let cells = child_elements(row, "td");
        let [label, entries, ..] = cells[..] else {
            bail!("related row without entries");
        };
        let relation = relation_name(&text(label));
        push_links(&mut related, relation, entries.select(selector!("a")))?;
    }
    Ok(related)
}

fn related_entries(block: ElementRef) -> anyhow::Result<HashMap<String, Vec<RelatedLink>>> {
    let mut related = HashMap::new();
    for tile in block.select(selector!("div.entry")) {
        let relation = child_text(tile, selector!("div.relation")).context("tile without relation")?;
        let relation = relation_name(&relation);
        push_links(&mut related, relation, tile.select(selector!("div.title a")))?;
    }
    for row in block.select(selector!("table.entries-table tr")) {
        let cells = child_elements(row, "td");
        let [label, entries, ..] = cells[..] else {
            bail!("related row without entries");
        };
        let relation = relation_name(&text(label));
        push_links(&mut related, relation, entries.select(selector!("a")))?;
    }
    Ok(related)
}

/// Status key for a user status term: "Plan to Watch" → "plan_to_watch".
fn status_key(term: &str) -> String {
    term.to_lowercase().replace([' ', '-'], "_")
}

fn status_stats<K: MediaKind>(doc: &Html) -> anyhow::Result<HashMap<String, u32>> {
    let mut stats = HashMap::new();
    for ordinal in [1, 2, 3, 4, 6] {
        let term = K::USER_STATUS_TERMS[ordinal];
        let users = match labelled(doc, &format!("{term}:")) {
            Ok(row) => parse_count(&sidebar_value(row))?,
            Err(_) => 0,
        };
        stats.insert(status_key(term), users);
    }
    Ok(stats)
}

/// Votes per score; scores missing from the page count zero votes.
fn score_stats(doc: &Html) -> anyhow::Result<BTreeMap<u8, u32>> {
    let mut stats: BTreeMap<u8, u32> = (1..=10).map(|score| (score, 0)).collect();
    let Some(header) = h2(doc, "Score Stats") else {
        return Ok(stats);
    };
    let Some(table) = next_elements(header).find(|el| is_tag(*el, "table")) else {
        return Ok(stats);
    };

    for row in table.select(selector!("tr")) {
        let score = child_text(row, selector!("td")).context("score row without a score")?;
        let score: u8 = score
            .parse()
            .with_context(|| format!("bad score {score:?}"))?;
        let votes = child_text(row, selector!("small")).context("score row without votes")?;
        let caps = regex!(r"([\d,]+)\s+votes")
            .captures(&votes)
            .with_context(|| format!("bad vote count {votes:?}"))?;
        stats.insert(score, parse_count(&caps[1])?);
    }
    Ok(stats)
}

fn characters(doc: &Html) -> anyhow::Result<HashMap<CharacterLink, CharacterRole<PersonLink>>> {
    let tables = first_of(&[
        &|| character_tables(doc),
        &|| legacy_character_tables(doc),
    ])?;
    tables
        .into_iter()
        .map(character_row)
        .collect()
}

fn character_tables(doc: &Html) -> anyhow::Result<Vec<ElementRef<'_>>> {
    let tables: Vec<_> = doc
        .select(selector!(
            "table.js-anime-character-table, table.js-manga-character-table"
        ))
        .collect();
    ensure!(!tables.is_empty(), "no character tables");
    Ok(tables)
}

/// Consecutive tables after the "Characters" heading; empty when absent.
fn legacy_character_tables(doc: &Html) -> anyhow::Result<Vec<ElementRef<'_>>> {
    let Some(header) = h2(doc, "Characters") else {
        return Ok(Vec::new());
    };
    Ok(next_elements(header)
        .take_while(|el| is_tag(*el, "table"))
        .collect())
}

fn character_row(
    table: ElementRef,
) -> anyhow::Result<(CharacterLink, CharacterRole<PersonLink>)> {
    let row = table
        .select(selector!("tr"))
        .next()
        .context("character table without rows")?;
    let cells = child_elements(row, "td");
    let column = *cells.get(1).context("character column missing")?;

    let link = text_link(column, selector!("a[href*=\"/character/\"]"))
        .context("character link missing")?;
    let character = Link::new(
        id_from_href(href(link)?, "character")?,
        NameAttributes::named(reorder_name(&text(link))),
    )?;

    let role = child_text(column, selector!("small"))
        .or_else(|| {
            column
                .select(selector!("div.spaceit_pad"))
                .last()
                .map(text)
        })
        .filter(|role| !role.is_empty())
        .context("character role missing")?;

    let mut voice_actors = HashMap::new();
    if let Some(actors) = cells.get(2) {
        for actor in actors.select(selector!("tr")) {
            let Some(link) = text_link(actor, selector!("a[href*=\"/people/\"]")) else {
                continue;
            };
            let person = person_link(link)?;
            let language = child_text(actor, selector!("small"))
                .or_else(|| child_text(actor, selector!("div.js-anime-character-language")))
                .context("voice actor language missing")?;
            voice_actors.insert(person, language);
        }
    }

    Ok((character, CharacterRole { role, voice_actors }))
}

/// Tables following the "Staff" heading of a characters page.
pub(super) fn staff_tables<'a>(doc: &'a Html) -> Vec<ElementRef<'a>> {
    let Some(header) = h2(doc, "Staff") else {
        return Vec::new();
    };
    next_elements(header)
        .take_while(|el| is_tag(*el, "table"))
        .collect()
}

/// A credited person, named by the link text.
pub(super) fn person_link(link: ElementRef) -> anyhow::Result<PersonLink> {
    let id = id_from_href(href(link)?, "people")?;
    Ok(Link::new(
        id,
        PersonAttributes::named(reorder_name(&text(link))),
    )?)
}
