//! Anime: airing data, producers and the voice cast.

use super::page::{person_link, staff_tables};
use super::{Anime, MediaAttribute, MediaKind};
use crate::attributes::NameAttributes;
use crate::catalog::{CharacterLink, Producer, ProducerLink};
use crate::error::Result;
use crate::link::Link;
use crate::models::{CharacterRole, DateRange, VoiceActingRole};
use crate::parse::dates::parse_date_range;
use crate::parse::{
    child_elements, child_text, href, id_from_href, labelled, parse_known_count, sidebar_text,
    text, text_link, PageParser,
};
use crate::person::{Person, PersonLink};
use crate::resource::ResourceKind;
use anyhow::Context;
use scraper::Html;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub struct AnimeKind;

attributes! {
    /// Anime-only attributes.
    pub struct AnimeAttributes: AnimeAttribute {
        /// None while the count is unknown
        episodes: u32 => Episodes @ Main,
        aired: DateRange => Aired @ Main,
        producers: Vec<ProducerLink> => Producers @ Main,
        /// Per episode
        duration: Duration => Duration @ Main,
        rating: String => Rating @ Main,
        voice_actors: HashMap<PersonLink, Vec<VoiceActingRole<CharacterLink>>> => VoiceActors @ Characters,
        staff: HashMap<PersonLink, HashSet<String>> => Staff @ Characters,
    }
}

impl MediaKind for AnimeKind {
    const KIND: ResourceKind = ResourceKind::Anime;
    const LIST_KIND: ResourceKind = ResourceKind::AnimeList;
    const PATH: &'static str = "anime";
    const STATUS_TERMS: &'static [&'static str] = &[
        "Unknown",
        "Currently Airing",
        "Finished Airing",
        "Not yet aired",
    ];
    const USER_STATUS_TERMS: [&'static str; 7] = [
        "Unknown",
        "Watching",
        "Completed",
        "On-Hold",
        "Dropped",
        "Unknown",
        "Plan to Watch",
    ];
    const CONSUMING_VERB: &'static str = "watch";

    type Extra = AnimeAttributes;

    fn parse_main_extra(parser: &PageParser, doc: &Html) -> Result<AnimeAttributes> {
        Ok(AnimeAttributes {
            episodes: parser
                .field("episodes", sidebar_text(doc, "Episodes:").and_then(|v| parse_known_count(&v)))?
                .flatten(),
            aired: parser.field("aired", sidebar_text(doc, "Aired:").and_then(|v| parse_date_range(&v)))?,
            producers: parser.field("producers", producers(doc))?,
            duration: parser.field("duration", duration(doc))?.flatten(),
            rating: parser.field("rating", sidebar_text(doc, "Rating:"))?,
            ..AnimeAttributes::default()
        })
    }

    fn parse_characters_extra(
        parser: &PageParser,
        doc: &Html,
        characters: Option<&HashMap<CharacterLink, CharacterRole<PersonLink>>>,
    ) -> Result<AnimeAttributes> {
        Ok(AnimeAttributes {
            voice_actors: characters.map(voice_actors),
            staff: parser.field("staff", staff(doc))?,
            ..AnimeAttributes::default()
        })
    }

    fn seed_dates(range: DateRange) -> AnimeAttributes {
        AnimeAttributes {
            aired: Some(range),
            ..AnimeAttributes::default()
        }
    }
}

fn producers(doc: &Html) -> anyhow::Result<Vec<ProducerLink>> {
    labelled(doc, "Producers:")?
        .select(selector!("a[href*=\"/producer/\"]"))
        .map(|link| -> anyhow::Result<ProducerLink> {
            let id = id_from_href(href(link)?, "producer")?;
            Ok(Link::new(id, NameAttributes::named(text(link)))?)
        })
        .collect()
}

/// `"1 hr. 55 min."` → 115 minutes. None when no part carries a unit.
fn duration(doc: &Html) -> anyhow::Result<Option<Duration>> {
    let value = sidebar_text(doc, "Duration:")?;
    let mut minutes = 0;
    let mut matched = false;
    for part in value.split('.').map(str::trim) {
        let Some(caps) = regex!(r"^(\d+)").captures(part) else {
            continue;
        };
        let amount: u64 = caps[1].parse()?;
        if part.ends_with("hr") {
            minutes += amount * 60;
            matched = true;
        } else if part.ends_with("min") {
            minutes += amount;
            matched = true;
        }
    }
    Ok(matched.then(|| Duration::from_secs(minutes * 60)))
}

/// Inverts character → voice actors into voice actor → roles.
fn voice_actors(
    characters: &HashMap<CharacterLink, CharacterRole<PersonLink>>,
) -> HashMap<PersonLink, Vec<VoiceActingRole<CharacterLink>>> {
    let mut actors: HashMap<PersonLink, Vec<VoiceActingRole<CharacterLink>>> = HashMap::new();
    for (character, part) in characters {
        for (person, language) in &part.voice_actors {
            actors.entry(person.clone()).or_default().push(VoiceActingRole {
                role: part.role.clone(),
                character: character.clone(),
                language: language.clone(),
            });
        }
    }
    actors
}

fn staff(doc: &Html) -> anyhow::Result<HashMap<PersonLink, HashSet<String>>> {
    let mut staff = HashMap::new();
    for table in staff_tables(doc) {
        let row = table
            .select(selector!("tr"))
            .next()
            .context("staff table without rows")?;
        let cells = child_elements(row, "td");
        let column = *cells.get(1).context("staff column missing")?;
        let link = text_link(column, selector!("a[href*=\"/people/\"]"))
            .context("staff link missing")?;
        let duties = child_text(column, selector!("small")).context("staff duties missing")?;

        staff.insert(
            person_link(link)?,
            duties.split(", ").map(str::to_string).collect(),
        );
    }
    Ok(staff)
}

impl Anime {
    getters! {
        episodes: u32 => MediaAttribute::Extra(AnimeAttribute::Episodes), |a| a.extra.episodes;
        aired: DateRange => MediaAttribute::Extra(AnimeAttribute::Aired), |a| a.extra.aired;
        /// Length of one episode.
        duration: Duration => MediaAttribute::Extra(AnimeAttribute::Duration), |a| a.extra.duration;
        /// Age rating, e.g. "R - 17+ (violence & profanity)".
        rating: String => MediaAttribute::Extra(AnimeAttribute::Rating), |a| a.extra.rating;
    }

    linked_getters! {
        producers: Vec<Producer> => MediaAttribute::Extra(AnimeAttribute::Producers), |a| a.extra.producers;
        /// Voice actor → every role they voice in this anime.
        voice_actors: HashMap<Person, Vec<VoiceActingRole>>
            => MediaAttribute::Extra(AnimeAttribute::VoiceActors), |a| a.extra.voice_actors;
        /// Staff member → duties.
        staff: HashMap<Person, HashSet<String>>
            => MediaAttribute::Extra(AnimeAttribute::Staff), |a| a.extra.staff;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session, StubFetcher, BASE_URL};
    use chrono::NaiveDate;

    const BEBOP: &str = include_str!("../../fixtures/anime_1.html");
    const BEBOP_CHARACTERS: &str = include_str!("../../fixtures/anime_1_characters.html");

    fn serve_bebop(fetcher: &StubFetcher) {
        fetcher.serve(format!("{BASE_URL}/anime/1"), BEBOP);
        fetcher.serve(
            format!("{BASE_URL}/anime/1/Cowboy%20Bebop/characters"),
            BEBOP_CHARACTERS,
        );
    }

    #[tokio::test]
    async fn test_anime_main_page() -> Result<()> {
        let fetcher = StubFetcher::new();
        serve_bebop(&fetcher);
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        assert_eq!(anime.episodes().await?, Some(26));
        assert_eq!(
            anime.aired().await?,
            Some(DateRange {
                start: NaiveDate::from_ymd_opt(1998, 4, 3),
                end: NaiveDate::from_ymd_opt(1999, 4, 24),
            })
        );
        assert_eq!(anime.duration().await?, Some(Duration::from_secs(24 * 60)));
        assert_eq!(
            anime.rating().await?.as_deref(),
            Some("R - 17+ (violence & profanity)")
        );

        let producers = anime.producers().await?.expect("producers");
        assert_eq!(producers, vec![session.producer(23)?]);
        assert_eq!(producers[0].name().await?.as_deref(), Some("Bandai Visual"));
        assert_eq!(fetcher.request_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_episode_count() -> Result<()> {
        let fetcher = StubFetcher::new();
        fetcher.serve(
            format!("{BASE_URL}/anime/1"),
            BEBOP.replace(
                r#"<span class="dark_text">Episodes:</span> 26"#,
                r#"<span class="dark_text">Episodes:</span> Unknown"#,
            ),
        );
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        assert_eq!(anime.episodes().await?, None);
        assert!(anime.is_loaded(crate::resource::Page::Main).await);

        Ok(())
    }

    #[tokio::test]
    async fn test_characters_page() -> Result<()> {
        let fetcher = StubFetcher::new();
        serve_bebop(&fetcher);
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        let characters = anime.characters().await?.expect("characters");
        assert_eq!(characters.len(), 3);

        let spike = session.character(1)?;
        let part = &characters[&spike];
        assert_eq!(part.role, "Main");
        assert_eq!(part.voice_actors[&session.person(11)?], "Japanese");
        assert_eq!(part.voice_actors[&session.person(12)?], "English");
        assert_eq!(spike.name().await?.as_deref(), Some("Spike Spiegel"));

        let ein = &characters[&session.character(4)?];
        assert_eq!(ein.role, "Supporting");
        assert!(ein.voice_actors.is_empty());

        let yamadera = session.person(11)?;
        assert_eq!(yamadera.name().await?.as_deref(), Some("Koichi Yamadera"));
        assert_eq!(fetcher.request_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_voice_actors_and_staff() -> Result<()> {
        let fetcher = StubFetcher::new();
        serve_bebop(&fetcher);
        let session = session(&fetcher, false);
        let anime = session.anime(1)?;

        let actors = anime.voice_actors().await?.expect("voice actors");
        assert_eq!(actors.len(), 3);
        assert_eq!(
            actors[&session.person(14)?],
            vec![VoiceActingRole {
                role: "Main".to_string(),
                character: session.character(2)?,
                language: "Japanese".to_string(),
            }]
        );

        let staff = anime.staff().await?.expect("staff");
        let watanabe = session.person(2009)?;
        let duties: HashSet<String> = ["Director", "Storyboard", "Script"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(staff[&watanabe], duties);
        assert!(staff[&session.person(40009)?].contains("Producer"));
        assert_eq!(watanabe.name().await?.as_deref(), Some("Shinichiro Watanabe"));
        assert_eq!(fetcher.request_count(), 2);

        Ok(())
    }

    #[test]
    fn test_duration_units() -> anyhow::Result<()> {
        let page = |value: &str| {
            Html::parse_document(&format!(
                r#"<div><span class="dark_text">Duration:</span> {value}</div>"#
            ))
        };
        assert_eq!(
            duration(&page("1 hr. 55 min."))?,
            Some(Duration::from_secs(115 * 60))
        );
        assert_eq!(duration(&page("2 hr."))?, Some(Duration::from_secs(120 * 60)));
        assert_eq!(duration(&page("Unknown"))?, None);
        Ok(())
    }
}
