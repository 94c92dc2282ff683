//! Value types carried by resource attributes.

use crate::catalog::{Character, CharacterLink};
use crate::error::Result;
use crate::link::Resolve;
use crate::media::{Anime, AnimeLink, Manga, MangaLink};
use crate::person::{Person, PersonLink};
use crate::session::Session;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Aggregate user score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    /// Number of users who scored
    pub votes: u32,
}

/// Start and end of an airing or publishing run; either end may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// A user-applied tag. Tags have no page of their own, so this is a plain value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Related entries may cross media types (an anime's source manga).
///
/// Attribute records store the [`RelatedLink`] form; getters return handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelatedMedia<A = Anime, M = Manga> {
    Anime(A),
    Manga(M),
}

pub type RelatedLink = RelatedMedia<AnimeLink, MangaLink>;

impl Resolve for RelatedLink {
    type Output = RelatedMedia;

    fn resolve(&self, session: &Session) -> Result<RelatedMedia> {
        Ok(match self {
            RelatedMedia::Anime(anime) => RelatedMedia::Anime(anime.resolve(session)?),
            RelatedMedia::Manga(manga) => RelatedMedia::Manga(manga.resolve(session)?),
        })
    }
}

/// A character's part in one media entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRole<P: Eq + Hash = Person> {
    /// "Main" or "Supporting"
    pub role: String,
    /// Voice actor → language
    pub voice_actors: HashMap<P, String>,
}

impl Resolve for CharacterRole<PersonLink> {
    type Output = CharacterRole;

    fn resolve(&self, session: &Session) -> Result<CharacterRole> {
        Ok(CharacterRole {
            role: self.role.clone(),
            voice_actors: self.voice_actors.resolve(session)?,
        })
    }
}

/// One voice-acting credit on an anime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceActingRole<C = Character> {
    pub role: String,
    pub character: C,
    pub language: String,
}

impl Resolve for VoiceActingRole<CharacterLink> {
    type Output = VoiceActingRole;

    fn resolve(&self, session: &Session) -> Result<VoiceActingRole> {
        Ok(VoiceActingRole {
            role: self.role.clone(),
            character: self.character.resolve(session)?,
            language: self.language.clone(),
        })
    }
}

/// One row of a user's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub started: Option<NaiveDate>,
    pub finished: Option<NaiveDate>,
    /// User status term, e.g. "Completed"
    pub status: String,
    /// None when the user has not scored the entry
    pub score: Option<u8>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Summary block of a user's list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListStats {
    pub id: Option<u32>,
    pub name: Option<String>,
    /// Entries currently being watched or read
    pub consuming: u32,
    pub completed: u32,
    pub on_hold: u32,
    pub dropped: u32,
    pub plan_to_consume: u32,
    pub days_spent: Option<f64>,
}
