//! Client library for MyAnimeList.
//!
//! Resources (anime, manga, people, user lists and the catalog entities they
//! link to) are lazily loaded: creating a handle costs nothing, and the
//! first read of an attribute fetches and parses the page that carries it.
//!
//! ```no_run
//! # async fn demo() -> mal_client::Result<()> {
//! let session = mal_client::Session::new()?;
//! let bebop = session.anime(1)?;
//! println!("{:?} ranked {:?}", bebop.title().await?, bebop.rank().await?);
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

pub mod api;
pub mod attributes;
pub mod catalog;
pub mod error;
pub mod link;
pub mod media;
pub mod media_list;
pub mod models;
mod parse;
pub mod person;
mod registry;
pub mod resource;
pub mod session;

#[cfg(test)]
mod testing;

pub use api::{Fetch, HttpFetcher};
pub use catalog::{Character, Genre, Producer, Publication};
pub use error::{Error, Result};
pub use link::{Link, Resolve};
pub use media::{Anime, AnimeKind, Manga, MangaKind, Media, MediaKind};
pub use media_list::{AnimeList, MangaList, MediaList};
pub use models::{
    CharacterRole, DateRange, ListEntry, ListStats, RelatedMedia, Score, Tag, VoiceActingRole,
};
pub use person::Person;
pub use resource::{Page, Resource, ResourceKind};
pub use session::Session;
