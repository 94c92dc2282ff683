//! Per-user anime and manga lists.
//!
//! Lists come from the site's bulk XML export rather than an HTML page. The
//! export is deserialized into raw [`ListExport`] rows and then converted
//! entry by entry, so one bad row can be skipped under the session's
//! parse-error policy.

use crate::api::{ExportEntry, ExportStats, ListExport};
use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::link::Link;
use crate::media::{
    AnimeKind, CommonAttributes, MangaKind, Media, MediaAttributes, MediaKind, MediaLink,
};
use crate::models::{DateRange, ListEntry, ListStats};
use crate::parse::dates::parse_list_date;
use crate::resource::{Entity, Page, Resource, ResourceKind};
use crate::session::Session;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use tracing::{info, warn};

/// Shortest username the site accepts.
const MIN_USERNAME_LEN: usize = 4;

/// Root element of a list export.
const EXPORT_ROOT: &str = "myanimelist";

/// Entries and summary of one user's list.
pub struct MediaListAttributes<K: MediaKind> {
    pub list: Option<HashMap<MediaLink<K>, ListEntry>>,
    pub stats: Option<ListStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaListAttribute {
    List,
    Stats,
}

impl<K: MediaKind> Default for MediaListAttributes<K> {
    fn default() -> Self {
        Self {
            list: None,
            stats: None,
        }
    }
}

impl<K: MediaKind> Clone for MediaListAttributes<K> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<K: MediaKind> fmt::Debug for MediaListAttributes<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaListAttributes")
            .field("list", &self.list)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<K: MediaKind> Attributes for MediaListAttributes<K> {
    type Attribute = MediaListAttribute;

    fn page(_attribute: MediaListAttribute) -> Page {
        Page::Main
    }

    fn merge(&mut self, other: Self) {
        if other.list.is_some() {
            self.list = other.list;
        }
        if other.stats.is_some() {
            self.stats = other.stats;
        }
    }

    fn fill(&mut self, other: Self) {
        if self.list.is_none() {
            self.list = other.list;
        }
        if self.stats.is_none() {
            self.stats = other.stats;
        }
    }
}

pub struct MediaListEntity<K>(PhantomData<fn() -> K>);

pub type MediaList<K> = Resource<MediaListEntity<K>>;
pub type AnimeList = MediaList<AnimeKind>;
pub type MangaList = MediaList<MangaKind>;

impl<K: MediaKind> Entity for MediaListEntity<K> {
    type Id = String;
    type Attributes = MediaListAttributes<K>;
    const KIND: ResourceKind = K::LIST_KIND;

    fn validate(username: &String) -> Result<()> {
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(Error::InvalidMediaList {
                username: username.clone(),
                message: format!("usernames have at least {MIN_USERNAME_LEN} characters"),
            });
        }
        Ok(())
    }

    fn url(base_url: &str, username: &String, _page: Page, _slug: Option<&str>) -> String {
        format!(
            "{base_url}/malappinfo.php?u={}&status=all&type={}",
            urlencoding::encode(username),
            K::PATH
        )
    }

    fn parse(
        session: &Session,
        username: &String,
        _page: Page,
        body: &str,
    ) -> Result<MediaListAttributes<K>> {
        parse_export::<K>(session, username, body)
    }
}

impl<K: MediaKind> MediaList<K> {
    pub fn username(&self) -> &str {
        self.id()
    }

    linked_getters! {
        /// Media → the user's entry for it.
        list: HashMap<Media<K>, ListEntry> => MediaListAttribute::List, |a| a.list;
    }

    getters! {
        stats: ListStats => MediaListAttribute::Stats, |a| a.stats;
    }

    /// Entries whose user status is `status`, e.g. "Completed" or "Plan to Watch".
    pub async fn section(&self, status: &str) -> Result<HashMap<Media<K>, ListEntry>> {
        let list = self.list().await?.unwrap_or_default();
        Ok(list
            .into_iter()
            .filter(|(_, entry)| entry.status == status)
            .collect())
    }
}

/// Name of the first element in the document, if any.
fn root_element(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn parse_export<K: MediaKind>(
    session: &Session,
    username: &str,
    body: &str,
) -> Result<MediaListAttributes<K>> {
    if root_element(body).as_deref() != Some(EXPORT_ROOT) {
        return Err(Error::malformed_list(
            username,
            format!("no <{EXPORT_ROOT}> root element"),
            body,
        ));
    }

    let export: ListExport = quick_xml::de::from_str(body)
        .map_err(|e| Error::malformed_list(username, e.to_string(), body))?;

    if let Some(message) = export.error {
        return Err(Error::InvalidMediaList {
            username: username.to_string(),
            message,
        });
    }
    let myinfo = export
        .myinfo
        .ok_or_else(|| Error::malformed_list(username, "no <myinfo> element", body))?;
    let stats = list_stats(&myinfo)
        .map_err(|e| Error::malformed_list(username, format!("{e:#}"), body))?;

    let rows = if K::PATH == "manga" {
        export.manga
    } else {
        export.anime
    };

    let mut list = HashMap::with_capacity(rows.len());
    for row in &rows {
        match list_entry::<K>(row) {
            Ok((media, entry)) => {
                list.insert(media, entry);
            }
            Err(e) if session.suppress_parse_errors() => {
                warn!(
                    username,
                    row = %row.series_animedb_id,
                    error = %format!("{e:#}"),
                    "List entry not parsed, skipping it"
                );
            }
            Err(e) => {
                return Err(Error::malformed_list(
                    username,
                    format!("entry {:?}: {e:#}", row.series_animedb_id),
                    body,
                ))
            }
        }
    }

    info!(
        username,
        kind = %K::LIST_KIND,
        entries = list.len(),
        "List parsed"
    );
    Ok(MediaListAttributes {
        list: Some(list),
        stats: Some(stats),
    })
}

/// Absent counts read as zero.
fn export_count(value: &Option<String>, name: &str) -> anyhow::Result<u32> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse()
            .with_context(|| format!("bad {name} {value:?}")),
    }
}

fn list_stats(myinfo: &ExportStats) -> anyhow::Result<ListStats> {
    let id = match myinfo.user_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(id) => Some(id.parse().with_context(|| format!("bad user id {id:?}"))?),
    };
    let days_spent = match myinfo.user_days_spent_watching.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(days) => Some(days.parse().with_context(|| format!("bad days spent {days:?}"))?),
    };

    Ok(ListStats {
        id,
        name: myinfo.user_name.clone(),
        consuming: export_count(&myinfo.user_watching, "in-progress count")?,
        completed: export_count(&myinfo.user_completed, "completed count")?,
        on_hold: export_count(&myinfo.user_onhold, "on-hold count")?,
        dropped: export_count(&myinfo.user_dropped, "dropped count")?,
        plan_to_consume: export_count(&myinfo.user_plantowatch, "planned count")?,
        days_spent,
    })
}

fn ordinal(value: &str, name: &str) -> anyhow::Result<usize> {
    value
        .trim()
        .parse()
        .with_context(|| format!("bad {name} {value:?}"))
}

/// Seconds since the epoch; zero means never.
fn last_updated(value: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let seconds: i64 = value
        .parse()
        .with_context(|| format!("bad update time {value:?}"))?;
    if seconds == 0 {
        return Ok(None);
    }
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(Some)
        .with_context(|| format!("update time {seconds} out of range"))
}

/// An unreadable or partial release date is left unknown.
fn release_date(value: &str) -> Option<NaiveDate> {
    parse_list_date(value).ok().flatten()
}

/// The seeded media link and the user's entry for one export row.
fn list_entry<K: MediaKind>(row: &ExportEntry) -> anyhow::Result<(MediaLink<K>, ListEntry)> {
    let id: u32 = row
        .series_animedb_id
        .trim()
        .parse()
        .with_context(|| format!("bad media id {:?}", row.series_animedb_id))?;

    let status = K::STATUS_TERMS
        .get(ordinal(&row.series_status, "media status")?)
        .with_context(|| format!("unknown media status {:?}", row.series_status))?;
    let aired = DateRange {
        start: release_date(&row.series_start),
        end: release_date(&row.series_end),
    };
    let title = row.series_title.trim();
    let seed = MediaAttributes {
        common: CommonAttributes {
            title: (!title.is_empty()).then(|| title.to_string()),
            picture: row.series_image.clone().filter(|url| !url.is_empty()),
            status: Some(status.to_string()),
            ..CommonAttributes::default()
        },
        extra: K::seed_dates(aired),
    };
    let media = Link::new(id, seed)?;

    let user_status = K::USER_STATUS_TERMS
        .get(ordinal(&row.my_status, "list status")?)
        .with_context(|| format!("unknown list status {:?}", row.my_status))?;
    let score: u8 = match row.my_score.trim() {
        "" => 0,
        score => score
            .parse()
            .with_context(|| format!("bad score {score:?}"))?,
    };

    let entry = ListEntry {
        started: parse_list_date(&row.my_start_date)?,
        finished: parse_list_date(&row.my_finish_date)?,
        status: user_status.to_string(),
        score: (score != 0).then_some(score),
        last_updated: last_updated(&row.my_last_updated)?,
    };
    Ok((media, entry))
}
