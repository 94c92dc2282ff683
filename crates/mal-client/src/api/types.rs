//! List export XML types.
//!
//! These types mirror the `malappinfo.php` export. Every leaf is kept as raw
//! text; conversion and validation happen in the list parser so that bad
//! values can be reported per entry.

use serde::Deserialize;

/// Root `<myanimelist>` element.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListExport {
    /// Present when the username is unknown
    pub error: Option<String>,
    pub myinfo: Option<ExportStats>,
    pub anime: Vec<ExportEntry>,
    pub manga: Vec<ExportEntry>,
}

/// `<myinfo>` summary block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportStats {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    #[serde(alias = "user_reading")]
    pub user_watching: Option<String>,
    pub user_completed: Option<String>,
    pub user_onhold: Option<String>,
    pub user_dropped: Option<String>,
    #[serde(alias = "user_plantoread")]
    pub user_plantowatch: Option<String>,
    /// Named after watching for manga lists too
    pub user_days_spent_watching: Option<String>,
}

/// One `<anime>` or `<manga>` row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportEntry {
    #[serde(alias = "series_mangadb_id")]
    pub series_animedb_id: String,
    pub series_title: String,
    pub series_status: String,
    pub series_start: String,
    pub series_end: String,
    pub series_image: Option<String>,
    pub my_start_date: String,
    pub my_finish_date: String,
    pub my_score: String,
    pub my_status: String,
    pub my_last_updated: String,
}
