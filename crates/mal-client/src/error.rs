//! Error types for the MyAnimeList client.

use crate::resource::ResourceKind;
use thiserror::Error;

/// Longest page excerpt carried by list errors.
const SNIPPET_LEN: usize = 200;

/// Top-level error type for the client.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote entity does not exist, or the identity is not a valid one.
    #[error("{kind} {id} does not exist")]
    InvalidEntity { kind: ResourceKind, id: String },

    /// The page exists but an expected element is missing or unparsable.
    #[error("malformed {kind} page for {id}: could not parse {field}: {message}")]
    MalformedPage {
        kind: ResourceKind,
        id: String,
        field: &'static str,
        message: String,
    },

    /// The username is invalid or unknown to the site.
    #[error("invalid media list for user {username}: {message}")]
    InvalidMediaList { username: String, message: String },

    /// The list export is missing its root or stats element.
    #[error("malformed media list for user {username}: {message}")]
    MalformedMediaListPage {
        username: String,
        message: String,
        snippet: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// True for the "does not exist" family of errors.
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            Error::InvalidEntity { .. } | Error::InvalidMediaList { .. }
        )
    }

    /// True for the "page is broken" family of errors.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::MalformedPage { .. } | Error::MalformedMediaListPage { .. }
        )
    }

    pub(crate) fn malformed_list(username: &str, message: impl Into<String>, page: &str) -> Self {
        Error::MalformedMediaListPage {
            username: username.to_string(),
            message: message.into(),
            snippet: snippet(page),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

fn snippet(page: &str) -> String {
    page.chars().take(SNIPPET_LEN).collect()
}
