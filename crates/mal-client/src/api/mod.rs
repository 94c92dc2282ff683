//! Transport and wire types.
//!
//! Pages are fetched through the [`Fetch`] seam so sessions can run against
//! the live site or canned responses.

pub mod client;
pub mod types;

pub use client::{Fetch, HttpFetcher};
pub use types::{ExportEntry, ExportStats, ListExport};
