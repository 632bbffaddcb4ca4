//! Access to the remote archive service.
//!
//! Both the filesystem adapter and the metadata command talk to the archive
//! through [`ArchiveClient`], so tests can substitute a recording double for
//! the HTTP implementation.

pub mod http;
pub mod patch;
pub mod types;

pub use http::HttpArchiveClient;
pub use types::{Item, ItemFile, MetadataEdit, ModifyBody, ModifyResponse, SearchResults, Timestamp};

use crate::error::Result;

pub trait ArchiveClient {
    /// Fetch the full metadata document for an identifier.
    ///
    /// Unknown identifiers are not an error: the returned item reports
    /// `exists() == false`.
    fn get_item(&self, identifier: &str) -> Result<Item>;

    /// Run a search and return the matching identifiers (first page only).
    fn search_items(&self, query: &str) -> Result<SearchResults>;

    /// Submit one metadata edit for one item.
    ///
    /// Non-200 answers are returned as a [`ModifyResponse`], not as an error;
    /// `Err` is reserved for transport failures.
    fn modify_metadata(&self, item: &Item, edit: &MetadataEdit) -> Result<ModifyResponse>;
}
