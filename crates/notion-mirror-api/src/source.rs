//! The content-API collaborator seen by the renderer and the sync provider
//!
//! Implementations only fetch one response page per call. Draining cursors
//! is done once, here, by the provided `list_all_*` methods.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Block, Page, Result};

/// One page of a cursor-paginated listing
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedList<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> PaginatedList<T> {
    /// A final page with no continuation
    pub fn last(results: Vec<T>) -> Self {
        Self {
            results,
            has_more: false,
            next_cursor: None,
        }
    }
}

/// Read-only access to a hosted block workspace.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one page of the direct children of `block_id`
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>>;

    /// Fetch one page of the pages visible to the integration
    async fn search_pages(&self, cursor: Option<&str>) -> Result<PaginatedList<Page>>;

    async fn retrieve_page(&self, page_id: &str) -> Result<Page>;

    /// All direct children of `block_id`, in the order the API returned them
    async fn list_all_children(&self, block_id: &str) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_children(block_id, cursor.as_deref()).await?;
            blocks.extend(page.results);
            match next_cursor(page.has_more, page.next_cursor, block_id) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(
            "[ContentSource] Listed {} children of {}",
            blocks.len(),
            block_id
        );
        Ok(blocks)
    }

    /// Every page returned by search, in the order the API returned them
    async fn list_all_pages(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.search_pages(cursor.as_deref()).await?;
            pages.extend(page.results);
            match next_cursor(page.has_more, page.next_cursor, "search") {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!("[ContentSource] Search returned {} pages", pages.len());
        Ok(pages)
    }
}

fn next_cursor(has_more: bool, next_cursor: Option<String>, listing: &str) -> Option<String> {
    if !has_more {
        return None;
    }
    if next_cursor.is_none() {
        warn!(
            "[ContentSource] Listing {} reported more results without a cursor, stopping",
            listing
        );
    }
    next_cursor
}
