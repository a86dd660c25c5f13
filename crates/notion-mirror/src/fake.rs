//! In-memory content source for tests and offline runs
//!
//! FakeContentSource serves a fixed block tree and page list through the
//! same paginated interface as the HTTP client:
//! - Responses are split into pages of `page_size` so cursor handling is exercised
//! - Ids registered with `failing_on` return a network error
//! - Every call is counted so tests can assert on request patterns

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use notion_mirror_api::{ApiError, Block, ContentSource, Page, PaginatedList, Result};

pub struct FakeContentSource {
    children: HashMap<String, Vec<Block>>,
    pages: Vec<Page>,
    page_size: usize,
    failing: HashSet<String>,
    request_count: AtomicUsize,
    requested_ids: Mutex<Vec<String>>,
}

impl Default for FakeContentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeContentSource {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            pages: Vec::new(),
            page_size: 100,
            failing: HashSet::new(),
            request_count: AtomicUsize::new(0),
            requested_ids: Mutex::new(Vec::new()),
        }
    }

    /// Register the ordered children of `parent_id`
    pub fn with_children(mut self, parent_id: impl Into<String>, blocks: Vec<Block>) -> Self {
        self.children.insert(parent_id.into(), blocks);
        self
    }

    /// Add a page to search results (and to `retrieve_page`)
    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every request touching `id` fail with a network error
    pub fn failing_on(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Ids passed to `list_children`, in call order (one entry per response page)
    pub fn requested_ids(&self) -> Vec<String> {
        self.requested_ids
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    fn record(&self, id: &str) -> Result<()> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut ids) = self.requested_ids.lock() {
            ids.push(id.to_string());
        }
        if self.failing.contains(id) {
            return Err(ApiError::Network {
                message: format!("simulated failure for {}", id),
            });
        }
        Ok(())
    }

    fn paginate<T: Clone>(&self, items: &[T], cursor: Option<&str>) -> Result<PaginatedList<T>> {
        let start = match cursor {
            None => 0,
            Some(c) => c.parse::<usize>().map_err(|_| ApiError::Http {
                status: 400,
                message: format!("invalid start_cursor: {}", c),
            })?,
        };
        let start = start.min(items.len());
        let end = (start + self.page_size).min(items.len());
        let has_more = end < items.len();
        Ok(PaginatedList {
            results: items[start..end].to_vec(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }
}

#[async_trait]
impl ContentSource for FakeContentSource {
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>> {
        self.record(block_id)?;
        let blocks = self.children.get(block_id).ok_or_else(|| ApiError::NotFound {
            id: block_id.to_string(),
        })?;
        self.paginate(blocks, cursor)
    }

    async fn search_pages(&self, cursor: Option<&str>) -> Result<PaginatedList<Page>> {
        self.record("search")?;
        self.paginate(&self.pages, cursor)
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        self.record(page_id)?;
        self.pages
            .iter()
            .find(|p| p.id == page_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                id: page_id.to_string(),
            })
    }
}
