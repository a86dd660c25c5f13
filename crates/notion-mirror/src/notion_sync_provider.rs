//! Mirrors workspace pages into a directory of Markdown files
//!
//! One sync run:
//! - lists every page visible to the integration
//! - renders pages whose entry is marked `sync` and whose edit time moved
//! - tracks newly seen pages in the sidecar
//! - removes output for pages that are no longer visible
//!
//! Layout: `<output_dir>/<page id>/<title>.md` plus `<output_dir>/metadata.json`.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use notion_mirror_api::{ContentSource, Page};

use crate::metadata::{MetadataStore, SyncEntry};
use crate::renderer::MarkdownRenderer;

/// Counts from one sync run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Markdown files written
    pub written: usize,
    /// Pages seen for the first time
    pub tracked: usize,
    /// Pages dropped because search no longer returns them
    pub removed: usize,
}

pub struct NotionSyncProvider {
    source: Arc<dyn ContentSource>,
    output_dir: PathBuf,
    sync_new_pages: bool,
}

impl NotionSyncProvider {
    pub fn new(source: Arc<dyn ContentSource>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            sync_new_pages: false,
        }
    }

    /// Mark pages seen for the first time as synced and write them right away
    pub fn with_sync_new_pages(mut self, sync_new_pages: bool) -> Self {
        self.sync_new_pages = sync_new_pages;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render a single page (or block) to Markdown without touching disk
    pub async fn render_page(&self, page_id: &str) -> Result<String> {
        MarkdownRenderer::new(self.source.as_ref())
            .render_subtree(page_id)
            .await
            .with_context(|| format!("Failed to render page {}", page_id))
    }

    #[tracing::instrument(name = "provider.notion.sync", skip(self), fields(output_dir = %self.output_dir.display()))]
    pub async fn sync(&self) -> Result<SyncReport> {
        let pages = self
            .source
            .list_all_pages()
            .await
            .context("Failed to list pages")?;

        let metadata_path = MetadataStore::path_in(&self.output_dir);
        let mut store = MetadataStore::load(&metadata_path).await?;
        let mut report = SyncReport::default();
        let mut seen = HashSet::new();

        for page in &pages {
            seen.insert(page.id.as_str());
            let filename = page_filename(page);

            let sync = match store.get(&page.id) {
                Some(existing) if existing.updated_at == page.last_edited_time => {
                    debug!("[NotionSyncProvider] Page {} unchanged", page.id);
                    continue;
                }
                Some(existing) => {
                    if existing.sync {
                        let previous = existing.filename.clone();
                        self.write_page(page, &filename, Some(&previous)).await?;
                        report.written += 1;
                    }
                    existing.sync
                }
                None => {
                    info!(
                        "[NotionSyncProvider] Tracking new page {} ({})",
                        page.id, filename
                    );
                    report.tracked += 1;
                    if self.sync_new_pages {
                        self.write_page(page, &filename, None).await?;
                        report.written += 1;
                    }
                    self.sync_new_pages
                }
            };

            store.insert(
                page.id.clone(),
                SyncEntry {
                    url: page.url.clone(),
                    filename,
                    updated_at: page.last_edited_time,
                    sync,
                },
            );
        }

        let stale: Vec<String> = store
            .ids()
            .filter(|id| !seen.contains(id))
            .map(str::to_string)
            .collect();
        for page_id in stale {
            self.remove_page_dir(&page_id).await?;
            store.remove(&page_id);
            report.removed += 1;
        }

        store.save(&metadata_path).await?;

        info!(
            "[NotionSyncProvider] Sync complete: {} pages seen, {} written, {} new, {} removed",
            pages.len(),
            report.written,
            report.tracked,
            report.removed
        );
        Ok(report)
    }

    async fn write_page(&self, page: &Page, filename: &str, previous: Option<&str>) -> Result<()> {
        let markdown = self.render_page(&page.id).await?;

        let page_dir = self.output_dir.join(&page.id);
        tokio::fs::create_dir_all(&page_dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", page_dir.display()))?;

        if let Some(previous) = previous.filter(|p| *p != filename) {
            let old_path = page_dir.join(previous);
            match tokio::fs::remove_file(&old_path).await {
                Ok(()) => debug!(
                    "[NotionSyncProvider] Removed renamed file {}",
                    old_path.display()
                ),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to remove file: {}", old_path.display())
                    });
                }
            }
        }

        let path = page_dir.join(filename);
        tokio::fs::write(&path, markdown)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        info!("[NotionSyncProvider] Wrote {}", path.display());
        Ok(())
    }

    async fn remove_page_dir(&self, page_id: &str) -> Result<()> {
        let page_dir = self.output_dir.join(page_id);
        match tokio::fs::remove_dir_all(&page_dir).await {
            Ok(()) => {
                info!("[NotionSyncProvider] Removed page {}", page_id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "[NotionSyncProvider] Page {} had no output directory",
                    page_id
                );
                Ok(())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove directory: {}", page_dir.display())),
        }
    }
}

/// `<title>.md` with path separators replaced, or `<page id>.md` for untitled pages
pub fn page_filename(page: &Page) -> String {
    match page.title() {
        Some(title) => format!("{}.md", title.replace('/', "-")),
        None => format!("{}.md", page.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_page_filename_from_title() {
        let page = Page::new("p1", "https://x/p1", Utc::now()).with_title("Q1/Q2 Plans");
        assert_eq!(page_filename(&page), "Q1-Q2 Plans.md");
    }

    #[test]
    fn test_page_filename_falls_back_to_id() {
        let page = Page::new("p1", "https://x/p1", Utc::now());
        assert_eq!(page_filename(&page), "p1.md");

        let blank = Page::new("p2", "https://x/p2", Utc::now()).with_title("   ");
        assert_eq!(page_filename(&blank), "p2.md");
    }
}
