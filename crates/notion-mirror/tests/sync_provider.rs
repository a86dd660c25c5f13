//! End-to-end sync runs against an in-memory content source

use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use notion_mirror::{FakeContentSource, MetadataStore, NotionSyncProvider, SyncEntry, SyncReport};
use notion_mirror_api::{Block, BlockContent, Page};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, minute, 0).unwrap()
}

fn page(id: &str, title: &str, edited: DateTime<Utc>) -> Page {
    Page::new(id, format!("https://www.notion.so/{}", id), edited).with_title(title)
}

fn source(pages: Vec<Page>) -> FakeContentSource {
    let mut fake = FakeContentSource::new();
    for p in pages {
        let body = vec![Block::new(
            format!("{}-b", p.id),
            BlockContent::paragraph(format!("body of {}", p.id)),
        )];
        fake = fake.with_children(p.id.clone(), body).with_page(p);
    }
    fake
}

fn provider(fake: FakeContentSource, dir: &Path) -> NotionSyncProvider {
    NotionSyncProvider::new(Arc::new(fake), dir)
}

async fn mark_synced(dir: &Path, page_id: &str) {
    let path = MetadataStore::path_in(dir);
    let mut store = MetadataStore::load(&path).await.unwrap();
    let mut entry = store.get(page_id).unwrap().clone();
    entry.sync = true;
    store.insert(page_id, entry);
    store.save(&path).await.unwrap();
}

async fn load(dir: &Path) -> MetadataStore {
    MetadataStore::load(&MetadataStore::path_in(dir)).await.unwrap()
}

#[tokio::test]
async fn test_new_pages_are_tracked_but_not_written() {
    let dir = TempDir::new().unwrap();
    let report = provider(source(vec![page("p1", "Plans", at(0))]), dir.path())
        .sync()
        .await
        .unwrap();

    assert_eq!(
        report,
        SyncReport {
            written: 0,
            tracked: 1,
            removed: 0
        }
    );
    let store = load(dir.path()).await;
    assert_eq!(
        store.get("p1"),
        Some(&SyncEntry {
            url: "https://www.notion.so/p1".to_string(),
            filename: "Plans.md".to_string(),
            updated_at: at(0),
            sync: false,
        })
    );
    assert!(!dir.path().join("p1").exists());
}

#[tokio::test]
async fn test_sync_new_pages_writes_immediately() {
    let dir = TempDir::new().unwrap();
    let report = provider(source(vec![page("p1", "Plans", at(0))]), dir.path())
        .with_sync_new_pages(true)
        .sync()
        .await
        .unwrap();

    assert_eq!(report.written, 1);
    assert!(load(dir.path()).await.get("p1").unwrap().sync);
    let written = fs::read_to_string(dir.path().join("p1").join("Plans.md")).unwrap();
    assert_eq!(written, "body of p1 \n");
}

#[tokio::test]
async fn test_changed_synced_page_is_rewritten_and_flag_kept() {
    let dir = TempDir::new().unwrap();
    provider(source(vec![page("p1", "Plans", at(0))]), dir.path())
        .sync()
        .await
        .unwrap();
    mark_synced(dir.path(), "p1").await;

    let report = provider(source(vec![page("p1", "Plans", at(5))]), dir.path())
        .sync()
        .await
        .unwrap();

    assert_eq!(report.written, 1);
    let entry = load(dir.path()).await.get("p1").cloned().unwrap();
    assert!(entry.sync);
    assert_eq!(entry.updated_at, at(5));
    assert!(dir.path().join("p1").join("Plans.md").exists());
}

#[tokio::test]
async fn test_unchanged_page_is_not_fetched() {
    let dir = TempDir::new().unwrap();
    provider(source(vec![page("p1", "Plans", at(0))]), dir.path())
        .sync()
        .await
        .unwrap();
    mark_synced(dir.path(), "p1").await;

    let fake = Arc::new(source(vec![page("p1", "Plans", at(0))]));
    let report = NotionSyncProvider::new(fake.clone(), dir.path())
        .sync()
        .await
        .unwrap();

    assert_eq!(report, SyncReport::default());
    assert_eq!(fake.requested_ids(), vec!["search".to_string()]);
}

#[tokio::test]
async fn test_rename_replaces_old_file() {
    let dir = TempDir::new().unwrap();
    provider(source(vec![page("p1", "Draft", at(0))]), dir.path())
        .with_sync_new_pages(true)
        .sync()
        .await
        .unwrap();
    assert!(dir.path().join("p1").join("Draft.md").exists());

    provider(source(vec![page("p1", "Final/v2", at(1))]), dir.path())
        .sync()
        .await
        .unwrap();

    assert!(!dir.path().join("p1").join("Draft.md").exists());
    assert!(dir.path().join("p1").join("Final-v2.md").exists());
    assert_eq!(load(dir.path()).await.get("p1").unwrap().filename, "Final-v2.md");
}

#[tokio::test]
async fn test_pages_missing_from_search_are_removed() {
    let dir = TempDir::new().unwrap();
    provider(
        source(vec![page("p1", "Keep", at(0)), page("p2", "Gone", at(0))]),
        dir.path(),
    )
    .with_sync_new_pages(true)
    .sync()
    .await
    .unwrap();
    assert!(dir.path().join("p2").exists());

    let report = provider(source(vec![page("p1", "Keep", at(0))]), dir.path())
        .sync()
        .await
        .unwrap();

    assert_eq!(report.removed, 1);
    assert!(!dir.path().join("p2").exists());
    assert!(dir.path().join("p1").exists());
    let store = load(dir.path()).await;
    assert!(store.get("p2").is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_untracked_removal_tolerates_missing_directory() {
    let dir = TempDir::new().unwrap();
    provider(source(vec![page("p1", "Only tracked", at(0))]), dir.path())
        .sync()
        .await
        .unwrap();

    let report = provider(source(vec![]), dir.path()).sync().await.unwrap();
    assert_eq!(report.removed, 1);
    assert!(load(dir.path()).await.is_empty());
}

#[tokio::test]
async fn test_render_failure_aborts_without_saving_metadata() {
    let dir = TempDir::new().unwrap();
    let fake = source(vec![page("p1", "Plans", at(0))]).failing_on("p1");

    let err = provider(fake, dir.path())
        .with_sync_new_pages(true)
        .sync()
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("Failed to render page p1"));
    assert!(!MetadataStore::path_in(dir.path()).exists());
}

#[tokio::test]
async fn test_untitled_page_uses_id_as_filename() {
    let dir = TempDir::new().unwrap();
    let untitled = Page::new("p9", "https://www.notion.so/p9", at(0));
    let fake = FakeContentSource::new()
        .with_children("p9", vec![Block::new("b", BlockContent::Divider)])
        .with_page(untitled);

    provider(fake, dir.path())
        .with_sync_new_pages(true)
        .sync()
        .await
        .unwrap();

    assert!(dir.path().join("p9").join("p9.md").exists());
}

#[tokio::test]
async fn test_render_page_does_not_touch_disk() {
    let dir = TempDir::new().unwrap();
    let markdown = provider(source(vec![page("p1", "Plans", at(0))]), dir.path())
        .render_page("p1")
        .await
        .unwrap();

    assert_eq!(markdown, "body of p1 \n");
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}
