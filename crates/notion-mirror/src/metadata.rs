//! Sync sidecar (`metadata.json`)
//!
//! Maps page id to what was last written for it. The `sync` flag is the
//! user's switch: entries are created with it off (unless new pages are
//! synced by default) and it is never overwritten by a sync run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntry {
    pub url: String,
    pub filename: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sync: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetadataStore {
    entries: BTreeMap<String, SyncEntry>,
}

impl MetadataStore {
    pub fn path_in(output_dir: &Path) -> PathBuf {
        output_dir.join(METADATA_FILE)
    }

    /// Load the sidecar, treating a missing file as an empty store
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[MetadataStore] No sidecar at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read metadata: {}", path.display()));
            }
        };
        let entries: BTreeMap<String, SyncEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse metadata: {}", path.display()))?;

        debug!(
            "[MetadataStore] Loaded {} entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self { entries })
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize metadata")?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write metadata: {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, page_id: &str) -> Option<&SyncEntry> {
        self.entries.get(page_id)
    }

    pub fn insert(&mut self, page_id: impl Into<String>, entry: SyncEntry) {
        self.entries.insert(page_id.into(), entry);
    }

    pub fn remove(&mut self, page_id: &str) -> Option<SyncEntry> {
        self.entries.remove(page_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn entry(sync: bool) -> SyncEntry {
        SyncEntry {
            url: "https://www.notion.so/p1".to_string(),
            filename: "Plans.md".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            sync,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::load(&MetadataStore::path_in(dir.path())).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = MetadataStore::path_in(&dir.path().join("nested"));

        let mut store = MetadataStore::default();
        store.insert("p1", entry(true));
        store.insert("p0", entry(false));
        store.save(&path).await.unwrap();

        let loaded = MetadataStore::load(&path).await.unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.ids().collect::<Vec<_>>(), vec!["p0", "p1"]);
    }

    #[tokio::test]
    async fn test_written_format_uses_camel_case() {
        let dir = TempDir::new().unwrap();
        let path = MetadataStore::path_in(dir.path());

        let mut store = MetadataStore::default();
        store.insert("p1", entry(true));
        store.save(&path).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["p1"]["updatedAt"], "2024-03-01T12:00:00Z");
        assert_eq!(json["p1"]["filename"], "Plans.md");
        assert_eq!(json["p1"]["sync"], true);
    }

    #[tokio::test]
    async fn test_reads_existing_sidecar() {
        let dir = TempDir::new().unwrap();
        let path = MetadataStore::path_in(dir.path());
        fs::write(
            &path,
            r#"{"abc": {"url": "https://x", "filename": "A.md", "updatedAt": "2023-05-06T07:08:00.000Z"}}"#,
        )
        .unwrap();

        let store = MetadataStore::load(&path).await.unwrap();
        let entry = store.get("abc").unwrap();
        assert!(!entry.sync);
        assert_eq!(entry.filename, "A.md");
    }

    #[tokio::test]
    async fn test_malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = MetadataStore::path_in(dir.path());
        fs::write(&path, "{not json").unwrap();

        let err = MetadataStore::load(&path).await.unwrap_err();
        assert!(format!("{:#}", err).contains("metadata.json"));
    }

    #[tokio::test]
    async fn test_unreadable_sidecar_is_not_treated_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = MetadataStore::path_in(dir.path());
        fs::create_dir(&path).unwrap();

        let err = MetadataStore::load(&path).await.unwrap_err();
        assert!(format!("{:#}", err).starts_with("Failed to read metadata"));
    }
}
