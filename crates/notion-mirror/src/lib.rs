//! Notion integration for notion-mirror
//!
//! This crate provides the pieces of the page exporter:
//!
//! - `client` - NotionClient (HTTP implementation of `ContentSource`)
//! - `rich_text` - rich-text flattening
//! - `renderer` - MarkdownRenderer, the block tree to Markdown walk
//! - `metadata` - the `metadata.json` sync sidecar
//! - `notion_sync_provider` - NotionSyncProvider, mirrors pages to disk
//! - `config` - environment configuration
//! - `fake` - FakeContentSource, an in-memory source for tests

pub mod client;
pub mod config;
pub mod fake;
pub mod metadata;
pub mod notion_sync_provider;
pub mod renderer;
pub mod rich_text;

pub use client::NotionClient;
pub use config::{ConfigError, NotionConfig};
pub use fake::FakeContentSource;
pub use metadata::{MetadataStore, SyncEntry};
pub use notion_sync_provider::{NotionSyncProvider, SyncReport, page_filename};
pub use renderer::MarkdownRenderer;
pub use rich_text::rich_text_to_string;
