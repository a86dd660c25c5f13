//! notion-mirror - export Notion pages to Markdown

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use notion_mirror::{MarkdownRenderer, NotionConfig, NotionSyncProvider};
use notion_mirror_api::ContentSource;

#[derive(Parser)]
#[command(name = "notion-mirror")]
#[command(version, about = "Mirror Notion pages as Markdown files", long_about = None)]
#[command(after_help = "ENVIRONMENT:
    NOTION_TOKEN      Integration token (required)
    WORKSPACE_DIR     Mirror goes to $WORKSPACE_DIR/knowledge/integrations/notion
    NOTION_API_URL    Override the API root
    RUST_LOG          Log filter (default: info)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write every page marked for sync and refresh metadata.json
    Sync {
        /// Output directory (defaults to the workspace mirror directory)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Mark newly seen pages for sync and write them right away
        #[arg(long)]
        sync_new: bool,
    },
    /// Print one page as Markdown
    Render {
        /// Page id, with or without dashes
        #[arg(value_name = "PAGE_ID")]
        page_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries `render` output, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let config = NotionConfig::from_env()?;
    let client = config.client().context("Failed to create Notion client")?;

    match command {
        Command::Sync {
            output_dir,
            sync_new,
        } => {
            let output_dir = config.output_dir(output_dir.as_deref())?;
            info!("[notion-mirror] Syncing into {}", output_dir.display());

            let provider =
                NotionSyncProvider::new(Arc::new(client), &output_dir).with_sync_new_pages(sync_new);
            let report = provider.sync().await?;
            println!(
                "Finished writing {} pages to {}",
                report.written,
                output_dir.display()
            );
        }
        Command::Render { page_id } => {
            let page_id = normalize_page_id(&page_id)?;
            print!("{}", render_page(&client, &page_id).await?);
        }
    }
    Ok(())
}

/// Look the page up first so a wrong id fails before any block is fetched
async fn render_page<S: ContentSource + ?Sized>(source: &S, page_id: &str) -> Result<String> {
    let page = source
        .retrieve_page(page_id)
        .await
        .with_context(|| format!("Failed to retrieve page {}", page_id))?;
    info!(
        "[notion-mirror] Rendering \"{}\" ({})",
        page.title().unwrap_or("untitled"),
        page.url
    );

    MarkdownRenderer::new(source)
        .render_subtree(&page.id)
        .await
        .with_context(|| format!("Failed to render page {}", page_id))
}

/// Accept dashed or undashed ids and return the dashed lowercase form
fn normalize_page_id(raw: &str) -> Result<String> {
    let id = Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid page id: {}", raw))?;
    Ok(id.hyphenated().to_string())
}
