//! Block tree to Markdown rendering
//!
//! A page is rendered depth-first, in the order the content source returns
//! children:
//! - every block gets one line (or a few, for code and quotes) built by [`render_block`]
//! - children are rendered below their parent, indented by [`INDENT_STEP`] more columns
//! - tables fetch their rows and render them through a separate path
//! - synced blocks are replaced by the subtree of the block they mirror
//!
//! Nothing is cached between calls; each fetch goes to the content source.

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use notion_mirror_api::{
    Block, BlockContent, CodeBlock, ContentSource, FileBlock, FileSource, Result, SyncedBlock,
    TableBlock, TableRowBlock,
};

use crate::rich_text::rich_text_to_string;

/// Columns added per level of nesting
pub const INDENT_STEP: usize = 2;

pub const DIVIDER: &str = "-------------------------------------";

/// Block ids from the render root down to the block being rendered.
///
/// Synced blocks can point anywhere, including back at one of their own
/// ancestors; redirects to an id already on the path are refused.
struct Ancestry<'p> {
    id: &'p str,
    parent: Option<&'p Ancestry<'p>>,
}

impl<'p> Ancestry<'p> {
    fn root(id: &'p str) -> Self {
        Self { id, parent: None }
    }

    fn child(&'p self, id: &'p str) -> Ancestry<'p> {
        Ancestry {
            id,
            parent: Some(self),
        }
    }

    fn contains(&self, id: &str) -> bool {
        let mut current = Some(self);
        while let Some(node) = current {
            if node.id == id {
                return true;
            }
            current = node.parent;
        }
        false
    }
}

/// Renders block subtrees fetched from a [`ContentSource`] as Markdown.
pub struct MarkdownRenderer<'a, S: ContentSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ContentSource + ?Sized> MarkdownRenderer<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Render every descendant of `root_id` (a page or block id).
    ///
    /// Fails as a whole if any fetch fails; no partial output is returned.
    pub async fn render_subtree(&self, root_id: &str) -> Result<String> {
        debug!("[MarkdownRenderer] Rendering subtree of {}", root_id);
        let path = Ancestry::root(root_id);
        self.render_children(root_id, 0, &path).await
    }

    fn render_children<'b>(
        &'b self,
        block_id: &'b str,
        indentation: usize,
        path: &'b Ancestry<'b>,
    ) -> BoxFuture<'b, Result<String>> {
        async move {
            let blocks = self.source.list_all_children(block_id).await?;
            let mut result = String::new();

            for block in &blocks {
                match &block.content {
                    // Tables own their rows; they never go through the generic walk
                    BlockContent::Table { table } => {
                        result.push_str(&self.render_table(block, table).await?);
                        continue;
                    }
                    BlockContent::SyncedBlock { synced_block } => {
                        result.push_str(
                            &self
                                .render_synced(block, synced_block, indentation, path)
                                .await?,
                        );
                        continue;
                    }
                    _ => {}
                }

                match render_block(block) {
                    Some(text) => {
                        result.push_str(&indent_first_lines(&text, indentation));
                        result.push('\n');
                    }
                    None => debug!(
                        "[MarkdownRenderer] Skipping unsupported block {} of type {}",
                        block.id, block.block_type
                    ),
                }

                let is_child_page = matches!(block.content, BlockContent::ChildPage { .. });
                if block.has_children && !is_child_page {
                    let child_path = path.child(&block.id);
                    result.push_str(
                        &self
                            .render_children(&block.id, indentation + INDENT_STEP, &child_path)
                            .await?,
                    );
                }
            }

            Ok(result)
        }
        .boxed()
    }

    async fn render_synced(
        &self,
        block: &Block,
        synced_block: &SyncedBlock,
        indentation: usize,
        path: &Ancestry<'_>,
    ) -> Result<String> {
        let Some(synced_from) = &synced_block.synced_from else {
            return Ok(String::new());
        };
        let source_id = synced_from.block_id.as_str();

        if path.contains(source_id) {
            warn!(
                "[MarkdownRenderer] Synced block {} points back at ancestor {}, not expanding",
                block.id, source_id
            );
            return Ok(String::new());
        }

        debug!(
            "[MarkdownRenderer] Synced block {} expands source {}",
            block.id, source_id
        );
        let synced_path = path.child(source_id);
        self.render_children(source_id, indentation, &synced_path)
            .await
    }

    async fn render_table(&self, block: &Block, table: &TableBlock) -> Result<String> {
        let children = self.source.list_all_children(&block.id).await?;
        let rows: Vec<&TableRowBlock> = children
            .iter()
            .filter_map(|child| match &child.content {
                BlockContent::TableRow { table_row } => Some(table_row),
                _ => {
                    warn!(
                        "[MarkdownRenderer] Table {} has a {} child {}, skipping it",
                        block.id, child.block_type, child.id
                    );
                    None
                }
            })
            .collect();

        Ok(render_table_rows(&rows, table))
    }
}

/// Left-pad the first line and re-indent the line after the first newline.
///
/// Only the first embedded newline is rewritten; later lines of a multi-line
/// block keep no indentation.
fn indent_first_lines(text: &str, indentation: usize) -> String {
    if indentation == 0 {
        return text.to_string();
    }
    let pad = " ".repeat(indentation);
    format!("{}{}", pad, text).replacen('\n', &format!("\n{}", pad), 1)
}

/// The block's own text, without indentation or trailing newline.
///
/// Returns `None` for types with no standalone rendering (unsupported
/// types, and tables, table rows and synced blocks, which the tree walk
/// handles itself).
pub fn render_block(block: &Block) -> Option<String> {
    let text = match &block.content {
        BlockContent::Bookmark { bookmark } => {
            let caption = rich_text_to_string(&bookmark.caption);
            if caption.is_empty() {
                format!("Bookmark: {}", bookmark.url)
            } else {
                format!("Bookmark: {} ({})", bookmark.url, caption)
            }
        }
        BlockContent::BulletedListItem { bulleted_list_item } => {
            format!("- {}", rich_text_to_string(&bulleted_list_item.rich_text))
        }
        BlockContent::Callout { callout } => {
            format!("> {}", rich_text_to_string(&callout.rich_text))
        }
        BlockContent::ChildDatabase { child_database } => {
            format!("Child Database: {}", child_database.title)
        }
        BlockContent::ChildPage { child_page } => format!("Child Page: {}", child_page.title),
        BlockContent::Code { code } => render_code(code),
        BlockContent::Divider => DIVIDER.to_string(),
        BlockContent::Embed { embed } => format!("Embed: {}", embed.url),
        BlockContent::Equation { equation } => format!("Equation: {}", equation.expression),
        BlockContent::File { file } => file_reference("File", file),
        BlockContent::Heading1 { heading_1 } => {
            format!("# {}", rich_text_to_string(&heading_1.rich_text))
        }
        BlockContent::Heading2 { heading_2 } => {
            format!("## {}", rich_text_to_string(&heading_2.rich_text))
        }
        BlockContent::Heading3 { heading_3 } => {
            format!("### {}", rich_text_to_string(&heading_3.rich_text))
        }
        BlockContent::Image { image } => file_reference("Image", image),
        BlockContent::LinkPreview { link_preview } => link_preview.url.clone(),
        // Ordinals are not tracked; every item is "1." and Markdown renumbers
        BlockContent::NumberedListItem { numbered_list_item } => {
            format!("1. {}", rich_text_to_string(&numbered_list_item.rich_text))
        }
        BlockContent::Paragraph { paragraph } => rich_text_to_string(&paragraph.rich_text),
        BlockContent::Pdf { pdf } => file_reference("PDF", pdf),
        BlockContent::Quote { quote } => {
            format!("\"\"\"\n{}\n\"\"\"", rich_text_to_string(&quote.rich_text))
        }
        BlockContent::ToDo { to_do } => {
            let mark = if to_do.checked { "x" } else { " " };
            format!("[{}] {}", mark, rich_text_to_string(&to_do.rich_text))
        }
        BlockContent::Toggle { toggle } => format!("> {}", rich_text_to_string(&toggle.rich_text)),
        BlockContent::Video { video } => file_reference("Video", video),
        BlockContent::SyncedBlock { .. }
        | BlockContent::Table { .. }
        | BlockContent::TableRow { .. }
        | BlockContent::Unsupported => return None,
    };
    Some(text)
}

fn render_code(code: &CodeBlock) -> String {
    let mut result = String::from("```");
    if let Some(language) = &code.language {
        result.push_str(language);
    }
    result.push('\n');
    result.push_str(&rich_text_to_string(&code.rich_text));
    result.push_str("\n```");

    let caption = rich_text_to_string(&code.caption);
    if !caption.is_empty() {
        result.push_str(&format!("\n({})", caption));
    }
    result
}

/// `Label: url (expires ...)` for uploaded files, `External Label: url` for
/// links, followed by ` (caption)` when there is one.
pub fn file_reference(label: &str, file: &FileBlock) -> String {
    let mut result = match &file.source {
        FileSource::Uploaded { file } => {
            format!("{}: {} (expires {})", label, file.url, file.expiry_time)
        }
        FileSource::External { external } => format!("External {}: {}", label, external.url),
        FileSource::Unsupported => String::new(),
    };

    let caption = rich_text_to_string(&file.caption);
    if !caption.is_empty() {
        result.push_str(&format!(" ({})", caption));
    }
    result
}

/// Render table rows as pipe-delimited lines.
///
/// With a column header the first row is bolded cell by cell and followed
/// by a dash separator two characters shorter than the header line, framed
/// by pipes. With a row header the first cell of every body row is bolded.
pub fn render_table_rows(rows: &[&TableRowBlock], table: &TableBlock) -> String {
    let mut result = String::new();
    let mut body = rows;

    if table.has_column_header {
        if let Some((header, rest)) = rows.split_first() {
            result.push_str(&render_header_row(header));
            body = rest;
        }
    }

    for row in body {
        result.push_str(&render_body_row(row, table.has_row_header));
    }
    result
}

fn render_header_row(row: &TableRowBlock) -> String {
    let mut line = String::from("|");
    for cell in &row.cells {
        line.push_str(&format!(" **{}** |", rich_text_to_string(cell)));
    }
    let dashes = line.chars().count().saturating_sub(2);
    format!("{}\n|{}|\n", line, "-".repeat(dashes))
}

fn render_body_row(row: &TableRowBlock, bold_first: bool) -> String {
    let mut line = String::from("|");
    for (i, cell) in row.cells.iter().enumerate() {
        if bold_first && i == 0 {
            line.push_str(&format!(" **{}** |", rich_text_to_string(cell)));
        } else {
            line.push_str(&format!(" {} |", rich_text_to_string(cell)));
        }
    }
    line.push('\n');
    line
}
