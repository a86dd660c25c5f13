use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// RichText - a single styled run of text
// =============================================================================

/// One styled run of a rich-text sequence.
///
/// Only the plain-text rendering is consumed by the exporter; annotations
/// (bold, colour, mentions, ...) are dropped on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RichText {
    pub plain_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub href: Option<String>,
}

impl RichText {
    /// Create an unstyled run without a link
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
            href: None,
        }
    }
}

// =============================================================================
// Block payloads
// =============================================================================

/// Payload shared by every block type that is just a rich-text sequence
/// (paragraphs, headings, list items, quotes, callouts, toggles).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TextBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: Vec<RichText>,
}

impl TextBlock {
    pub fn new(rich_text: Vec<RichText>) -> Self {
        Self { rich_text }
    }

    /// Single-run payload, mostly useful for building trees in tests
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![RichText::plain(text)])
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ToDoBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: Vec<RichText>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub checked: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CodeBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: Vec<RichText>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub caption: Vec<RichText>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BookmarkBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub caption: Vec<RichText>,
}

/// Payload of `embed` and `link_preview` blocks
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UrlBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EquationBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub expression: String,
}

/// Payload of `child_page` and `child_database` blocks
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TitleBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

/// Payload of `file`, `image`, `pdf` and `video` blocks
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub caption: Vec<RichText>,
    #[serde(flatten)]
    pub source: FileSource,
}

impl FileBlock {
    pub fn uploaded(url: impl Into<String>, expiry_time: impl Into<String>) -> Self {
        Self {
            caption: Vec::new(),
            source: FileSource::Uploaded {
                file: UploadedFile {
                    url: url.into(),
                    expiry_time: expiry_time.into(),
                },
            },
        }
    }

    pub fn external(url: impl Into<String>) -> Self {
        Self {
            caption: Vec::new(),
            source: FileSource::External {
                external: ExternalFile { url: url.into() },
            },
        }
    }

    pub fn with_caption(mut self, caption: Vec<RichText>) -> Self {
        self.caption = caption;
        self
    }
}

/// Where the bytes of a file-like block live.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileSource {
    /// Hosted by the workspace; the URL is signed and expires.
    #[serde(rename = "file")]
    Uploaded { file: UploadedFile },
    External { external: ExternalFile },
    /// Any other hosting type (e.g. pending uploads)
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub url: String,
    /// Kept verbatim so the rendered expiry matches what the API reported
    #[serde(default, deserialize_with = "null_as_default")]
    pub expiry_time: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternalFile {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SyncedBlock {
    /// `None` on the original synced block, `Some` on every duplicate of it
    #[serde(default, deserialize_with = "null_as_default")]
    pub synced_from: Option<SyncedFrom>,
}

impl SyncedBlock {
    pub fn original() -> Self {
        Self { synced_from: None }
    }

    pub fn duplicate_of(block_id: impl Into<String>) -> Self {
        Self {
            synced_from: Some(SyncedFrom {
                block_id: block_id.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SyncedFrom {
    pub block_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TableBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub table_width: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_column_header: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_row_header: bool,
}

/// One row of a table; each cell is its own rich-text sequence.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TableRowBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cells: Vec<Vec<RichText>>,
}

impl TableRowBlock {
    pub fn plain<S: AsRef<str>>(cells: &[S]) -> Self {
        Self {
            cells: cells
                .iter()
                .map(|c| vec![RichText::plain(c.as_ref())])
                .collect(),
        }
    }
}

// =============================================================================
// BlockContent - closed union over every block type the exporter knows
// =============================================================================

/// Type-specific content of a block.
///
/// Decoded from the API's `{"type": "<tag>", "<tag>": {...}}` shape. Tags the
/// exporter has no rule for decode to [`BlockContent::Unsupported`] instead of
/// failing; the original tag is still available on [`Block::block_type`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Paragraph {
        paragraph: TextBlock,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        heading_1: TextBlock,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        heading_2: TextBlock,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        heading_3: TextBlock,
    },
    BulletedListItem {
        bulleted_list_item: TextBlock,
    },
    NumberedListItem {
        numbered_list_item: TextBlock,
    },
    ToDo {
        to_do: ToDoBlock,
    },
    Quote {
        quote: TextBlock,
    },
    Callout {
        callout: TextBlock,
    },
    Toggle {
        toggle: TextBlock,
    },
    Code {
        code: CodeBlock,
    },
    Divider,
    Bookmark {
        bookmark: BookmarkBlock,
    },
    Embed {
        embed: UrlBlock,
    },
    Equation {
        equation: EquationBlock,
    },
    File {
        file: FileBlock,
    },
    Image {
        image: FileBlock,
    },
    Pdf {
        pdf: FileBlock,
    },
    Video {
        video: FileBlock,
    },
    LinkPreview {
        link_preview: UrlBlock,
    },
    ChildPage {
        child_page: TitleBlock,
    },
    ChildDatabase {
        child_database: TitleBlock,
    },
    SyncedBlock {
        synced_block: SyncedBlock,
    },
    Table {
        table: TableBlock,
    },
    TableRow {
        table_row: TableRowBlock,
    },
    #[serde(other)]
    Unsupported,
}

impl BlockContent {
    /// The API type tag this variant decodes from
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockContent::Paragraph { .. } => "paragraph",
            BlockContent::Heading1 { .. } => "heading_1",
            BlockContent::Heading2 { .. } => "heading_2",
            BlockContent::Heading3 { .. } => "heading_3",
            BlockContent::BulletedListItem { .. } => "bulleted_list_item",
            BlockContent::NumberedListItem { .. } => "numbered_list_item",
            BlockContent::ToDo { .. } => "to_do",
            BlockContent::Quote { .. } => "quote",
            BlockContent::Callout { .. } => "callout",
            BlockContent::Toggle { .. } => "toggle",
            BlockContent::Code { .. } => "code",
            BlockContent::Divider => "divider",
            BlockContent::Bookmark { .. } => "bookmark",
            BlockContent::Embed { .. } => "embed",
            BlockContent::Equation { .. } => "equation",
            BlockContent::File { .. } => "file",
            BlockContent::Image { .. } => "image",
            BlockContent::Pdf { .. } => "pdf",
            BlockContent::Video { .. } => "video",
            BlockContent::LinkPreview { .. } => "link_preview",
            BlockContent::ChildPage { .. } => "child_page",
            BlockContent::ChildDatabase { .. } => "child_database",
            BlockContent::SyncedBlock { .. } => "synced_block",
            BlockContent::Table { .. } => "table",
            BlockContent::TableRow { .. } => "table_row",
            BlockContent::Unsupported => "unsupported",
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        BlockContent::Paragraph {
            paragraph: TextBlock::plain(text),
        }
    }

    pub fn to_do(text: impl Into<String>, checked: bool) -> Self {
        BlockContent::ToDo {
            to_do: ToDoBlock {
                rich_text: vec![RichText::plain(text)],
                checked,
            },
        }
    }

    pub fn table(has_column_header: bool, has_row_header: bool) -> Self {
        BlockContent::Table {
            table: TableBlock {
                table_width: 0,
                has_column_header,
                has_row_header,
            },
        }
    }

    pub fn table_row<S: AsRef<str>>(cells: &[S]) -> Self {
        BlockContent::TableRow {
            table_row: TableRowBlock::plain(cells),
        }
    }
}

// =============================================================================
// Block
// =============================================================================

/// A node of a page's content tree as returned by the child-listing endpoint.
///
/// Children are not embedded; they are fetched separately by id when
/// `has_children` is set.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawBlock")]
pub struct Block {
    pub id: String,
    pub has_children: bool,
    /// Declared type tag, preserved even when `content` is `Unsupported`
    pub block_type: String,
    pub content: BlockContent,
}

impl Block {
    pub fn new(id: impl Into<String>, content: BlockContent) -> Self {
        Self {
            id: id.into(),
            has_children: false,
            block_type: content.type_name().to_string(),
            content,
        }
    }

    /// A block of a type this exporter has no rendering rule for
    pub fn unsupported(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            has_children: false,
            block_type: block_type.into(),
            content: BlockContent::Unsupported,
        }
    }

    pub fn with_children(mut self) -> Self {
        self.has_children = true;
        self
    }
}

/// Wire shape of a block before the type-specific payload is decoded
#[derive(Deserialize)]
struct RawBlock {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    has_children: bool,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(flatten)]
    payload: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawBlock> for Block {
    type Error = serde_json::Error;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let mut payload = raw.payload;
        payload.insert(
            "type".to_string(),
            serde_json::Value::String(raw.block_type.clone()),
        );
        let content = serde_json::from_value(serde_json::Value::Object(payload))?;
        Ok(Block {
            id: raw.id,
            has_children: raw.has_children,
            block_type: raw.block_type,
            content,
        })
    }
}
