//! Domain types and the content-source seam for notion-mirror
//!
//! Nothing in this crate performs I/O. The HTTP client, the renderer and the
//! sync provider live in `notion-mirror` and only talk to the workspace
//! through [`ContentSource`].

pub mod block;
pub mod page;
pub mod source;

// Re-export block types
pub use block::{
    Block, BlockContent, BookmarkBlock, CodeBlock, EquationBlock, ExternalFile, FileBlock,
    FileSource, RichText, SyncedBlock, SyncedFrom, TableBlock, TableRowBlock, TextBlock,
    TitleBlock, ToDoBlock, UploadedFile, UrlBlock,
};
pub use page::Page;
pub use source::{ContentSource, PaginatedList};

pub type Result<T> = std::result::Result<T, ApiError>;

/// Structured error types for content-API calls.
///
/// None of these are retried by the exporter; a failed call fails the whole
/// render or sync it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Object not found: {id}")]
    NotFound { id: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Rate limited{}", .retry_after_secs.map(|s| format!(" (retry after {}s)", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ApiError::NotFound {
                id: "abc".to_string()
            }
            .to_string(),
            "Object not found: abc"
        );
        assert_eq!(
            ApiError::RateLimited {
                retry_after_secs: Some(3)
            }
            .to_string(),
            "Rate limited (retry after 3s)"
        );
        assert_eq!(
            ApiError::RateLimited {
                retry_after_secs: None
            }
            .to_string(),
            "Rate limited"
        );
        assert_eq!(
            ApiError::Http {
                status: 500,
                message: "boom".to_string()
            }
            .to_string(),
            "HTTP 500: boom"
        );
    }
}
