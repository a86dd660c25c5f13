use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use notion_mirror_api::{ApiError, Block, ContentSource, Page, PaginatedList, Result};

pub const BASE_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Largest page size the listing endpoints accept
const PAGE_SIZE: u32 = 100;

/// Error body returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct NotionClient {
    base_url: String,
    default_headers: HeaderMap,
    client: reqwest::Client,
}

impl NotionClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a client against a different API root (proxies, test servers)
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
            ApiError::Unauthorized {
                message: "API key contains characters that are not valid in a header".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));

        // 30 second timeout; nothing above this retries, so a hang fails the run
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: headers,
            client,
        })
    }

    /// Helper to create better error messages from reqwest errors
    fn format_reqwest_error(e: reqwest::Error, url: &str, operation: &str) -> ApiError {
        if e.is_decode() {
            return ApiError::Decode {
                message: format!(
                    "Failed to {} for {}: unexpected response format from server. Error: {}",
                    operation, url, e
                ),
            };
        }

        let message = if e.is_timeout() {
            format!(
                "Failed to {} for {}: timeout - request took too long (check network)",
                operation, url
            )
        } else if e.is_connect() {
            format!(
                "Failed to {} for {}: connection error - check network connectivity, DNS resolution, and firewall settings. Error: {}",
                operation, url, e
            )
        } else if e.is_request() {
            format!(
                "Failed to {} for {}: request error - invalid URL format or malformed request parameters. Error: {}",
                operation, url, e
            )
        } else {
            format!("Failed to {} for {}: {}. Debug details: {:?}", operation, url, e, e)
        };
        ApiError::Network { message }
    }

    /// Map a non-2xx response to the error taxonomy
    fn error_for_status(
        status: u16,
        retry_after: Option<&str>,
        body: &str,
        object_id: &str,
    ) -> ApiError {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let message = match parsed {
            Some(ErrorBody {
                code,
                message: Some(message),
            }) => match code {
                Some(code) => format!("{} ({})", message, code),
                None => message,
            },
            _ => truncate(body, 500),
        };

        match status {
            401 | 403 => ApiError::Unauthorized { message },
            404 => ApiError::NotFound {
                id: object_id.to_string(),
            },
            429 => ApiError::RateLimited {
                retry_after_secs: retry_after.and_then(|v| v.trim().parse().ok()),
            },
            _ => ApiError::Http { status, message },
        }
    }

    /// Helper to handle HTTP responses with better error messages
    async fn handle_response(
        response: reqwest::Response,
        url: &str,
        object_id: &str,
    ) -> Result<String> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let response_text = response.text().await.map_err(|e| ApiError::Network {
            message: format!("Failed to read response body from {}: {}", url, e),
        })?;

        if !status.is_success() {
            return Err(Self::error_for_status(
                status.as_u16(),
                retry_after.as_deref(),
                &response_text,
                object_id,
            ));
        }

        Ok(response_text)
    }

    fn decode<T: DeserializeOwned>(response_text: &str, url: &str) -> Result<T> {
        serde_json::from_str(response_text).map_err(|e| ApiError::Decode {
            message: format!(
                "Failed to parse response from {}: {} - Response (first 500): {}",
                url,
                e,
                truncate(response_text, 500)
            ),
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        operation: &str,
        object_id: &str,
    ) -> Result<T> {
        let response = request
            .headers(self.default_headers.clone())
            .send()
            .await
            .map_err(|e| {
                let err = Self::format_reqwest_error(e, url, operation);
                error!("[NotionClient] {} failed: {}", operation, err);
                err
            })?;

        let response_text = Self::handle_response(response, url, object_id)
            .await
            .map_err(|e| {
                error!("[NotionClient] {} for {} failed: {}", operation, object_id, e);
                e
            })?;

        debug!(
            "[NotionClient] {} response received: length={}",
            operation,
            response_text.len()
        );

        Self::decode(&response_text, url)
    }
}

#[async_trait]
impl ContentSource for NotionClient {
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>> {
        let url = format!("{}/blocks/{}/children", self.base_url, block_id);
        let mut query = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }

        debug!(
            "[NotionClient] Listing children of {} (cursor={:?})",
            block_id, cursor
        );
        self.send(
            self.client.get(&url).query(&query),
            &url,
            "list block children",
            block_id,
        )
        .await
    }

    async fn search_pages(&self, cursor: Option<&str>) -> Result<PaginatedList<Page>> {
        let url = format!("{}/search", self.base_url);
        let mut body = serde_json::json!({
            "filter": {"property": "object", "value": "page"},
            "page_size": PAGE_SIZE,
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = serde_json::json!(cursor);
        }

        debug!("[NotionClient] Searching pages (cursor={:?})", cursor);
        self.send(self.client.post(&url).json(&body), &url, "search pages", "search")
            .await
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        self.send(self.client.get(&url), &url, "retrieve page", page_id)
            .await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}... (truncated)", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
