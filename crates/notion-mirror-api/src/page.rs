use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page as returned by search and page retrieval.
///
/// The property bag is kept as raw JSON; the exporter only ever reads the
/// title out of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: String,
    pub last_edited_time: DateTime<Utc>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Page {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        last_edited_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            last_edited_time,
            properties: serde_json::Map::new(),
        }
    }

    /// Attach a `title` property holding a single plain-text run
    pub fn with_title(mut self, title: &str) -> Self {
        self.properties.insert(
            "title".to_string(),
            serde_json::json!({
                "id": "title",
                "type": "title",
                "title": [{"type": "text", "plain_text": title, "href": null}]
            }),
        );
        self
    }

    /// Page title from the `title` property, or `Name` for database rows.
    ///
    /// Only the first run is used. Returns `None` for missing or blank titles.
    pub fn title(&self) -> Option<&str> {
        let property = self
            .properties
            .get("title")
            .or_else(|| self.properties.get("Name"))?;

        let title = property
            .get("title")?
            .as_array()?
            .first()?
            .get("plain_text")?
            .as_str()?
            .trim();

        if title.is_empty() {
            None
        } else {
            Some(title)
        }
    }
}
