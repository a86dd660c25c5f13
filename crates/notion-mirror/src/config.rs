//! Configuration for the Notion integration
//!
//! Values come from the process environment, after loading a `.env` file
//! from the working directory when one exists.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::client::{BASE_URL, NotionClient};

pub const TOKEN_VAR: &str = "NOTION_TOKEN";
pub const WORKSPACE_DIR_VAR: &str = "WORKSPACE_DIR";
pub const API_URL_VAR: &str = "NOTION_API_URL";

/// Location of the mirror below the workspace directory
pub const OUTPUT_SUBDIR: &str = "knowledge/integrations/notion";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid configuration value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration for the Notion API token and output location
#[derive(Clone, Debug)]
pub struct NotionConfig {
    pub api_key: String,
    pub workspace_dir: Option<PathBuf>,
    pub api_url: Option<String>,
}

impl NotionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("[NotionConfig] Loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::Invalid {
                    name: ".env",
                    reason: e.to_string(),
                });
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get(TOKEN_VAR).ok_or(ConfigError::MissingRequired(TOKEN_VAR))?;
        Ok(Self {
            api_key,
            workspace_dir: get(WORKSPACE_DIR_VAR).map(PathBuf::from),
            api_url: get(API_URL_VAR),
        })
    }

    /// `explicit` when given, otherwise the mirror directory inside the workspace
    pub fn output_dir(&self, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }
        self.workspace_dir
            .as_ref()
            .map(|dir| dir.join(OUTPUT_SUBDIR))
            .ok_or(ConfigError::MissingRequired(WORKSPACE_DIR_VAR))
    }

    pub fn client(&self) -> notion_mirror_api::Result<NotionClient> {
        NotionClient::with_base_url(&self.api_key, self.api_url.as_deref().unwrap_or(BASE_URL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_token() {
        let err = NotionConfig::from_lookup(lookup(&[(WORKSPACE_DIR_VAR, "/w")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingRequired("NOTION_TOKEN"));
        assert_eq!(
            err.to_string(),
            "Required configuration missing: NOTION_TOKEN"
        );
    }

    #[test]
    fn test_blank_token_is_missing() {
        let err = NotionConfig::from_lookup(lookup(&[(TOKEN_VAR, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingRequired(TOKEN_VAR));
    }

    #[test]
    fn test_default_output_dir() {
        let config =
            NotionConfig::from_lookup(lookup(&[(TOKEN_VAR, "secret"), (WORKSPACE_DIR_VAR, "/w")]))
                .unwrap();
        assert_eq!(
            config.output_dir(None).unwrap(),
            PathBuf::from("/w/knowledge/integrations/notion")
        );
        assert_eq!(
            config.output_dir(Some(Path::new("/elsewhere"))).unwrap(),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn test_output_dir_requires_workspace() {
        let config = NotionConfig::from_lookup(lookup(&[(TOKEN_VAR, "secret")])).unwrap();
        assert_eq!(
            config.output_dir(None).unwrap_err(),
            ConfigError::MissingRequired(WORKSPACE_DIR_VAR)
        );
    }

    #[test]
    fn test_client_uses_api_url_override() {
        let config = NotionConfig::from_lookup(lookup(&[
            (TOKEN_VAR, "secret"),
            (API_URL_VAR, "http://localhost:9999/v1"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:9999/v1"));
        assert!(config.client().is_ok());
    }
}
