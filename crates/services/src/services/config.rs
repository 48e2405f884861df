//! Client configuration: backend origin, optional identity-provider
//! credentials, paging defaults.
//!
//! Resolution order: explicit path, then `$CONFIG_DIR/snippet-hub/config.toml`
//! if present, then environment variables.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid url in {var}: {source}")]
    Url {
        var: String,
        #[source]
        source: url::ParseError,
    },
    #[error("incomplete auth settings: {0} is set but {1} is missing")]
    IncompleteAuth(&'static str, &'static str),
}

/// Identity-provider settings for the client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: SecretString,
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend_url: Url,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// No client-side timeout when unset; a hung request stays pending until
    /// the transport gives up.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Build a config from `SNIPPET_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = match std::env::var("SNIPPET_BACKEND_URL") {
            Ok(raw) => parse_url("SNIPPET_BACKEND_URL", &raw)?,
            Err(_) => parse_url("SNIPPET_BACKEND_URL", DEFAULT_BACKEND_URL)?,
        };

        let page_size = std::env::var("SNIPPET_PAGE_SIZE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let request_timeout_secs = std::env::var("SNIPPET_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok());

        Ok(Self {
            backend_url,
            page_size,
            request_timeout_secs,
            auth: Self::auth_from_env()?,
        })
    }

    fn auth_from_env() -> Result<Option<AuthConfig>, ConfigError> {
        let token_url = std::env::var("SNIPPET_TOKEN_URL").ok();
        let client_id = std::env::var("SNIPPET_CLIENT_ID").ok();
        let client_secret = std::env::var("SNIPPET_CLIENT_SECRET").ok();

        let Some(token_url) = token_url else {
            return Ok(None);
        };
        let client_id = client_id.ok_or(ConfigError::IncompleteAuth(
            "SNIPPET_TOKEN_URL",
            "SNIPPET_CLIENT_ID",
        ))?;
        let client_secret = client_secret.ok_or(ConfigError::IncompleteAuth(
            "SNIPPET_TOKEN_URL",
            "SNIPPET_CLIENT_SECRET",
        ))?;

        Ok(Some(AuthConfig {
            token_url: parse_url("SNIPPET_TOKEN_URL", &token_url)?,
            client_id,
            client_secret: SecretString::from(client_secret),
            audience: std::env::var("SNIPPET_AUDIENCE").ok(),
        }))
    }

    /// Explicit path wins, then the default config file, then the environment.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = Self::default_path()
            && path.exists()
        {
            return Self::load(&path);
        }
        Self::from_env()
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("snippet-hub").join("config.toml"))
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::Url {
        var: var.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_toml_config() {
        let config: Config = toml::from_str(
            r#"
            backend_url = "https://snippets.example.com"
            page_size = 25

            [auth]
            token_url = "https://tenant.auth.example.com/oauth/token"
            client_id = "cid"
            client_secret = "shh"
            audience = "https://snippets.example.com/api"
            "#,
        )
        .unwrap();
        assert_eq!(config.page_size, 25);
        assert!(config.request_timeout_secs.is_none());
        let auth = config.auth.unwrap();
        assert_eq!(auth.client_id, "cid");
        assert_eq!(auth.audience.as_deref(), Some("https://snippets.example.com/api"));
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = toml::from_str(r#"backend_url = "http://localhost:8080""#).unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.auth.is_none());
    }
}
