use std::{env, path::PathBuf};

use url::Url;

pub mod assets;
pub mod client;
pub mod crud;
pub mod error;
pub mod filters;
pub mod models;
pub mod session;

pub use client::ApiClient;
pub use error::{Error, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_ASSET_HOST: &str = "https://rabbitvpn.sgp1.digitaloceanspaces.com";

/// Where the admin API and the asset bucket live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_url: String,
    pub asset_host: String,
}

impl ApiConfig {
    /// Reads `RABBIT_API_URL` and `RABBIT_ASSET_HOST`, falling back to the
    /// production asset bucket and a local API.
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("RABBIT_API_URL").unwrap_or(DEFAULT_API_URL.into()),
            asset_host: env::var("RABBIT_ASSET_HOST").unwrap_or(DEFAULT_ASSET_HOST.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("api url", &self.api_url), ("asset host", &self.asset_host)] {
            let parsed = Url::parse(value)
                .map_err(|e| Error::Config(format!("invalid {name} '{value}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{name} '{value}' must use http or https"
                )));
            }
        }

        Ok(())
    }
}

pub fn new_client(config: &ApiConfig) -> Result<ApiClient> {
    config.validate()?;
    ApiClient::new(config)
}

/// State directory for the session and preference files.
pub fn get_state_dir() -> PathBuf {
    if let Ok(dir) = env::var("RABBIT_STATE_DIR") {
        return PathBuf::from(dir);
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .unwrap_or(".".into());
    PathBuf::from(home).join(".rabbit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_non_http_urls() {
        let config = ApiConfig {
            api_url: "ftp://example.com".into(),
            asset_host: DEFAULT_ASSET_HOST.into(),
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ApiConfig {
            api_url: "not a url".into(),
            asset_host: DEFAULT_ASSET_HOST.into(),
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let config = ApiConfig {
            api_url: DEFAULT_API_URL.into(),
            asset_host: DEFAULT_ASSET_HOST.into(),
        };
        assert!(config.validate().is_ok());
    }
}
