//! Runtime configuration read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::attestation::common::get_static_dir;
use crate::attestation::{
    CachedTemplateSource, FsTemplateSource, HttpTemplateSource, TemplateSource,
};

const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Where certificate templates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Directory(PathBuf),
    Http(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub template: TemplateOrigin,
    /// `None` disables the template byte cache.
    pub template_cache_ttl: Option<Duration>,
    pub archive_dir: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let template = match get("TEMPLATE_BASE_URL") {
            Some(url) => TemplateOrigin::Http(url),
            None => TemplateOrigin::Directory(
                get("TEMPLATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| get_static_dir().to_path_buf()),
            ),
        };

        let ttl_secs = match get("TEMPLATE_CACHE_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "TEMPLATE_CACHE_TTL_SECS",
                expected: "a number of seconds",
                value: raw,
            })?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                expected: "a TCP port",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port,
            template,
            template_cache_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            archive_dir: get("ARCHIVE_DIR").map(PathBuf::from),
            allowed_origins,
        })
    }

    /// Template source for this configuration, cached when a TTL is set.
    pub fn template_source(&self) -> Arc<dyn TemplateSource> {
        let source: Arc<dyn TemplateSource> = match &self.template {
            TemplateOrigin::Directory(dir) => Arc::new(FsTemplateSource::new(dir.clone())),
            TemplateOrigin::Http(base_url) => {
                Arc::new(HttpTemplateSource::new(reqwest::Client::new(), base_url.clone()))
            }
        };
        match self.template_cache_ttl {
            Some(ttl) => Arc::new(CachedTemplateSource::new(source, ttl)),
            None => source,
        }
    }
}
