//! Template sources.
//!
//! A source only hands out the immutable template bytes. Decoding happens per
//! render, so caching bytes never shares a document between renders.

use async_trait::async_trait;
use log::debug;
use moka::future::Cache;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::FetchError;

pub type TemplateBytes = Arc<Vec<u8>>;

#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Fetch the bytes of `template_id`. Not retried on failure.
    async fn fetch(&self, template_id: &str) -> Result<TemplateBytes, FetchError>;
}

/// Reads templates from a directory.
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn fetch(&self, template_id: &str) -> Result<TemplateBytes, FetchError> {
        // Identifiers are plain file names; anything that sanitizes differently could escape the root.
        if template_id.is_empty() || sanitize_filename::sanitize(template_id) != template_id {
            return Err(FetchError::UnknownTemplate(template_id.to_string()));
        }
        let path = self.root.join(template_id);
        debug!("reading template {}", path.display());
        let bytes = tokio::fs::read(&path).await.map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Arc::new(bytes))
    }
}

/// Downloads templates from `<base_url>/<template_id>`.
#[derive(Debug, Clone)]
pub struct HttpTemplateSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTemplateSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, template_id: &str) -> String {
        format!("{}/{}", self.base_url, template_id)
    }
}

#[async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn fetch(&self, template_id: &str) -> Result<TemplateBytes, FetchError> {
        let url = self.url_for(template_id);
        debug!("downloading template {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(Arc::new(bytes.to_vec()))
    }
}

/// In-memory templates.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateSource {
    templates: HashMap<String, TemplateBytes>,
}

impl StaticTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.templates.insert(template_id.into(), Arc::new(bytes));
        self
    }
}

#[async_trait]
impl TemplateSource for StaticTemplateSource {
    async fn fetch(&self, template_id: &str) -> Result<TemplateBytes, FetchError> {
        self.templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| FetchError::UnknownTemplate(template_id.to_string()))
    }
}

/// Keeps fetched template bytes in memory for a while.
pub struct CachedTemplateSource {
    inner: Arc<dyn TemplateSource>,
    cache: Cache<String, TemplateBytes>,
}

impl CachedTemplateSource {
    pub fn new(inner: Arc<dyn TemplateSource>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(16)
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl TemplateSource for CachedTemplateSource {
    async fn fetch(&self, template_id: &str) -> Result<TemplateBytes, FetchError> {
        if let Some(bytes) = self.cache.get(template_id).await {
            debug!("template cache hit for {}", template_id);
            return Ok(bytes);
        }
        let bytes = self.inner.fetch(template_id).await?;
        self.cache
            .insert(template_id.to_string(), bytes.clone())
            .await;
        Ok(bytes)
    }
}
