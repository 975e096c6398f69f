//! Destinations for finished certificates.

use async_trait::async_trait;
use log::{info, warn};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::common::sanitize_filename;
use super::{GeneratedDocument, SinkError};

#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Receive a finished document. Called once per successful render and
    /// never for a failed one.
    async fn deliver(&self, document: &GeneratedDocument) -> Result<(), SinkError>;
}

/// Suffixes tried before an archive name counts as exhausted.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes each certificate as a file under a directory.
///
/// Files are named after the holder and the issue date. Existing files are
/// never replaced; a repeated name gets a numeric suffix instead.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn stem_for(document: &GeneratedDocument) -> String {
        let holder = document
            .filename
            .strip_suffix(".pdf")
            .unwrap_or(&document.filename);
        let issued = document.issued_on.replace('/', "-");
        sanitize_filename(&format!("{holder} {issued}"), "attestation")
    }

    fn candidate(&self, stem: &str, attempt: u32) -> PathBuf {
        if attempt == 1 {
            self.root.join(format!("{stem}.pdf"))
        } else {
            self.root.join(format!("{stem}-{attempt}.pdf"))
        }
    }

    async fn create_unique(&self, stem: &str) -> Result<(PathBuf, File), SinkError> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let path = self.candidate(stem, attempt);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(SinkError::Io {
                        path: path.display().to_string(),
                        source,
                    })
                }
            }
        }
        warn!("no free archive name left for {stem}");
        Err(SinkError::NameExhausted {
            stem: stem.to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn deliver(&self, document: &GeneratedDocument) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| SinkError::Io {
                path: self.root.display().to_string(),
                source,
            })?;

        let (path, mut file) = self.create_unique(&Self::stem_for(document)).await?;
        let written = async {
            file.write_all(&document.pdf).await?;
            file.flush().await
        };
        written.await.map_err(|source| SinkError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("archived certificate to {}", path.display());
        Ok(())
    }
}

/// Keeps delivered certificates in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<GeneratedDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn documents(&self) -> Vec<GeneratedDocument> {
        self.documents.lock().await.clone()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn deliver(&self, document: &GeneratedDocument) -> Result<(), SinkError> {
        self.documents.lock().await.push(document.clone());
        Ok(())
    }
}
