//! Attestation module - fills certificate templates with applicant data.
//!
//! The pipeline for one certificate is linear and owns its document end to end:
//! - `template` - fetches the pristine template bytes for a variant
//! - `document` - decodes, draws on and re-encodes the PDF
//! - `renderer` - walks a `layout` table and draws the record onto the pages
//! - `metadata` - stamps the fixed document information
//! - `engine` - ties the steps together and hands the result to a `sink`

pub mod common;
pub mod document;
pub mod engine;
pub mod handlers;
pub mod inspect;
pub mod layout;
pub mod metadata;
pub mod record;
pub mod renderer;
pub mod sink;
pub mod template;
pub mod text;

pub use common::{Clock, FixedClock, LocalClock};
pub use document::DocumentModel;
pub use engine::AttestationEngine;
pub use layout::{FieldLayout, Variant};
pub use record::{InputRecord, Mobility, RawRecord};
pub use renderer::OverlayRenderer;
pub use sink::{DirectorySink, MemorySink, OutputSink};
pub use template::{
    CachedTemplateSource, FsTemplateSource, HttpTemplateSource, StaticTemplateSource,
    TemplateSource,
};

use thiserror::Error;

/// Errors raised while retrieving a template.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("template request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("template server answered {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
}

/// The layout table and the template disagree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout draws on page {page} but the template has {page_count} page(s)")]
    PageOutOfRange { page: usize, page_count: usize },
}

/// Errors that abort a certificate render. None of them is retried.
#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("template unavailable: {0}")]
    Fetch(#[from] FetchError),
    #[error("template is not a valid PDF document: {0}")]
    Decode(#[source] lopdf::Error),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("character {ch:?} cannot be drawn with the certificate font")]
    Unencodable { ch: char },
    #[error("failed to encode the certificate: {0}")]
    Encode(String),
    #[error("render was cancelled before drawing started")]
    Cancelled,
    #[error("render worker failed: {0}")]
    Worker(String),
    #[error("failed to deliver the certificate: {0}")]
    Sink(#[from] SinkError),
}

/// Errors raised by an output sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no free archive name for {stem} after {attempts} attempts")]
    NameExhausted { stem: String, attempts: u32 },
}

/// Result of a successful certificate render.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub variant: Variant,
    pub filename: String,
    pub pdf: Vec<u8>,
    /// Issue date as stamped on the certificate.
    pub issued_on: String,
}
