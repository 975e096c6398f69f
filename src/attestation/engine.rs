//! Certificate pipeline.
//!
//! Fetches the template for a variant, decodes a fresh document, draws the
//! record, stamps the metadata and encodes the result. Only the fetch can be
//! cancelled; once the document is decoded the render runs to completion.

use chrono::NaiveDate;
use log::{error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::common::{certificate_filename, format_issue_date, Clock, LocalClock};
use super::document::DocumentModel;
use super::layout::{FieldLayout, Variant};
use super::metadata::{write_metadata, CERTIFICATE_METADATA};
use super::record::InputRecord;
use super::renderer::{OverlayRenderer, RenderSummary};
use super::sink::OutputSink;
use super::template::TemplateSource;
use super::{AttestationError, GeneratedDocument};

/// Encoded certificate plus what went into it.
#[derive(Debug, Clone)]
pub struct Composition {
    pub pdf: Vec<u8>,
    pub page_count: usize,
    pub summary: RenderSummary,
}

/// Decode `template`, draw `record` with `layout`, stamp the metadata and encode.
///
/// Synchronous and CPU bound. Nothing is returned unless every step succeeded.
pub fn compose(
    template: &[u8],
    layout: &FieldLayout,
    record: &InputRecord,
    issued_on: NaiveDate,
) -> Result<Composition, AttestationError> {
    let mut model = DocumentModel::load(template)?;
    let summary = OverlayRenderer::new(layout).render(&mut model, record, issued_on)?;
    write_metadata(&mut model, &CERTIFICATE_METADATA)?;
    let page_count = model.page_count();
    let pdf = model.save()?;
    Ok(Composition {
        pdf,
        page_count,
        summary,
    })
}

#[derive(Clone)]
pub struct AttestationEngine {
    source: Arc<dyn TemplateSource>,
    clock: Arc<dyn Clock>,
}

impl AttestationEngine {
    /// Engine stamping the local calendar date.
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
            clock: Arc::new(LocalClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn render(
        &self,
        variant: Variant,
        record: InputRecord,
    ) -> Result<GeneratedDocument, AttestationError> {
        self.render_cancellable(variant, record, &CancellationToken::new())
            .await
    }

    /// Like [`render`](Self::render), abandoning the template fetch as soon as
    /// `cancel` fires.
    pub async fn render_cancellable(
        &self,
        variant: Variant,
        record: InputRecord,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument, AttestationError> {
        let result = self.run(variant, record, cancel).await;
        match &result {
            Ok(document) => info!(
                "issued {} certificate {} ({} bytes)",
                variant,
                document.filename,
                document.pdf.len()
            ),
            Err(AttestationError::Cancelled) => {
                info!("{} certificate render cancelled", variant)
            }
            Err(e) => error!("failed to issue {} certificate: {}", variant, e),
        }
        result
    }

    /// Render and hand the document to `sink`. The sink only ever sees
    /// complete documents.
    pub async fn issue(
        &self,
        variant: Variant,
        record: InputRecord,
        sink: &dyn OutputSink,
    ) -> Result<GeneratedDocument, AttestationError> {
        let document = self.render(variant, record).await?;
        sink.deliver(&document).await?;
        Ok(document)
    }

    async fn run(
        &self,
        variant: Variant,
        record: InputRecord,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument, AttestationError> {
        let layout = variant.layout();
        let template = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AttestationError::Cancelled),
            fetched = self.source.fetch(layout.template_id) => fetched?,
        };

        let issued_on = self.clock.today();
        let filename = certificate_filename(&record.name);
        let composition = tokio::task::spawn_blocking(move || {
            compose(&template, layout, &record, issued_on)
        })
        .await
        .map_err(worker_error)??;

        info!(
            "{} certificate: {} page(s), fields {:?}",
            variant, composition.page_count, composition.summary.fields
        );

        Ok(GeneratedDocument {
            variant,
            filename,
            pdf: composition.pdf,
            issued_on: format_issue_date(issued_on),
        })
    }
}

/// The blocking render job panicked or was torn down with the runtime.
fn worker_error(err: tokio::task::JoinError) -> AttestationError {
    if err.is_panic() {
        error!("render worker panicked: {err}");
    } else {
        error!("render worker was cancelled: {err}");
    }
    AttestationError::Worker(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::common::{get_static_dir, FixedClock};
    use crate::attestation::inspect::inspect_pdf_bytes;
    use crate::attestation::sink::MemorySink;
    use crate::attestation::template::{StaticTemplateSource, TemplateBytes};
    use crate::attestation::FetchError;
    use async_trait::async_trait;

    /// Never answers.
    struct StalledSource;

    #[async_trait]
    impl TemplateSource for StalledSource {
        async fn fetch(&self, _template_id: &str) -> Result<TemplateBytes, FetchError> {
            std::future::pending().await
        }
    }

    fn template(name: &str) -> Vec<u8> {
        std::fs::read(get_static_dir().join(name)).unwrap()
    }

    fn engine_with(source: StaticTemplateSource) -> AttestationEngine {
        let today = NaiveDate::from_ymd_opt(2024, 4, 12).unwrap();
        AttestationEngine::new(Arc::new(source)).with_clock(Arc::new(FixedClock(today)))
    }

    fn jane() -> InputRecord {
        let mut record = InputRecord::new("Jane Doe", "Paris");
        record.days = Some(5);
        record.year = Some(2024);
        record
    }

    #[tokio::test]
    async fn issues_certificate_to_sink() {
        let engine = engine_with(StaticTemplateSource::new().with_template(
            "certificate_limited.pdf",
            template("certificate_limited.pdf"),
        ));
        let sink = MemorySink::new();

        let document = engine.issue(Variant::Limited, jane(), &sink).await.unwrap();
        assert_eq!(document.filename, "attestation-jane-doe.pdf");
        assert_eq!(document.issued_on, "12/4/2024");

        let delivered = sink.documents().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].pdf, document.pdf);

        let report = inspect_pdf_bytes(&document.pdf).unwrap();
        assert!(report.contains_text("Jane Doe"));
        assert!(report.contains_text("12/4/2024"));
    }

    #[tokio::test]
    async fn corrupt_template_never_reaches_sink() {
        let engine = engine_with(
            StaticTemplateSource::new()
                .with_template("certificate_limited.pdf", b"%PDF-1.4 garbage".to_vec()),
        );
        let sink = MemorySink::new();

        let result = engine.issue(Variant::Limited, jane(), &sink).await;
        assert!(matches!(result, Err(AttestationError::Decode(_))));
        assert!(sink.documents().await.is_empty());
    }

    #[tokio::test]
    async fn missing_template_is_a_fetch_error() {
        let engine = engine_with(StaticTemplateSource::new());
        let sink = MemorySink::new();

        let result = engine.issue(Variant::Public, jane(), &sink).await;
        assert!(matches!(
            result,
            Err(AttestationError::Fetch(FetchError::UnknownTemplate(_)))
        ));
        assert!(sink.documents().await.is_empty());
    }

    #[tokio::test]
    async fn cancelling_abandons_a_stalled_fetch() {
        let engine = AttestationEngine::new(Arc::new(StalledSource));
        let cancel = CancellationToken::new();

        let pending = {
            let engine = engine.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                engine
                    .render_cancellable(Variant::Limited, jane(), &cancel)
                    .await
            })
        };
        cancel.cancel();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(AttestationError::Cancelled)));
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_fetch() {
        let engine = engine_with(StaticTemplateSource::new().with_template(
            "certificate_limited.pdf",
            template("certificate_limited.pdf"),
        ));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine
            .render_cancellable(Variant::Limited, jane(), &cancel)
            .await;
        assert!(matches!(result, Err(AttestationError::Cancelled)));
    }

    #[test]
    fn compose_reports_what_was_drawn() {
        let issued = NaiveDate::from_ymd_opt(2024, 4, 12).unwrap();
        let composition = compose(
            &template("certificate_public.pdf"),
            Variant::Public.layout(),
            &jane(),
            issued,
        )
        .unwrap();
        assert_eq!(composition.page_count, 1);
        assert_eq!(
            composition.summary.fields,
            vec!["name", "days", "year", "location", "name"]
        );
    }

    #[tokio::test]
    async fn panicking_worker_is_not_an_encoding_failure() {
        let join_err = tokio::task::spawn_blocking(|| panic!("font table corrupted"))
            .await
            .unwrap_err();

        let err = worker_error(join_err);
        assert!(matches!(err, AttestationError::Worker(_)));
        assert!(err.to_string().starts_with("render worker failed"));
    }
}
