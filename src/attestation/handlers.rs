//! HTTP routes for certificate issuing.
//!
//! The download response is the output sink of a web render: bytes are only
//! sent once every pipeline step succeeded.

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use utoipa::ToSchema;

use super::engine::AttestationEngine;
use super::layout::Variant;
use super::record::{InputRecord, RawRecord};
use super::sink::OutputSink;
use super::AttestationError;
use crate::ErrorResponse;

pub struct AppState {
    pub engine: AttestationEngine,
    /// Extra copy of every issued certificate, when configured.
    pub archive: Option<Arc<dyn OutputSink>>,
}

impl AppState {
    pub fn new(engine: AttestationEngine) -> Self {
        Self {
            engine,
            archive: None,
        }
    }

    pub fn with_archive(mut self, archive: Arc<dyn OutputSink>) -> Self {
        self.archive = Some(archive);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VariantInfo {
    pub variant: Variant,
    pub template_id: String,
    pub layout_version: u32,
    /// Record fields drawn by this variant.
    pub fields: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Map a pipeline failure to its HTTP answer.
pub fn error_response(err: &AttestationError) -> HttpResponse {
    let message = err.to_string();
    match err {
        AttestationError::Fetch(_) => {
            HttpResponse::BadGateway().json(ErrorResponse::bad_gateway(&message))
        }
        AttestationError::Unencodable { .. } => {
            HttpResponse::UnprocessableEntity().json(ErrorResponse::unprocessable(&message))
        }
        _ => HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&message)),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Attestation",
    post,
    path = "/attestations/{variant}",
    params(
        ("variant" = Variant, Path, description = "Certificate variant")
    ),
    request_body = RawRecord,
    responses(
        (status = 200, description = "Filled certificate", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Malformed record", body = ErrorResponse),
        (status = 404, description = "Unknown variant", body = ErrorResponse),
        (status = 422, description = "Text the certificate font cannot draw", body = ErrorResponse),
        (status = 502, description = "Template unavailable", body = ErrorResponse),
        (status = 500, description = "Template or encoding failure", body = ErrorResponse)
    )
)]
pub async fn issue_attestation(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<RawRecord>,
) -> HttpResponse {
    let variant = match path.into_inner().parse::<Variant>() {
        Ok(variant) => variant,
        Err(message) => return HttpResponse::NotFound().json(ErrorResponse::not_found(&message)),
    };
    let record = InputRecord::from(body.into_inner());

    let document = match state.engine.render(variant, record).await {
        Ok(document) => document,
        Err(e) => return error_response(&e),
    };

    if let Some(archive) = &state.archive {
        if let Err(e) = archive.deliver(&document).await {
            log::error!("failed to archive {}: {}", document.filename, e);
        }
    }

    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.filename),
        ))
        .body(document.pdf)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Attestation",
    get,
    path = "/attestations/variants",
    responses(
        (status = 200, description = "Available certificate variants", body = [VariantInfo])
    )
)]
pub async fn list_variants() -> impl Responder {
    let variants: Vec<VariantInfo> = Variant::ALL
        .iter()
        .map(|variant| {
            let layout = variant.layout();
            let mut seen = BTreeSet::new();
            let fields = layout
                .fields
                .iter()
                .map(|entry| entry.field.as_str())
                .filter(|name| seen.insert(*name))
                .map(str::to_string)
                .collect();
            VariantInfo {
                variant: *variant,
                template_id: layout.template_id.to_string(),
                layout_version: layout.version,
                fields,
            }
        })
        .collect();
    HttpResponse::Ok().json(variants)
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Attestation",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse::bad_request(&err.to_string()));
    InternalError::from_response(err, response).into()
}

/// Register the certificate routes under `/api` plus `/health`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(web::resource("/attestations/variants").route(web::get().to(list_variants)))
            .service(
                web::resource("/attestations/{variant}").route(web::post().to(issue_attestation)),
            ),
    )
    .service(web::resource("/health").route(web::get().to(health)));
}
