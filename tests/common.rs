#![allow(dead_code)]

use attestation_overlay_server::attestation::common::get_static_dir;
use attestation_overlay_server::attestation::{
    AttestationEngine, FixedClock, InputRecord, StaticTemplateSource,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Date every test engine stamps on its certificates.
pub fn issue_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 12).unwrap()
}

pub fn template_bytes(name: &str) -> Vec<u8> {
    std::fs::read(get_static_dir().join(name))
        .unwrap_or_else(|e| panic!("missing bundled template {name}: {e}"))
}

/// In-memory source holding both bundled templates.
pub fn bundled_templates() -> StaticTemplateSource {
    StaticTemplateSource::new()
        .with_template(
            "certificate_limited.pdf",
            template_bytes("certificate_limited.pdf"),
        )
        .with_template(
            "certificate_public.pdf",
            template_bytes("certificate_public.pdf"),
        )
}

pub fn engine_with(source: StaticTemplateSource) -> AttestationEngine {
    AttestationEngine::new(Arc::new(source)).with_clock(Arc::new(FixedClock(issue_day())))
}

pub fn test_engine() -> AttestationEngine {
    engine_with(bundled_templates())
}

pub fn jane_doe() -> InputRecord {
    let mut record = InputRecord::new("Jane Doe", "Paris");
    record.days = Some(5);
    record.year = Some(2024);
    record
}

pub fn jane_doe_json() -> serde_json::Value {
    serde_json::json!({
        "name": "Jane Doe",
        "days": 5,
        "year": 2024,
        "location": "Paris",
        "mobility": "no"
    })
}
