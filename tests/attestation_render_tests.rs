mod common;

use attestation_overlay_server::attestation::inspect::{inspect_pdf_bytes, InspectReport};
use attestation_overlay_server::attestation::record::{MAX_LOCATION_LEN, MAX_NAME_LEN};
use attestation_overlay_server::attestation::text::text_width;
use attestation_overlay_server::attestation::{
    AttestationError, MemorySink, Mobility, StaticTemplateSource, Variant,
};
use common::{engine_with, jane_doe, template_bytes, test_engine};

#[tokio::test]
async fn limited_certificate_with_no_mobility() {
    let document = test_engine()
        .render(Variant::Limited, jane_doe())
        .await
        .unwrap();
    let report = inspect_pdf_bytes(&document.pdf).unwrap();

    assert_eq!(report.text_at(0, 150.0, 720.0), Some("Jane Doe"));
    assert_eq!(report.text_at(0, 205.0, 510.0), Some("5"));
    assert_eq!(report.text_at(0, 455.0, 510.0), Some("2024"));
    assert_eq!(report.text_at(0, 385.0, 215.0), Some("Paris"));
    assert_eq!(report.text_at(0, 385.0, 130.0), Some("12/4/2024"));

    assert_eq!(report.text_at(0, 72.0, 432.0), Some("x"));
    assert_eq!(report.text_at(0, 72.0, 450.0), None);
    assert_eq!(report.text_at(0, 230.0, 450.0), None);
    assert!(!report.contains_text("12/04/2024"));
}

#[tokio::test]
async fn limited_certificate_with_mobility_since_date() {
    let mut record = jane_doe();
    record.mobility = Mobility::Yes {
        date: "12/04/2024".into(),
    };

    let document = test_engine()
        .render(Variant::Limited, record)
        .await
        .unwrap();
    let report = inspect_pdf_bytes(&document.pdf).unwrap();

    assert_eq!(report.text_at(0, 72.0, 450.0), Some("x"));
    assert_eq!(report.text_at(0, 230.0, 450.0), Some("12/04/2024"));
    assert_eq!(report.text_at(0, 72.0, 432.0), None);
}

#[tokio::test]
async fn rendering_twice_draws_the_same_text() {
    let engine = test_engine();
    let first = engine.render(Variant::Public, jane_doe()).await.unwrap();
    let second = engine.render(Variant::Public, jane_doe()).await.unwrap();

    let first = inspect_pdf_bytes(&first.pdf).unwrap();
    let second = inspect_pdf_bytes(&second.pdf).unwrap();
    assert_eq!(first.texts, second.texts);
    assert_eq!(first.info, second.info);
}

#[tokio::test]
async fn optional_fields_can_be_left_out() {
    for variant in Variant::ALL {
        let record = attestation_overlay_server::attestation::InputRecord::new("Jane Doe", "Lyon");
        let document = test_engine().render(variant, record).await.unwrap();

        let report = inspect_pdf_bytes(&document.pdf).unwrap();
        assert_eq!(report.page_count, 1);
        assert!(report.contains_text("Lyon"));
    }
}

/// Width of the bundled A4 templates.
const PAGE_WIDTH: f32 = 595.0;

/// Joins the runs drawn at `x` from `top` downwards, one line height apart.
fn wrapped_text(report: &InspectReport, x: f32, top: f32, line_height: f32) -> String {
    (0..)
        .map(|i| report.text_at(0, x, top - i as f32 * line_height))
        .take_while(Option::is_some)
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test]
async fn longest_name_leaves_neighbours_in_place() {
    let longest = |seed: &str, len: usize| -> String {
        seed.chars().cycle().take(len).collect::<String>().trim_end().to_string()
    };
    let name = longest("Marie-Claire Dupont de la Fontaine ", MAX_NAME_LEN);
    let location = longest("Saint Remy en Bouzemont sur Marne ", MAX_LOCATION_LEN);
    let mut record = jane_doe();
    record.name = name.clone();
    record.location = location.clone();
    record.address = Some("3 place de la Gare".into());

    let document = test_engine()
        .render(Variant::Limited, record)
        .await
        .unwrap();
    let report = inspect_pdf_bytes(&document.pdf).unwrap();

    for run in report.texts_on(0) {
        let right = run.x + text_width(&run.text, run.size);
        assert!(
            right <= PAGE_WIDTH,
            "run at ({}, {}) ends at {right}",
            run.x,
            run.y
        );
    }
    assert_eq!(wrapped_text(&report, 150.0, 720.0, 13.0), name);
    assert_eq!(wrapped_text(&report, 385.0, 215.0, 13.0), location);
    assert_eq!(report.text_at(0, 150.0, 670.0), Some("3 place de la Gare"));
    assert_eq!(report.text_at(0, 205.0, 510.0), Some("5"));
    assert_eq!(report.text_at(0, 385.0, 130.0), Some("12/4/2024"));
}

#[tokio::test]
async fn long_address_wraps_between_words() {
    let address = "Residence des Tilleuls, batiment C, escalier 2, appartement 41, \
                   18 avenue du General Leclerc, 75014 Paris";
    let mut record = jane_doe();
    record.address = Some(address.to_string());

    let document = test_engine()
        .render(Variant::Limited, record)
        .await
        .unwrap();
    let report = inspect_pdf_bytes(&document.pdf).unwrap();

    let lines: Vec<&str> = [670.0, 657.0, 644.0]
        .iter()
        .filter_map(|y| report.text_at(0, 150.0, *y))
        .collect();
    assert!(lines.len() >= 2, "address should span several lines");
    for line in &lines {
        assert!(text_width(line, 10.0) <= 380.0, "line too wide: {line}");
    }
    assert_eq!(lines.join(" "), address);
}

#[tokio::test]
async fn public_certificate_repeats_the_name() {
    let mut record = jane_doe();
    record.ministry = Some("Ministère de la Transition écologique".into());
    record.rank = Some("Attaché".into());

    let document = test_engine()
        .render(Variant::Public, record)
        .await
        .unwrap();
    let report = inspect_pdf_bytes(&document.pdf).unwrap();

    assert_eq!(report.text_at(0, 420.0, 494.0), Some("Jane Doe"));
    assert_eq!(report.text_at(0, 79.0, 482.0), Some("Jane Doe"));
    assert_eq!(
        report.text_at(0, 79.0, 456.0),
        Some("Ministère de la Transition écologique")
    );
    assert_eq!(report.text_at(0, 79.0, 417.0), Some("Attaché"));
    assert_eq!(report.text_at(0, 94.0, 271.0), Some("x"));
}

#[tokio::test]
async fn output_keeps_pages_and_carries_fixed_metadata() {
    let template = inspect_pdf_bytes(&template_bytes("certificate_public.pdf")).unwrap();
    let document = test_engine()
        .render(Variant::Public, jane_doe())
        .await
        .unwrap();
    let report = inspect_pdf_bytes(&document.pdf).unwrap();

    assert_eq!(report.page_count, template.page_count);
    for run in &template.texts {
        assert_eq!(report.text_at(run.page, run.x, run.y), Some(run.text.as_str()));
    }
    assert_eq!(
        report.metadata("Subject"),
        Some("Attestation sur l'honneur de déplacement en vélo")
    );
    assert_eq!(report.metadata("Producer"), Some("beta.gouv"));
    assert_eq!(report.metadata("Creator"), Some(""));
    assert!(!report.info.values().any(|v| v.contains("Jane Doe")));
}

#[tokio::test]
async fn truncated_template_fails_to_decode_without_output() {
    let mut truncated = template_bytes("certificate_limited.pdf");
    truncated.truncate(truncated.len() / 3);
    let engine = engine_with(
        StaticTemplateSource::new().with_template("certificate_limited.pdf", truncated),
    );
    let sink = MemorySink::new();

    let result = engine.issue(Variant::Limited, jane_doe(), &sink).await;

    assert!(matches!(result, Err(AttestationError::Decode(_))));
    assert!(sink.documents().await.is_empty());
}

#[tokio::test]
async fn text_outside_the_font_is_rejected() {
    let mut record = jane_doe();
    record.name = "Li Lei 李雷".into();

    let result = test_engine().render(Variant::Limited, record).await;
    assert!(matches!(
        result,
        Err(AttestationError::Unencodable { ch: '李' })
    ));
}

#[tokio::test]
async fn concurrent_renders_do_not_mix() {
    let engine = test_engine();
    let handles: Vec<_> = ["Alice Martin", "Bruno Petit", "Chloé Roux"]
        .into_iter()
        .map(|name| {
            let engine = engine.clone();
            let mut record = jane_doe();
            record.name = name.to_string();
            tokio::spawn(async move { (name, engine.render(Variant::Limited, record).await) })
        })
        .collect();

    for handle in handles {
        let (name, result) = handle.await.unwrap();
        let report = inspect_pdf_bytes(&result.unwrap().pdf).unwrap();
        assert_eq!(report.text_at(0, 150.0, 720.0), Some(name));
    }
}
