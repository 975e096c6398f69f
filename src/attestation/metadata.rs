//! Fixed document information stamped on every certificate.

use super::document::{DocumentInfo, DocumentModel};
use super::AttestationError;

#[derive(Debug, Clone, Copy)]
pub struct CertificateMetadata {
    pub title: &'static str,
    pub subject: &'static str,
    pub keywords: &'static [&'static str],
    pub producer: &'static str,
    pub author: &'static str,
}

pub const CERTIFICATE_METADATA: CertificateMetadata = CertificateMetadata {
    title: "Attestation sur l'honneur de déplacement en vélo",
    subject: "Attestation sur l'honneur de déplacement en vélo",
    keywords: &["attestation", "vélo"],
    producer: "beta.gouv",
    author: "Ministère de la Transition écologique",
};

/// Overwrite the information dictionary. Nothing comes from the record and
/// the creator entry is always cleared.
pub fn write_metadata(
    model: &mut DocumentModel,
    metadata: &CertificateMetadata,
) -> Result<(), AttestationError> {
    let keywords = metadata.keywords.join(" ");
    model.set_metadata(&DocumentInfo {
        title: metadata.title,
        subject: metadata.subject,
        keywords: &keywords,
        producer: metadata.producer,
        creator: "",
        author: metadata.author,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::common::get_static_dir;
    use crate::attestation::inspect::inspect_pdf_bytes;

    #[test]
    fn stamps_fixed_information() {
        let template = std::fs::read(get_static_dir().join("certificate_limited.pdf")).unwrap();
        let mut model = DocumentModel::load(&template).unwrap();
        write_metadata(&mut model, &CERTIFICATE_METADATA).unwrap();

        let report = inspect_pdf_bytes(&model.save().unwrap()).unwrap();
        assert_eq!(
            report.metadata("Title"),
            Some("Attestation sur l'honneur de déplacement en vélo")
        );
        assert_eq!(report.metadata("Keywords"), Some("attestation vélo"));
        assert_eq!(report.metadata("Producer"), Some("beta.gouv"));
        assert_eq!(
            report.metadata("Author"),
            Some("Ministère de la Transition écologique")
        );
        assert_eq!(report.metadata("Creator"), Some(""));
    }
}
