//! Offer letter generation: orchestrates one submission end to end.
//!
//! Flow: select_template → build placeholder table → render document in
//!       memory → persist record → write file to the output directory.
//!
//! Rendering happens before the record is stored, so a broken or missing
//! template never leaves a record behind. If the file cannot be written after
//! the record was stored, the record is deleted again.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::docx::substitute::replace_placeholders;
use crate::docx::{Document, DocxError};
use crate::errors::AppError;
use crate::models::submission::{GeneratedRecord, Submission};
use crate::offer::placeholders::{Placeholder, PlaceholderTable};
use crate::offer::templates::{select_template, TemplateChoice};
use crate::state::AppState;

pub const INVALID_TYPE_MESSAGE: &str = "Invalid offer letter type selected.";

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct GeneratedOffer {
    pub record: GeneratedRecord,
    pub template: TemplateChoice,
    pub file_name: String,
    pub path: PathBuf,
}

/// Runs the full pipeline for one submission.
///
/// Steps:
/// 1. select_template() → TemplateChoice (unknown category → Validation)
/// 2. PlaceholderTable::from_submission()
/// 3. render_offer_letter() on a blocking thread → document bytes
/// 4. store.insert() → GeneratedRecord
/// 5. write_offer_letter() on a blocking thread; on failure the record is deleted
pub async fn generate_offer_letter(
    state: &AppState,
    submission: Submission,
) -> Result<GeneratedOffer, AppError> {
    // Step 1: Template
    let template = select_template(submission.oltype(), submission.is_internship())
        .ok_or_else(|| AppError::Validation(INVALID_TYPE_MESSAGE.to_string()))?;
    let template_path = state.templates.path_for(template);
    info!(
        "Generating offer letter from {} for oltype={:?}",
        template_path.display(),
        submission.oltype()
    );

    // Steps 2-3: Fill the template
    let table = PlaceholderTable::from_submission(&submission);
    let file_name = output_file_name(&table, template, &state.config.company_tag);
    let bytes = tokio::task::spawn_blocking(move || render_offer_letter(&template_path, &table))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in render: {e}")))??;

    // Step 4: Persist
    let collection = state.config.collection.as_str();
    let record = state.store.insert(collection, &submission).await?;

    // Step 5: Write the file
    let output_dir = state.config.output_dir.clone();
    let name = file_name.clone();
    let written = tokio::task::spawn_blocking(move || write_offer_letter(&output_dir, &name, &bytes))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking failed in write: {e}"))
        .and_then(|result| result);

    let path = match written {
        Ok(path) => path,
        Err(e) => {
            warn!(
                "Writing {file_name} failed; removing record {}",
                record.unique_id
            );
            if let Err(delete_err) = state.store.delete(collection, &record.unique_id).await {
                warn!(
                    "Record {} left without a document: {delete_err}",
                    record.unique_id
                );
            }
            return Err(AppError::Internal(e));
        }
    };

    info!(
        "Generated {} for record {}",
        path.display(),
        record.unique_id
    );

    Ok(GeneratedOffer {
        record,
        template,
        file_name,
        path,
    })
}

/// Loads the template, substitutes every placeholder and returns the new
/// package bytes. Blocking.
pub fn render_offer_letter(
    template_path: &Path,
    table: &PlaceholderTable,
) -> Result<Vec<u8>, DocxError> {
    let mut document = Document::open(template_path)?;
    replace_placeholders(&mut document, &table.replacements())?;
    document.to_bytes()
}

/// Writes the document atomically under `output_dir`, creating the directory
/// if needed. An existing file with the same name is replaced. Blocking.
pub fn write_offer_letter(
    output_dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let path = output_dir.join(file_name);
    let mut staged = tempfile::NamedTempFile::new_in(output_dir)
        .with_context(|| format!("failed to stage file in {}", output_dir.display()))?;
    staged.write_all(bytes)?;
    staged
        .persist(&path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// `{INTERNSHIP|JOB}_{company}_{serial_number}_{name}.docx`.
///
/// Fully determined by the template kind, serial number and name, so
/// identical submissions overwrite each other's file.
pub fn output_file_name(
    table: &PlaceholderTable,
    template: TemplateChoice,
    company_tag: &str,
) -> String {
    format!(
        "{}_{}_{}_{}.docx",
        template.file_label(),
        file_name_segment(company_tag),
        file_name_segment(table.get(Placeholder::SerialNumber)),
        file_name_segment(table.get(Placeholder::Name))
    )
}

/// Keeps a submitted value inside a single path component.
fn file_name_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{docx_from_body, document_xml_of, run};
    use crate::offer::templates::OfferLetterKind;

    #[test]
    fn test_job_file_name() {
        let submission: Submission = [("serial_number", "7"), ("name", "Asha"), ("oltype", "BDA")]
            .into_iter()
            .collect();
        assert_eq!(
            output_file_name(
                &PlaceholderTable::from_submission(&submission),
                TemplateChoice::Job(OfferLetterKind::Bda),
                "HETERIZE_INFOTECH"
            ),
            "JOB_HETERIZE_INFOTECH_7_Asha.docx"
        );
    }

    #[test]
    fn test_internship_file_name_with_missing_fields() {
        let submission: Submission = [("internship", "on")].into_iter().collect();
        assert_eq!(
            output_file_name(
                &PlaceholderTable::from_submission(&submission),
                TemplateChoice::Internship,
                "HETERIZE_INFOTECH"
            ),
            "INTERNSHIP_HETERIZE_INFOTECH_N-A_N-A.docx"
        );
    }

    #[test]
    fn test_file_name_never_contains_separators() {
        let submission: Submission = [("serial_number", "../../etc"), ("name", "a\\b\nc")]
            .into_iter()
            .collect();
        let name = output_file_name(
            &PlaceholderTable::from_submission(&submission),
            TemplateChoice::Job(OfferLetterKind::Senior),
            "ACME",
        );
        assert_eq!(name, "JOB_ACME_..-..-etc_a-b-c.docx");
        assert!(!name.contains('/') && !name.contains('\\'));
    }

    #[test]
    fn test_render_fills_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("NEW_JOB-5LPA.docx");
        std::fs::write(
            &template,
            docx_from_body(&format!("<w:p>{}{}</w:p>", run("Dear [NAME],"), run(" (S_NO)"))),
        )
        .unwrap();

        let submission: Submission = [("name", "Asha")].into_iter().collect();
        let bytes =
            render_offer_letter(&template, &PlaceholderTable::from_submission(&submission))
                .unwrap();

        let xml = document_xml_of(&bytes);
        assert!(xml.contains("Dear Asha,"));
        assert!(xml.contains(" (N/A)"));
    }

    #[test]
    fn test_render_rejects_values_outside_xml() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("NEW_INTERN.docx");
        std::fs::write(&template, docx_from_body(&format!("<w:p>{}</w:p>", run("[NAME]")))).unwrap();

        let submission: Submission = [("name", "A\u{1}")].into_iter().collect();
        let err = render_offer_letter(&template, &PlaceholderTable::from_submission(&submission))
            .unwrap_err();
        assert!(matches!(err, DocxError::Xml(_)));
    }

    #[test]
    fn test_render_missing_template_is_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_offer_letter(
            &dir.path().join("absent.docx"),
            &PlaceholderTable::from_submission(&Submission::default()),
        )
        .unwrap_err();
        assert!(matches!(err, DocxError::Io { .. }));
    }

    #[test]
    fn test_write_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("offer_letters");

        let path = write_offer_letter(&output, "a.docx", b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_offer_letter(&output, "a.docx", b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(&output).unwrap().count(), 1);
    }
}
