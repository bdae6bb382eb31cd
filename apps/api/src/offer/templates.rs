//! Template selection: internship flag and offer-letter category code to an
//! on-disk template file.

use std::path::{Path, PathBuf};

use serde::Serialize;

pub const INTERNSHIP_TEMPLATE: &str = "NEW_INTERN.docx";

/// Offer-letter category for full-time positions. Each maps to one template
/// (and implicitly one compensation tier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OfferLetterKind {
    Bda,
    Senior,
    GraphicDesignerHr,
    TelecallerCatalog,
}

impl OfferLetterKind {
    pub const ALL: [OfferLetterKind; 4] = [
        OfferLetterKind::Bda,
        OfferLetterKind::Senior,
        OfferLetterKind::GraphicDesignerHr,
        OfferLetterKind::TelecallerCatalog,
    ];

    /// The code submitted by the form's `oltype` field.
    pub fn code(self) -> &'static str {
        match self {
            OfferLetterKind::Bda => "BDA",
            OfferLetterKind::Senior => "Senior",
            OfferLetterKind::GraphicDesignerHr => "Graphic Designer/Human Resource",
            OfferLetterKind::TelecallerCatalog => "Telecaller/Catalog",
        }
    }

    pub fn template_file(self) -> &'static str {
        match self {
            OfferLetterKind::Bda => "NEW_JOB-5LPA.docx",
            OfferLetterKind::Senior => "NEW_JOB-7LPA.docx",
            OfferLetterKind::GraphicDesignerHr => "NEW_JOB-2.2LPA.docx",
            OfferLetterKind::TelecallerCatalog => "NEW_JOB-1.8LPA.docx",
        }
    }

    /// Exact, case-sensitive match on the category code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemplateChoice {
    Internship,
    Job(OfferLetterKind),
}

impl TemplateChoice {
    pub fn template_file(self) -> &'static str {
        match self {
            TemplateChoice::Internship => INTERNSHIP_TEMPLATE,
            TemplateChoice::Job(kind) => kind.template_file(),
        }
    }

    /// Leading segment of the generated file name.
    pub fn file_label(self) -> &'static str {
        match self {
            TemplateChoice::Internship => "INTERNSHIP",
            TemplateChoice::Job(_) => "JOB",
        }
    }
}

/// The internship flag wins over any category code, known or not.
/// `None` means the submission named no usable template.
pub fn select_template(oltype: Option<&str>, internship: bool) -> Option<TemplateChoice> {
    if internship {
        return Some(TemplateChoice::Internship);
    }
    oltype
        .and_then(OfferLetterKind::from_code)
        .map(TemplateChoice::Job)
}

/// Directory holding the template files.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    dir: PathBuf,
}

impl TemplateCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, choice: TemplateChoice) -> PathBuf {
        self.dir.join(choice.template_file())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Template files that are not present on disk.
    pub fn missing_templates(&self) -> Vec<PathBuf> {
        std::iter::once(TemplateChoice::Internship)
            .chain(OfferLetterKind::ALL.into_iter().map(TemplateChoice::Job))
            .map(|choice| self.path_for(choice))
            .filter(|path| !path.is_file())
            .collect()
    }
}
