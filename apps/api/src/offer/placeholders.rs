//! Placeholder table: maps submitted form fields onto the fixed set of marker
//! tokens embedded in the offer-letter templates.

use serde::Serialize;

use crate::models::submission::Submission;

/// Value used for any field the submitter left out.
pub const MISSING_VALUE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Placeholder {
    SerialNumber,
    Name,
    FatherName,
    Mobile,
    Date,
    JoiningDate,
    City,
    Aadhar,
    Pan,
    Role,
    Manager,
    InternshipType,
    Stipend,
}

impl Placeholder {
    /// All placeholders in substitution order.
    pub const ALL: [Placeholder; 13] = [
        Placeholder::SerialNumber,
        Placeholder::Name,
        Placeholder::FatherName,
        Placeholder::Mobile,
        Placeholder::Date,
        Placeholder::JoiningDate,
        Placeholder::City,
        Placeholder::Aadhar,
        Placeholder::Pan,
        Placeholder::Role,
        Placeholder::Manager,
        Placeholder::InternshipType,
        Placeholder::Stipend,
    ];

    /// The literal marker as it appears in template text.
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::SerialNumber => "S_NO",
            Placeholder::Name => "[NAME]",
            Placeholder::FatherName => "FATHER",
            Placeholder::Mobile => "MOBILE",
            Placeholder::Date => "DATE",
            Placeholder::JoiningDate => "JODA",
            Placeholder::City => "CITY",
            Placeholder::Aadhar => "AADHAR",
            Placeholder::Pan => "PAN",
            Placeholder::Role => "<ROLE>",
            Placeholder::Manager => "<MANAGER>",
            Placeholder::InternshipType => "ITFP",
            Placeholder::Stipend => "STIPEND",
        }
    }

    /// The form field the value is read from.
    pub fn field(self) -> &'static str {
        match self {
            Placeholder::SerialNumber => "serial_number",
            Placeholder::Name => "name",
            Placeholder::FatherName => "father_name",
            Placeholder::Mobile => "mobile",
            Placeholder::Date => "DATE",
            Placeholder::JoiningDate => "joda",
            Placeholder::City => "city",
            Placeholder::Aadhar => "aadhar",
            Placeholder::Pan => "pan",
            Placeholder::Role => "role",
            Placeholder::Manager => "manager",
            Placeholder::InternshipType => "type",
            Placeholder::Stipend => "stipend",
        }
    }
}

/// Resolved display value for every placeholder, in `Placeholder::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderTable {
    entries: Vec<(Placeholder, String)>,
}

impl PlaceholderTable {
    /// Values are taken verbatim; no shape validation is applied.
    pub fn from_submission(submission: &Submission) -> Self {
        let entries = Placeholder::ALL
            .into_iter()
            .map(|placeholder| {
                let value = submission
                    .get(placeholder.field())
                    .unwrap_or(MISSING_VALUE)
                    .to_string();
                (placeholder, value)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, placeholder: Placeholder) -> &str {
        self.entries
            .iter()
            .find(|(p, _)| *p == placeholder)
            .map(|(_, v)| v.as_str())
            .unwrap_or(MISSING_VALUE)
    }

    /// `(token, value)` pairs in substitution order.
    pub fn replacements(&self) -> Vec<(&'static str, &str)> {
        self.entries
            .iter()
            .map(|(p, v)| (p.token(), v.as_str()))
            .collect()
    }
}
