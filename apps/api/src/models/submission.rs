use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Form field carrying the HTML checkbox for internships.
pub const INTERNSHIP_FIELD: &str = "internship";
/// Form field carrying the offer-letter category code.
pub const OLTYPE_FIELD: &str = "oltype";

/// A raw form submission. No schema is enforced: any field may be absent and
/// unknown fields are kept so they are persisted alongside the known ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission(BTreeMap<String, String>);

impl Submission {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Browsers send `on` for a checked checkbox and omit the field otherwise.
    pub fn is_internship(&self) -> bool {
        self.get(INTERNSHIP_FIELD) == Some("on")
    }

    pub fn oltype(&self) -> Option<&str> {
        self.get(OLTYPE_FIELD)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Submission {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A submission as written to the record store. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedRecord {
    pub unique_id: String,
    pub timestamp: String,
    pub fields: Submission,
}

impl GeneratedRecord {
    pub fn new(unique_id: String, created_at: DateTime<Utc>, fields: Submission) -> Self {
        Self {
            unique_id,
            timestamp: created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            fields,
        }
    }

    /// The flat document body: submitted fields plus `unique_id` and `timestamp`.
    pub fn document_fields(&self) -> BTreeMap<String, String> {
        let mut fields = self.fields.fields().clone();
        fields.insert("timestamp".to_string(), self.timestamp.clone());
        fields.insert("unique_id".to_string(), self.unique_id.clone());
        fields
    }
}
