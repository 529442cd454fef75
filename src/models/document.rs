use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{CategoryId, DocumentId, TagId, UserId};

/// A law document as stored.
///
/// Its tag set lives in the association table and is owned exclusively by the
/// document: deleting the document removes its associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawDocument {
    pub id: DocumentId,
    pub title: String,
    pub code: String,
    pub category_id: Option<CategoryId>,
    pub file_path: Option<String>,
    pub link_path: Option<String>,
    pub verified: bool,
    pub verified_by: Option<UserId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub updated_by: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
    pub deleted_by: Option<String>,
}

impl LawDocument {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating a law document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub code: String,
    pub category_id: Option<CategoryId>,
    pub file_path: Option<String>,
    pub link_path: Option<String>,
    pub verified: bool,
    pub tag_ids: Vec<TagId>,
}

/// Input for updating a law document.
///
/// `tag_ids` of `None` leaves the document's tags untouched; `Some` replaces the
/// whole tag set (an empty list clears it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub title: String,
    pub code: String,
    pub category_id: Option<CategoryId>,
    pub file_path: Option<String>,
    pub link_path: Option<String>,
    pub verified: bool,
    pub tag_ids: Option<Vec<TagId>>,
}

/// Optional, conjunctive filters for the document query.
///
/// Absent fields impose no constraint. String fields match as substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub id: Option<DocumentId>,
    pub title: Option<String>,
    pub code: Option<String>,
    pub category_name: Option<String>,
    pub file_path: Option<String>,
    pub link_path: Option<String>,
    pub verified: Option<bool>,
}
