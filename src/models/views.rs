use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{CategoryId, DocumentId, TagId};

/// A tag prepared for display, with its parent and children denormalised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagView {
    pub id: TagId,
    pub name: String,
    pub parent_tag_id: Option<TagId>,
    pub parent_tag_name: Option<String>,
    /// Names of live child tags, sorted ascending.
    pub child_tag_names: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Tag id and name pair attached to a document view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: TagId,
    pub name: String,
}

/// A law document prepared for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub title: String,
    pub code: String,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub file_path: Option<String>,
    pub link_path: Option<String>,
    pub verified: bool,
    /// Email of the verifying user, when verified.
    pub verified_by: Option<String>,
    /// The document's full tag set.
    pub tags: Vec<TagRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl DocumentView {
    pub fn has_tag(&self, tag_id: TagId) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}
