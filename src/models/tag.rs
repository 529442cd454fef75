use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::TagId;

/// A document tag as stored, including its position in the tag tree.
///
/// The tree is represented only through `parent_tag_id`; a tag's children are
/// derived by looking up tags whose parent is this tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub parent_tag_id: Option<TagId>,
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

impl Tag {
    /// Creates a new, live tag stamped with `now` and attributed to `actor`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lawdoc::Tag;
    /// use time::OffsetDateTime;
    ///
    /// let tag = Tag::new("speed-limits", None, "System", OffsetDateTime::now_utc());
    /// assert_eq!(tag.name, "speed-limits");
    /// assert!(tag.is_root());
    /// assert!(!tag.is_deleted());
    /// ```
    pub fn new(
        name: impl Into<String>,
        parent_tag_id: Option<TagId>,
        actor: &str,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: TagId::generate(),
            name: name.into(),
            parent_tag_id,
            created_at: now,
            created_by: Some(actor.to_string()),
            updated_at: now,
            updated_by: Some(actor.to_string()),
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent_tag_id.is_none()
    }
}

/// Optional, conjunctive filters for listing tags.
///
/// `name` and `parent_name` match as substrings; a parent-name filter only
/// matches tags that have a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    pub id: Option<TagId>,
    pub name: Option<String>,
    pub parent_name: Option<String>,
}
