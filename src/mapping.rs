//! Hand-written conversions from stored records to display views.

use crate::models::{DocumentView, Tag, TagRef, TagView};
use crate::store::DocumentRow;

/// Builds a tag view, denormalising its parent's name and its live children's names.
pub fn tag_view(tag: Tag, parent_name: Option<String>, child_names: Vec<String>) -> TagView {
    TagView {
        id: tag.id,
        name: tag.name,
        parent_tag_id: tag.parent_tag_id,
        parent_tag_name: parent_name,
        child_tag_names: child_names,
        created_at: tag.created_at,
        updated_at: tag.updated_at,
    }
}

/// Builds a document view from its row and full tag set.
///
/// The verifier's email is only exposed while the document is verified.
pub fn document_view(row: DocumentRow, tags: Vec<TagRef>) -> DocumentView {
    let DocumentRow {
        document,
        category_name,
        verifier_email,
    } = row;

    DocumentView {
        id: document.id,
        title: document.title,
        code: document.code,
        category_id: document.category_id,
        category_name,
        file_path: document.file_path,
        link_path: document.link_path,
        verified: document.verified,
        verified_by: verifier_email.filter(|_| document.verified),
        tags,
        created_at: document.created_at,
        updated_at: document.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::now;
    use crate::models::{DocumentId, LawDocument, TagId, UserId};

    fn row(verified: bool) -> DocumentRow {
        let ts = now();
        DocumentRow {
            document: LawDocument {
                id: DocumentId::generate(),
                title: "Road Traffic Law".to_string(),
                code: "23/2008/QH12".to_string(),
                category_id: None,
                file_path: None,
                link_path: Some("https://example.com/doc.pdf".to_string()),
                verified,
                verified_by: Some(UserId::generate()),
                created_at: ts,
                created_by: Some("System".to_string()),
                updated_at: ts,
                updated_by: Some("System".to_string()),
                deleted_at: None,
                deleted_by: None,
            },
            category_name: Some("Law".to_string()),
            verifier_email: Some("expert@example.com".to_string()),
        }
    }

    #[test]
    fn tag_view_carries_parent_and_children() {
        let parent = TagId::generate();
        let tag = Tag::new("signals", Some(parent), "System", now());
        let view = tag_view(
            tag.clone(),
            Some("traffic".to_string()),
            vec!["lights".to_string()],
        );

        assert_eq!(view.id, tag.id);
        assert_eq!(view.parent_tag_id, Some(parent));
        assert_eq!(view.parent_tag_name.as_deref(), Some("traffic"));
        assert_eq!(view.child_tag_names, vec!["lights"]);
    }

    #[test]
    fn verifier_email_only_when_verified() {
        let verified = document_view(row(true), Vec::new());
        assert_eq!(verified.verified_by.as_deref(), Some("expert@example.com"));
        assert_eq!(verified.category_name.as_deref(), Some("Law"));

        let unverified = document_view(row(false), Vec::new());
        assert_eq!(unverified.verified_by, None);
    }

    #[test]
    fn document_view_keeps_full_tag_set() {
        let tags = vec![
            TagRef {
                id: TagId::generate(),
                name: "a".to_string(),
            },
            TagRef {
                id: TagId::generate(),
                name: "b".to_string(),
            },
        ];
        let view = document_view(row(false), tags.clone());
        assert_eq!(view.tags, tags);
        assert!(view.has_tag(tags[1].id));
    }
}
