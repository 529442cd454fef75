use std::collections::BTreeSet;

use rusqlite::Connection;
use tracing::{debug, info};

use super::{DEFAULT_ACTOR, require_text};
use crate::Database;
use crate::db::now;
use crate::error::{Result, ServiceError};
use crate::mapping::document_view;
use crate::models::{
    DocumentFilter, DocumentId, DocumentUpdate, DocumentView, LawDocument, NewDocument, Page,
    PageRequest, TagId, UserId,
};
use crate::store::{AssociationStore, CategoryStore, DocumentRow, DocumentStore, TagStore, UserStore};

/// Law document lifecycle and the tagged-document query.
pub struct DocumentService<'db> {
    db: &'db Database,
    actor: String,
}

impl<'db> DocumentService<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// Records `actor` in the audit columns of subsequent writes.
    pub fn acting_as(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Queries live documents, newest first.
    ///
    /// Every filter that is set must match. When `required_tag_ids` is non-empty
    /// a document must carry every one of those tags; an id that no document is
    /// tagged with therefore yields an empty page rather than an error.
    ///
    /// Each returned view lists the document's full tag set, not only the tags
    /// that were required.
    ///
    /// # Examples
    ///
    /// ```
    /// use lawdoc::{Database, DocumentFilter, DocumentService, NewDocument, TagService};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let db = Database::in_memory()?;
    /// let tags = TagService::new(&db);
    /// let speed = tags.create("speed", None)?;
    /// let fines = tags.create("fines", None)?;
    ///
    /// let docs = DocumentService::new(&db);
    /// docs.create(NewDocument {
    ///     title: "Speed limit decree".into(),
    ///     code: "100/2019/ND-CP".into(),
    ///     tag_ids: vec![speed.id, fines.id],
    ///     ..Default::default()
    /// })?;
    /// docs.create(NewDocument {
    ///     title: "Speed signage circular".into(),
    ///     code: "31/2019/TT-BGTVT".into(),
    ///     tag_ids: vec![speed.id],
    ///     ..Default::default()
    /// })?;
    ///
    /// let page = docs.query_paginated(1, 10, &DocumentFilter::default(), &[speed.id, fines.id])?;
    /// assert_eq!(page.total_count, 1);
    /// assert_eq!(page.items[0].code, "100/2019/ND-CP");
    /// # Ok(())
    /// # }
    /// ```
    pub fn query_paginated(
        &self,
        page_index: u32,
        page_size: u32,
        filter: &DocumentFilter,
        required_tag_ids: &[TagId],
    ) -> Result<Page<DocumentView>> {
        let request = PageRequest::new(page_index, page_size)?;
        let conn = self.db.connection();

        let (rows, total) = DocumentStore::new(conn).search(filter, required_tag_ids, request)?;
        debug!(
            ?filter,
            required_tags = required_tag_ids.len(),
            total,
            page = page_index,
            "queried documents"
        );

        let associations = AssociationStore::new(conn);
        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let tags = associations.tags_for_document(row.document.id)?;
            views.push(document_view(row, tags));
        }
        Ok(Page::new(views, total, request))
    }

    /// Returns a live document with its category, verifier and tags resolved.
    pub fn get_by_id(&self, id: DocumentId) -> Result<DocumentView> {
        let conn = self.db.connection();
        let row = DocumentStore::new(conn).get_by_id(id)?;
        view_of(conn, row)
    }

    /// Creates a document and links it to `tag_ids`.
    ///
    /// The code must be unique among live documents (case-sensitive). The
    /// category and every tag must be live.
    pub fn create(&self, new: NewDocument) -> Result<DocumentView> {
        require_text("document title", &new.title)?;
        require_text("document code", &new.code)?;

        let view = self.db.transaction(|tx| {
            let documents = DocumentStore::new(tx);

            if documents.code_exists(&new.code, None)? {
                return Err(ServiceError::conflict("law document", "code", &new.code));
            }
            if let Some(category_id) = new.category_id {
                CategoryStore::new(tx).get_by_id(category_id)?;
            }
            let tag_ids = live_tags(tx, &new.tag_ids)?;

            let at = now();
            let document = LawDocument {
                id: DocumentId::generate(),
                title: new.title,
                code: new.code,
                category_id: new.category_id,
                file_path: new.file_path,
                link_path: new.link_path,
                verified: new.verified,
                verified_by: None,
                created_at: at,
                created_by: Some(self.actor.clone()),
                updated_at: at,
                updated_by: Some(self.actor.clone()),
                deleted_at: None,
                deleted_by: None,
            };
            documents.create(&document)?;

            let associations = AssociationStore::new(tx);
            for tag_id in tag_ids {
                associations.add(document.id, tag_id)?;
            }

            let row = documents.get_by_id(document.id)?;
            view_of(tx, row)
        })?;

        info!(document_id = %view.id, code = %view.code, tags = view.tags.len(), "created document");
        Ok(view)
    }

    /// Updates a live document.
    ///
    /// When `update.tag_ids` is set the document's tag set is replaced with it;
    /// otherwise the existing associations are left alone.
    pub fn update(&self, id: DocumentId, update: DocumentUpdate) -> Result<DocumentView> {
        require_text("document title", &update.title)?;
        require_text("document code", &update.code)?;

        let view = self.db.transaction(|tx| {
            let documents = DocumentStore::new(tx);
            let mut document = documents.get_by_id(id)?.document;

            if documents.code_exists(&update.code, Some(id))? {
                return Err(ServiceError::conflict("law document", "code", &update.code));
            }
            if let Some(category_id) = update.category_id {
                CategoryStore::new(tx).get_by_id(category_id)?;
            }

            document.title = update.title;
            document.code = update.code;
            document.category_id = update.category_id;
            document.file_path = update.file_path;
            document.link_path = update.link_path;
            document.verified = update.verified;
            document.updated_at = now();
            document.updated_by = Some(self.actor.clone());
            documents.update(&document)?;

            if let Some(tag_ids) = &update.tag_ids {
                let tag_ids = live_tags(tx, tag_ids)?;
                let associations = AssociationStore::new(tx);
                associations.delete_all_for_document(id)?;
                for tag_id in tag_ids {
                    associations.add(id, tag_id)?;
                }
            }

            let row = documents.get_by_id(id)?;
            view_of(tx, row)
        })?;

        info!(document_id = %id, code = %view.code, tags = view.tags.len(), "updated document");
        Ok(view)
    }

    /// Marks a document deleted and removes its tag associations.
    pub fn soft_delete(&self, id: DocumentId) -> Result<()> {
        let removed = self.db.transaction(|tx| {
            if !DocumentStore::new(tx).soft_delete(id, &self.actor, now())? {
                return Err(ServiceError::not_found("law document", id));
            }
            AssociationStore::new(tx).delete_all_for_document(id)
        })?;

        info!(document_id = %id, associations_removed = removed, "soft-deleted document");
        Ok(())
    }

    /// Removes a document row permanently, live or soft-deleted.
    pub fn delete(&self, id: DocumentId) -> Result<()> {
        self.db.transaction(|tx| {
            AssociationStore::new(tx).delete_all_for_document(id)?;
            if !DocumentStore::new(tx).hard_delete(id)? {
                return Err(ServiceError::not_found("law document", id));
            }
            Ok(())
        })?;

        info!(document_id = %id, "deleted document");
        Ok(())
    }

    /// Marks a live document verified by `verifier`.
    pub fn verify(&self, id: DocumentId, verifier: UserId) -> Result<DocumentView> {
        let view = self.db.transaction(|tx| {
            let documents = DocumentStore::new(tx);
            documents.get_by_id(id)?;
            let user = UserStore::new(tx)
                .get(verifier)?
                .ok_or_else(|| ServiceError::not_found("user", verifier))?;

            documents.mark_verified(id, user.id, &user.email, now())?;
            let row = documents.get_by_id(id)?;
            view_of(tx, row)
        })?;

        info!(document_id = %id, verifier = %verifier, "verified document");
        Ok(view)
    }
}

/// Deduplicates `tag_ids`, requiring every one to be a live tag.
fn live_tags(conn: &Connection, tag_ids: &[TagId]) -> Result<BTreeSet<TagId>> {
    let tags = TagStore::new(conn);
    let unique: BTreeSet<TagId> = tag_ids.iter().copied().collect();
    for &tag_id in &unique {
        tags.get_by_id(tag_id)?;
    }
    Ok(unique)
}

fn view_of(conn: &Connection, row: DocumentRow) -> Result<DocumentView> {
    let tags = AssociationStore::new(conn).tags_for_document(row.document.id)?;
    Ok(document_view(row, tags))
}
