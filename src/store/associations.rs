use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::{Association, AssociationId, AssociationView, DocumentId, TagId, TagRef};

fn association_from_row(row: &Row<'_>) -> rusqlite::Result<Association> {
    Ok(Association {
        id: row.get(0)?,
        document_id: row.get(1)?,
        tag_id: row.get(2)?,
    })
}

/// Persisted many-to-many mapping between law documents and tags.
///
/// Pure persistence: callers validate that documents and tags are live.
pub struct AssociationStore<'c> {
    conn: &'c Connection,
}

impl<'c> AssociationStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Links `document_id` to `tag_id`, returning the association.
    ///
    /// If the pair is already linked the existing association is returned.
    pub fn add(&self, document_id: DocumentId, tag_id: TagId) -> Result<Association> {
        if let Some(existing) = self.find(document_id, tag_id)? {
            return Ok(existing);
        }

        let association = Association::new(document_id, tag_id);
        self.conn.execute(
            "INSERT INTO document_tags (id, document_id, tag_id) VALUES (?1, ?2, ?3)",
            params![association.id, association.document_id, association.tag_id],
        )?;
        Ok(association)
    }

    /// Returns the association for the pair, if any.
    pub fn find(&self, document_id: DocumentId, tag_id: TagId) -> Result<Option<Association>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, document_id, tag_id FROM document_tags
                 WHERE document_id = ?1 AND tag_id = ?2",
                params![document_id, tag_id],
                association_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Associations of a document joined with tag names, ordered by case-folded tag name.
    pub fn list_by_document(&self, document_id: DocumentId) -> Result<Vec<AssociationView>> {
        let mut stmt = self.conn.prepare(
            "SELECT dt.id, dt.document_id, dt.tag_id, t.name
             FROM document_tags dt
             JOIN tags t ON t.id = dt.tag_id
             WHERE dt.document_id = ?1
             ORDER BY fold_case(t.name), t.name, dt.rowid",
        )?;
        let rows = stmt.query_map([document_id], |row| {
            Ok(AssociationView {
                id: row.get(0)?,
                document_id: row.get(1)?,
                tag_id: row.get(2)?,
                tag_name: row.get(3)?,
            })
        })?;

        let mut views = Vec::new();
        for row in rows {
            views.push(row?);
        }
        Ok(views)
    }

    /// The document's tag set as id/name pairs, ordered by tag name.
    pub fn tags_for_document(&self, document_id: DocumentId) -> Result<Vec<TagRef>> {
        Ok(self
            .list_by_document(document_id)?
            .into_iter()
            .map(|a| TagRef {
                id: a.tag_id,
                name: a.tag_name,
            })
            .collect())
    }

    /// Deletes one association. Returns false if it did not exist.
    pub fn delete_by_id(&self, id: AssociationId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM document_tags WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Deletes every association of a document, returning how many were removed.
    pub fn delete_all_for_document(&self, document_id: DocumentId) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM document_tags WHERE document_id = ?1",
            [document_id],
        )?;
        Ok(deleted)
    }

    /// Deletes every association referencing a tag, returning how many were removed.
    pub fn delete_all_for_tag(&self, tag_id: TagId) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM document_tags WHERE tag_id = ?1", [tag_id])?;
        Ok(deleted)
    }

    #[cfg(test)]
    pub fn count_for_tag(&self, tag_id: TagId) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM document_tags WHERE tag_id = ?1",
            [tag_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
