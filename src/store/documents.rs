use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use time::OffsetDateTime;

use super::{QueryArgs, search_term, unique_or_storage, where_clause};
use crate::db::{contains_folded, fold_case, optional_timestamp_at, timestamp_at};
use crate::error::{Result, ServiceError};
use crate::models::{DocumentFilter, DocumentId, LawDocument, PageRequest, TagId, UserId};

const DOCUMENT_COLUMNS: &str = "d.id, d.title, d.code, d.category_id, d.file_path, d.link_path,
        d.verified, d.verified_by, d.created_at, d.created_by, d.updated_at, d.updated_by,
        d.deleted_at, d.deleted_by, c.name, u.email";

const DOCUMENT_JOINS: &str = "FROM law_documents d
     LEFT JOIN categories c ON c.id = d.category_id
     LEFT JOIN users u ON u.id = d.verified_by";

/// A document row together with the names its view needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub document: LawDocument,
    pub category_name: Option<String>,
    pub verifier_email: Option<String>,
}

fn document_row_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        document: LawDocument {
            id: row.get(0)?,
            title: row.get(1)?,
            code: row.get(2)?,
            category_id: row.get(3)?,
            file_path: row.get(4)?,
            link_path: row.get(5)?,
            verified: row.get(6)?,
            verified_by: row.get(7)?,
            created_at: timestamp_at(row, 8)?,
            created_by: row.get(9)?,
            updated_at: timestamp_at(row, 10)?,
            updated_by: row.get(11)?,
            deleted_at: optional_timestamp_at(row, 12)?,
            deleted_by: row.get(13)?,
        },
        category_name: row.get(14)?,
        verifier_email: row.get(15)?,
    })
}

/// Persisted law documents.
pub struct DocumentStore<'c> {
    conn: &'c Connection,
}

impl<'c> DocumentStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, doc: &LawDocument) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO law_documents (id, title, code, category_id, file_path, link_path,
                     verified, verified_by, created_at, created_by, updated_at, updated_by,
                     deleted_at, deleted_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    doc.id,
                    doc.title,
                    doc.code,
                    doc.category_id,
                    doc.file_path,
                    doc.link_path,
                    doc.verified,
                    doc.verified_by,
                    doc.created_at.unix_timestamp(),
                    doc.created_by,
                    doc.updated_at.unix_timestamp(),
                    doc.updated_by,
                    doc.deleted_at.map(OffsetDateTime::unix_timestamp),
                    doc.deleted_by,
                ],
            )
            .map_err(|e| unique_or_storage(e, "law document", "code", &doc.code))?;
        Ok(())
    }

    /// Returns the live document, or `NotFound` if it is absent or deleted.
    pub fn get_by_id(&self, id: DocumentId) -> Result<DocumentRow> {
        self.find_live(id)?
            .ok_or_else(|| ServiceError::not_found("law document", id))
    }

    pub fn find_live(&self, id: DocumentId) -> Result<Option<DocumentRow>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} {DOCUMENT_JOINS} WHERE d.id = ?1 AND d.deleted_at IS NULL"
        );
        let row = self
            .conn
            .query_row(&sql, [id], document_row_from_row)
            .optional()?;
        Ok(row)
    }

    #[cfg(test)]
    pub fn exists(&self, id: DocumentId) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM law_documents WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Writes the editable fields and update audit fields.
    pub fn update(&self, doc: &LawDocument) -> Result<()> {
        self.conn
            .execute(
                "UPDATE law_documents
                 SET title = ?1, code = ?2, category_id = ?3, file_path = ?4, link_path = ?5,
                     verified = ?6, updated_at = ?7, updated_by = ?8
                 WHERE id = ?9",
                params![
                    doc.title,
                    doc.code,
                    doc.category_id,
                    doc.file_path,
                    doc.link_path,
                    doc.verified,
                    doc.updated_at.unix_timestamp(),
                    doc.updated_by,
                    doc.id,
                ],
            )
            .map_err(|e| unique_or_storage(e, "law document", "code", &doc.code))?;
        Ok(())
    }

    /// Marks the document deleted. Returns false if it was absent or already deleted.
    pub fn soft_delete(&self, id: DocumentId, actor: &str, now: OffsetDateTime) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE law_documents
             SET deleted_at = ?1, deleted_by = ?2, updated_at = ?1, updated_by = ?2
             WHERE id = ?3 AND deleted_at IS NULL",
            params![now.unix_timestamp(), actor, id],
        )?;
        Ok(changed > 0)
    }

    /// Removes the row. Associations go with it through the foreign-key cascade.
    pub fn hard_delete(&self, id: DocumentId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM law_documents WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    pub fn mark_verified(
        &self,
        id: DocumentId,
        verifier: UserId,
        actor: &str,
        now: OffsetDateTime,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE law_documents
             SET verified = 1, verified_by = ?1, updated_at = ?2, updated_by = ?3
             WHERE id = ?4",
            params![verifier, now.unix_timestamp(), actor, id],
        )?;
        Ok(())
    }

    /// Whether a live document other than `exclude` already uses `code`.
    ///
    /// The comparison is exact and case-sensitive.
    pub fn code_exists(&self, code: &str, exclude: Option<DocumentId>) -> Result<bool> {
        let exists: bool = match exclude {
            Some(id) => self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM law_documents
                  WHERE code = ?1 COLLATE BINARY AND deleted_at IS NULL AND id <> ?2)",
                params![code, id],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM law_documents
                  WHERE code = ?1 COLLATE BINARY AND deleted_at IS NULL)",
                [code],
                |row| row.get(0),
            )?,
        };
        Ok(exists)
    }

    /// Filters, orders newest first and paginates live documents.
    ///
    /// A non-empty `required_tags` keeps only documents associated with every
    /// one of those tags. Returns the page and the total number of matches.
    pub fn search(
        &self,
        filter: &DocumentFilter,
        required_tags: &[TagId],
        page: PageRequest,
    ) -> Result<(Vec<DocumentRow>, u64)> {
        let mut conditions = vec!["d.deleted_at IS NULL".to_string()];
        let mut args: QueryArgs = Vec::new();

        if let Some(id) = filter.id {
            conditions.push("d.id = ?".to_string());
            args.push(Box::new(id));
        }
        for (column, term) in [
            ("d.title", &filter.title),
            ("d.code", &filter.code),
            ("c.name", &filter.category_name),
            ("d.file_path", &filter.file_path),
            ("d.link_path", &filter.link_path),
        ] {
            if let Some(term) = search_term(term) {
                conditions.push(contains_folded(column));
                args.push(Box::new(fold_case(term)));
            }
        }
        if let Some(verified) = filter.verified {
            conditions.push("d.verified = ?".to_string());
            args.push(Box::new(verified));
        }

        let required: BTreeSet<TagId> = required_tags.iter().copied().collect();
        if !required.is_empty() {
            let placeholders = vec!["?"; required.len()].join(", ");
            conditions.push(format!(
                "d.id IN (SELECT dt.document_id FROM document_tags dt
                          WHERE dt.tag_id IN ({placeholders})
                          GROUP BY dt.document_id
                          HAVING COUNT(DISTINCT dt.tag_id) = ?)"
            ));
            for tag_id in &required {
                args.push(Box::new(*tag_id));
            }
            args.push(Box::new(required.len() as i64));
        }

        let filtered = format!("{DOCUMENT_JOINS} {}", where_clause(&conditions));

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) {filtered}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        args.push(Box::new(page.limit()));
        args.push(Box::new(page.offset()));
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} {filtered}
             ORDER BY d.created_at DESC, d.rowid DESC
             LIMIT ? OFFSET ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), document_row_from_row)?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?);
        }
        Ok((documents, u64::try_from(total).unwrap_or(0)))
    }
}
