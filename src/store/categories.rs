use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use time::OffsetDateTime;

use super::{QueryArgs, search_term, unique_or_storage, where_clause};
use crate::db::{contains_folded, fold_case, optional_timestamp_at, timestamp_at};
use crate::error::{Result, ServiceError};
use crate::models::{Category, CategoryId, PageRequest};

const CATEGORY_SELECT: &str = "SELECT id, name, created_at, created_by, updated_at, updated_by,
        deleted_at, deleted_by
     FROM categories";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: timestamp_at(row, 2)?,
        created_by: row.get(3)?,
        updated_at: timestamp_at(row, 4)?,
        updated_by: row.get(5)?,
        deleted_at: optional_timestamp_at(row, 6)?,
        deleted_by: row.get(7)?,
    })
}

/// Persisted document categories.
pub struct CategoryStore<'c> {
    conn: &'c Connection,
}

impl<'c> CategoryStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, category: &Category) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO categories (id, name, created_at, created_by, updated_at, updated_by,
                     deleted_at, deleted_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    category.id,
                    category.name,
                    category.created_at.unix_timestamp(),
                    category.created_by,
                    category.updated_at.unix_timestamp(),
                    category.updated_by,
                    category.deleted_at.map(OffsetDateTime::unix_timestamp),
                    category.deleted_by,
                ],
            )
            .map_err(|e| unique_or_storage(e, "document category", "name", &category.name))?;
        Ok(())
    }

    /// Returns the live category, or `NotFound` if it is absent or deleted.
    pub fn get_by_id(&self, id: CategoryId) -> Result<Category> {
        let sql = format!("{CATEGORY_SELECT} WHERE id = ?1 AND deleted_at IS NULL");
        self.conn
            .query_row(&sql, [id], category_from_row)
            .optional()?
            .ok_or_else(|| ServiceError::not_found("document category", id))
    }

    pub fn update(&self, category: &Category) -> Result<()> {
        self.conn
            .execute(
                "UPDATE categories SET name = ?1, updated_at = ?2, updated_by = ?3 WHERE id = ?4",
                params![
                    category.name,
                    category.updated_at.unix_timestamp(),
                    category.updated_by,
                    category.id,
                ],
            )
            .map_err(|e| unique_or_storage(e, "document category", "name", &category.name))?;
        Ok(())
    }

    pub fn soft_delete(&self, id: CategoryId, actor: &str, now: OffsetDateTime) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE categories
             SET deleted_at = ?1, deleted_by = ?2, updated_at = ?1, updated_by = ?2
             WHERE id = ?3 AND deleted_at IS NULL",
            params![now.unix_timestamp(), actor, id],
        )?;
        Ok(changed > 0)
    }

    /// Whether a live category other than `exclude` already uses `name`
    /// (exact, case-sensitive).
    pub fn name_exists(&self, name: &str, exclude: Option<CategoryId>) -> Result<bool> {
        let exists: bool = match exclude {
            Some(id) => self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories
                  WHERE name = ?1 COLLATE BINARY AND deleted_at IS NULL AND id <> ?2)",
                params![name, id],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories
                  WHERE name = ?1 COLLATE BINARY AND deleted_at IS NULL)",
                [name],
                |row| row.get(0),
            )?,
        };
        Ok(exists)
    }

    /// Live categories, newest first, optionally filtered by id and name substring.
    pub fn search(
        &self,
        id: Option<CategoryId>,
        name: &Option<String>,
        page: PageRequest,
    ) -> Result<(Vec<Category>, u64)> {
        let mut conditions = vec!["deleted_at IS NULL".to_string()];
        let mut args: QueryArgs = Vec::new();

        if let Some(id) = id {
            conditions.push("id = ?".to_string());
            args.push(Box::new(id));
        }
        if let Some(name) = search_term(name) {
            conditions.push(contains_folded("name"));
            args.push(Box::new(fold_case(name)));
        }
        let filter = where_clause(&conditions);

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM categories {filter}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        args.push(Box::new(page.limit()));
        args.push(Box::new(page.offset()));
        let sql = format!(
            "{CATEGORY_SELECT} {filter} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), category_from_row)?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok((categories, u64::try_from(total).unwrap_or(0)))
    }
}
