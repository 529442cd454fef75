use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use time::OffsetDateTime;

use super::{QueryArgs, search_term, unique_or_storage, where_clause};
use crate::db::{contains_folded, fold_case, optional_timestamp_at, timestamp_at};
use crate::error::{Result, ServiceError};
use crate::hierarchy::ParentLookup;
use crate::models::{PageRequest, Tag, TagFilter, TagId};

const TAG_SELECT: &str = "SELECT t.id, t.name, t.parent_tag_id, t.created_at, t.created_by,
        t.updated_at, t.updated_by, t.deleted_at, t.deleted_by
     FROM tags t";

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_tag_id: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
        created_by: row.get(4)?,
        updated_at: timestamp_at(row, 5)?,
        updated_by: row.get(6)?,
        deleted_at: optional_timestamp_at(row, 7)?,
        deleted_by: row.get(8)?,
    })
}

/// Persisted collection of tag records.
///
/// Reads exclude soft-deleted tags unless the method says otherwise.
pub struct TagStore<'c> {
    conn: &'c Connection,
}

impl<'c> TagStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts a new tag row.
    pub fn create(&self, tag: &Tag) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO tags (id, name, parent_tag_id, created_at, created_by,
                                   updated_at, updated_by, deleted_at, deleted_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    tag.id,
                    tag.name,
                    tag.parent_tag_id,
                    tag.created_at.unix_timestamp(),
                    tag.created_by,
                    tag.updated_at.unix_timestamp(),
                    tag.updated_by,
                    tag.deleted_at.map(OffsetDateTime::unix_timestamp),
                    tag.deleted_by,
                ],
            )
            .map_err(|e| unique_or_storage(e, "tag", "name", &tag.name))?;
        Ok(())
    }

    /// Returns the live tag with `id`, or `NotFound` if it is absent or deleted.
    pub fn get_by_id(&self, id: TagId) -> Result<Tag> {
        self.find_live(id)?
            .ok_or_else(|| ServiceError::not_found("tag", id))
    }

    /// Returns the live tag with `id`, if any.
    pub fn find_live(&self, id: TagId) -> Result<Option<Tag>> {
        let sql = format!("{TAG_SELECT} WHERE t.id = ?1 AND t.deleted_at IS NULL");
        let tag = self
            .conn
            .query_row(&sql, [id], tag_from_row)
            .optional()?;
        Ok(tag)
    }

    /// Returns the tag with `id` whether or not it has been soft-deleted.
    pub fn find_including_deleted(&self, id: TagId) -> Result<Option<Tag>> {
        let sql = format!("{TAG_SELECT} WHERE t.id = ?1");
        let tag = self
            .conn
            .query_row(&sql, [id], tag_from_row)
            .optional()?;
        Ok(tag)
    }

    /// Writes the tag's name, parent and update audit fields.
    pub fn update(&self, tag: &Tag) -> Result<()> {
        self.conn
            .execute(
                "UPDATE tags
                 SET name = ?1, parent_tag_id = ?2, updated_at = ?3, updated_by = ?4
                 WHERE id = ?5",
                params![
                    tag.name,
                    tag.parent_tag_id,
                    tag.updated_at.unix_timestamp(),
                    tag.updated_by,
                    tag.id,
                ],
            )
            .map_err(|e| unique_or_storage(e, "tag", "name", &tag.name))?;
        Ok(())
    }

    /// Marks the tag deleted. Returns false if it was absent or already deleted.
    pub fn soft_delete(&self, id: TagId, actor: &str, now: OffsetDateTime) -> Result<bool> {
        let ts = now.unix_timestamp();
        let changed = self.conn.execute(
            "UPDATE tags
             SET deleted_at = ?1, deleted_by = ?2, updated_at = ?1, updated_by = ?2
             WHERE id = ?3 AND deleted_at IS NULL",
            params![ts, actor, id],
        )?;
        Ok(changed > 0)
    }

    /// Live tags whose parent is `parent_id`, ordered by name.
    pub fn list_children(&self, parent_id: TagId) -> Result<Vec<Tag>> {
        let sql = format!(
            "{TAG_SELECT} WHERE t.parent_tag_id = ?1 AND t.deleted_at IS NULL
             ORDER BY fold_case(t.name), t.name, t.rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([parent_id], tag_from_row)?;

        let mut children = Vec::new();
        for row in rows {
            children.push(row?);
        }
        Ok(children)
    }

    /// Clears the parent of every live child of `parent_id`.
    ///
    /// Returns the number of tags detached.
    pub fn detach_children(
        &self,
        parent_id: TagId,
        actor: &str,
        now: OffsetDateTime,
    ) -> Result<usize> {
        let detached = self.conn.execute(
            "UPDATE tags
             SET parent_tag_id = NULL, updated_at = ?1, updated_by = ?2
             WHERE parent_tag_id = ?3 AND deleted_at IS NULL",
            params![now.unix_timestamp(), actor, parent_id],
        )?;
        Ok(detached)
    }

    /// Whether a live tag other than `exclude` already uses `name`.
    ///
    /// The comparison is exact and case-sensitive.
    pub fn name_exists(&self, name: &str, exclude: Option<TagId>) -> Result<bool> {
        let exists: bool = match exclude {
            Some(id) => self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tags
                  WHERE name = ?1 COLLATE BINARY AND deleted_at IS NULL AND id <> ?2)",
                params![name, id],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tags
                  WHERE name = ?1 COLLATE BINARY AND deleted_at IS NULL)",
                [name],
                |row| row.get(0),
            )?,
        };
        Ok(exists)
    }

    /// Filters, orders by name and paginates live tags.
    ///
    /// Returns the page of tags and the total number of matches.
    pub fn search(&self, filter: &TagFilter, page: PageRequest) -> Result<(Vec<Tag>, u64)> {
        let mut conditions = vec!["t.deleted_at IS NULL".to_string()];
        let mut args: QueryArgs = Vec::new();

        if let Some(id) = filter.id {
            conditions.push("t.id = ?".to_string());
            args.push(Box::new(id));
        }
        if let Some(name) = search_term(&filter.name) {
            conditions.push(contains_folded("t.name"));
            args.push(Box::new(fold_case(name)));
        }
        if let Some(parent_name) = search_term(&filter.parent_name) {
            conditions.push(contains_folded("p.name"));
            args.push(Box::new(fold_case(parent_name)));
        }

        let from = format!(
            "FROM tags t LEFT JOIN tags p ON p.id = t.parent_tag_id {}",
            where_clause(&conditions)
        );

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) {from}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        args.push(Box::new(page.limit()));
        args.push(Box::new(page.offset()));
        let sql = format!(
            "SELECT t.id, t.name, t.parent_tag_id, t.created_at, t.created_by,
                    t.updated_at, t.updated_by, t.deleted_at, t.deleted_by
             {from}
             ORDER BY fold_case(t.name), t.name, t.rowid
             LIMIT ? OFFSET ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), tag_from_row)?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok((tags, u64::try_from(total).unwrap_or(0)))
    }
}

impl ParentLookup for TagStore<'_> {
    fn parent_of(&self, id: TagId) -> Result<Option<TagId>> {
        let parent: Option<Option<TagId>> = self
            .conn
            .query_row(
                "SELECT parent_tag_id FROM tags WHERE id = ?1 AND deleted_at IS NULL",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(parent.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, now};

    fn insert(store: &TagStore<'_>, name: &str, parent: Option<TagId>) -> Tag {
        let tag = Tag::new(name, parent, "System", now());
        store.create(&tag).unwrap();
        tag
    }

    #[test]
    fn create_then_get_round_trips_all_fields() {
        let db = Database::in_memory().unwrap();
        let store = TagStore::new(db.connection());
        let root = insert(&store, "traffic", None);
        let child = insert(&store, "signals", Some(root.id));

        let loaded = store.get_by_id(child.id).unwrap();
        assert_eq!(loaded, child);
    }

    #[test]
    fn soft_deleted_tag_is_hidden_from_live_reads() {
        let db = Database::in_memory().unwrap();
        let store = TagStore::new(db.connection());
        let tag = insert(&store, "obsolete", None);

        assert!(store.soft_delete(tag.id, "System", now()).unwrap());
        assert!(!store.soft_delete(tag.id, "System", now()).unwrap());

        assert!(matches!(
            store.get_by_id(tag.id),
            Err(ServiceError::NotFound { .. })
        ));
        let raw = store.find_including_deleted(tag.id).unwrap().unwrap();
        assert!(raw.is_deleted());
        assert_eq!(raw.deleted_by.as_deref(), Some("System"));
    }

    #[test]
    fn name_exists_is_case_sensitive_and_ignores_deleted() {
        let db = Database::in_memory().unwrap();
        let store = TagStore::new(db.connection());
        let tag = insert(&store, "Helmet", None);

        assert!(store.name_exists("Helmet", None).unwrap());
        assert!(!store.name_exists("helmet", None).unwrap());
        assert!(!store.name_exists("Helmet", Some(tag.id)).unwrap());

        store.soft_delete(tag.id, "System", now()).unwrap();
        assert!(!store.name_exists("Helmet", None).unwrap());
    }

    #[test]
    fn duplicate_live_name_insert_is_a_conflict() {
        let db = Database::in_memory().unwrap();
        let store = TagStore::new(db.connection());
        insert(&store, "dup", None);

        let again = Tag::new("dup", None, "System", now());
        assert!(matches!(
            store.create(&again),
            Err(ServiceError::Conflict { .. })
        ));
    }

    #[test]
    fn children_and_detach() {
        let db = Database::in_memory().unwrap();
        let store = TagStore::new(db.connection());
        let root = insert(&store, "root", None);
        let b = insert(&store, "b", Some(root.id));
        let a = insert(&store, "a", Some(root.id));
        let gone = insert(&store, "c", Some(root.id));
        store.soft_delete(gone.id, "System", now()).unwrap();

        let names: Vec<String> = store
            .list_children(root.id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(store.detach_children(root.id, "System", now()).unwrap(), 2);
        assert!(store.list_children(root.id).unwrap().is_empty());
        assert!(store.get_by_id(a.id).unwrap().is_root());
        assert!(store.get_by_id(b.id).unwrap().is_root());
    }

    #[test]
    fn parent_lookup_skips_deleted_tags() {
        let db = Database::in_memory().unwrap();
        let store = TagStore::new(db.connection());
        let root = insert(&store, "root", None);
        let leaf = insert(&store, "leaf", Some(root.id));

        assert_eq!(store.parent_of(leaf.id).unwrap(), Some(root.id));
        assert_eq!(store.parent_of(root.id).unwrap(), None);

        store.soft_delete(leaf.id, "System", now()).unwrap();
        assert_eq!(store.parent_of(leaf.id).unwrap(), None);
    }

    #[test]
    fn search_filters_orders_and_counts() {
        let db = Database::in_memory().unwrap();
        let store = TagStore::new(db.connection());
        let vehicles = insert(&store, "vehicles", None);
        insert(&store, "trucks", Some(vehicles.id));
        insert(&store, "cars", Some(vehicles.id));
        insert(&store, "roads", None);

        let all = TagFilter::default();
        let (page, total) = store.search(&all, PageRequest::new(1, 2).unwrap()).unwrap();
        assert_eq!(total, 4);
        let names: Vec<&str> = page.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["cars", "roads"]);

        let by_parent = TagFilter {
            parent_name: Some("VEHIC".to_string()),
            ..Default::default()
        };
        let (page, total) = store
            .search(&by_parent, PageRequest::new(1, 10).unwrap())
            .unwrap();
        assert_eq!(total, 2);
        assert!(page.iter().all(|t| t.parent_tag_id == Some(vehicles.id)));
    }
}
