mod migration;

use std::path::Path;

use anyhow::Result;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{Connection, InterruptHandle, Row, Transaction};
use time::{Duration, OffsetDateTime};

pub use migration::{MIGRATIONS, Migration, current_version};

/// Database wrapper providing connection management, schema migration and
/// transaction scoping.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically applies all migrations on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically applies pending migrations on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    fn initialize(mut conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        register_functions(&conn)?;
        migration::apply_pending_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` inside a single transaction.
    ///
    /// Commits when `f` returns `Ok`. When `f` returns `Err`, or unwinds, the
    /// transaction guard is dropped uncommitted and every statement it ran is
    /// rolled back.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<rusqlite::Error>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Returns a handle that can abort the statement currently running on this
    /// connection from another thread.
    ///
    /// An interrupted statement fails with `SQLITE_INTERRUPT`; inside
    /// [`Database::transaction`] that error rolls the whole transaction back.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }
}

/// Current UTC time truncated to whole seconds, the resolution timestamps are
/// stored at.
pub(crate) fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Reads a unix-seconds column as a UTC timestamp.
pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

/// Reads a nullable unix-seconds column.
pub(crate) fn optional_timestamp_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<OffsetDateTime>> {
    let secs: Option<i64> = row.get(idx)?;
    secs.map(|s| {
        OffsetDateTime::from_unix_timestamp(s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e))
        })
    })
    .transpose()
}

/// Lowercases `text` with full Unicode case mapping.
///
/// Search filters and name ordering compare folded text on both sides, so
/// `đường` matches `Đường bộ`. SQLite's own `LIKE` and `lower()` only fold ASCII.
pub(crate) fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// SQL condition: `column` contains the folded needle bound to the next `?`.
///
/// Pair with [`fold_case`] applied to the needle. `instr` takes the needle
/// literally, so `%` and `_` need no escaping. A NULL column never matches.
pub(crate) fn contains_folded(column: &str) -> String {
    format!("instr(fold_case({column}), ?) > 0")
}

/// Registers `fold_case(text)` on the connection.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| fold_case(&t)))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names_of(db: &Database, kind: &str) -> Vec<String> {
        db.connection()
            .prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn in_memory_opens_successfully() {
        let result = Database::in_memory();
        assert!(result.is_ok());
    }

    #[test]
    fn schema_tables_exist() {
        let db = Database::in_memory().unwrap();
        let tables = names_of(&db, "table");

        for expected in [
            "users",
            "categories",
            "tags",
            "law_documents",
            "document_tags",
            "schema_migrations",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn schema_indexes_exist() {
        let db = Database::in_memory().unwrap();
        let indexes = names_of(&db, "index");

        assert!(indexes.contains(&"idx_tags_live_name".to_string()));
        assert!(indexes.contains(&"idx_tags_parent".to_string()));
        assert!(indexes.contains(&"idx_law_documents_live_code".to_string()));
        assert!(indexes.contains(&"idx_document_tags_document".to_string()));
        assert!(indexes.contains(&"idx_document_tags_tag".to_string()));
    }

    #[test]
    fn foreign_keys_enabled() {
        let db = Database::in_memory().unwrap();

        let fk_enabled: i32 = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn verifier_column_added_by_second_migration() {
        let db = Database::in_memory().unwrap();
        let columns: Vec<String> = db
            .connection()
            .prepare("PRAGMA table_info(law_documents)")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(columns.contains(&"verified_by".to_string()));
        assert_eq!(current_version(db.connection()).unwrap(), 2);
    }

    #[test]
    fn live_tag_names_are_unique_but_deleted_names_are_reusable() {
        let db = Database::in_memory().unwrap();
        let conn = db.connection();
        let insert = "INSERT INTO tags (id, name, created_at, updated_at, deleted_at)
                      VALUES (?1, ?2, 0, 0, ?3)";

        conn.execute(insert, rusqlite::params![uuid::Uuid::new_v4(), "A", 5])
            .unwrap();
        conn.execute(
            insert,
            rusqlite::params![uuid::Uuid::new_v4(), "A", None::<i64>],
        )
        .unwrap();
        // Different case is a different name.
        conn.execute(
            insert,
            rusqlite::params![uuid::Uuid::new_v4(), "a", None::<i64>],
        )
        .unwrap();

        let duplicate = conn.execute(
            insert,
            rusqlite::params![uuid::Uuid::new_v4(), "A", None::<i64>],
        );
        let err = duplicate.unwrap_err();
        assert!(crate::error::is_unique_violation(&err), "{err}");
    }

    #[test]
    fn open_creates_database_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let result = Database::open(&db_path);
        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let db = Database::open(&db_path).unwrap();
            db.connection()
                .execute(
                    "INSERT INTO users (id, email, created_at) VALUES (?1, 'a@b.c', 0)",
                    [uuid::Uuid::new_v4()],
                )
                .unwrap();
        }

        let db2 = Database::open(&db_path).unwrap();
        let count: i32 = db2
            .connection()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn transaction_commits_on_ok() {
        let db = Database::in_memory().unwrap();

        let result: rusqlite::Result<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, 'x@y.z', 0)",
                [uuid::Uuid::new_v4()],
            )?;
            Ok(())
        });
        assert!(result.is_ok());

        let count: i32 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn transaction_rolls_back_every_step_on_err() {
        let db = Database::in_memory().unwrap();

        let result: crate::Result<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, 'first@y.z', 0)",
                [uuid::Uuid::new_v4()],
            )?;
            Err(crate::ServiceError::invalid("abort half-way"))
        });
        assert!(result.is_err());

        let count: i32 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(db.connection().is_autocommit());
    }

    #[test]
    fn now_is_truncated_to_seconds() {
        assert_eq!(now().nanosecond(), 0);
    }

    #[test]
    fn fold_case_handles_non_ascii() {
        assert_eq!(fold_case("Đường Bộ"), "đường bộ");
        assert_eq!(fold_case("ROAD"), "road");
    }

    #[test]
    fn fold_case_sql_function_is_registered() {
        let db = Database::in_memory().unwrap();
        let conn = db.connection();

        let folded: String = conn
            .query_row("SELECT fold_case('LUẬT Giao Thông')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "luật giao thông");

        let null: Option<String> = conn
            .query_row("SELECT fold_case(NULL)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(null, None);
    }

    #[test]
    fn contains_folded_matches_unicode_and_literal_wildcards() {
        let db = Database::in_memory().unwrap();
        // The bare `?` after `?1` binds as parameter 2.
        let sql = format!("SELECT {}", contains_folded("?1"));
        let matches = |haystack: &str, needle: &str| -> bool {
            db.connection()
                .query_row(&sql, rusqlite::params![haystack, fold_case(needle)], |row| {
                    row.get(0)
                })
                .unwrap()
        };

        assert!(matches("Luật Giao thông Đường bộ", "đường"));
        assert!(matches("Luật Giao thông Đường bộ", "ĐƯỜNG BỘ"));
        assert!(matches("100%", "0%"));
        assert!(!matches("1000", "0%"));
    }
}
