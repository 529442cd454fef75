use rusqlite::{Connection, OptionalExtension, params};

use super::unique_or_storage;
use crate::db::{now, timestamp_at};
use crate::error::Result;
use crate::models::{User, UserId};

/// Minimal user records used to attribute document verification.
pub struct UserStore<'c> {
    conn: &'c Connection,
}

impl<'c> UserStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts a user. A duplicate email is a conflict.
    pub fn create(&self, email: &str, full_name: Option<&str>) -> Result<User> {
        let user = User {
            id: UserId::generate(),
            email: email.to_string(),
            full_name: full_name.map(str::to_string),
            created_at: now(),
        };
        self.conn
            .execute(
                "INSERT INTO users (id, email, full_name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id,
                    user.email,
                    user.full_name,
                    user.created_at.unix_timestamp()
                ],
            )
            .map_err(|e| unique_or_storage(e, "user", "email", email))?;
        Ok(user)
    }

    pub fn get(&self, id: UserId) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, full_name, created_at FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        full_name: row.get(2)?,
                        created_at: timestamp_at(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, ServiceError};

    #[test]
    fn create_and_get_user() {
        let db = Database::in_memory().unwrap();
        let store = UserStore::new(db.connection());

        let user = store.create("expert@example.com", Some("Law Expert")).unwrap();
        assert_eq!(store.get(user.id).unwrap(), Some(user));
        assert_eq!(store.get(UserId::generate()).unwrap(), None);
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let db = Database::in_memory().unwrap();
        let store = UserStore::new(db.connection());
        store.create("expert@example.com", None).unwrap();

        let err = store.create("expert@example.com", None).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { field: "email", .. }));
    }
}
