//! Persistence for tags, documents, associations, categories and users.
//!
//! Each store borrows a [`rusqlite::Connection`]. Passing a transaction (which
//! dereferences to a connection) makes the store's writes part of it. Stores do
//! no business validation; that belongs to the services.

mod associations;
mod categories;
mod documents;
mod tags;
mod users;

pub use associations::AssociationStore;
pub use categories::CategoryStore;
pub use documents::{DocumentRow, DocumentStore};
pub use tags::TagStore;
pub use users::UserStore;

use rusqlite::ToSql;

use crate::error::{ServiceError, is_unique_violation};

/// Positional arguments for a dynamically assembled query.
pub(crate) type QueryArgs = Vec<Box<dyn ToSql>>;

/// Converts a failed insert/update into a conflict when it violated a unique
/// index, keeping any other failure as a storage error.
pub(crate) fn unique_or_storage(
    err: rusqlite::Error,
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::conflict(entity, field, value)
    } else {
        ServiceError::Storage(err)
    }
}

/// Joins `conditions` into a `WHERE` clause, or an empty string.
pub(crate) fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// Treats an empty search string the same as an absent one.
pub(crate) fn search_term(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
