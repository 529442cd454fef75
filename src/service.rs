//! Business operations over the stores.
//!
//! Each service borrows a [`Database`](crate::Database) and runs every write
//! operation in one transaction, so multi-step changes (cascading deletes,
//! retagging) either fully persist or not at all. Services carry the name of
//! the actor recorded in audit columns; it defaults to [`DEFAULT_ACTOR`].

mod associations;
mod categories;
mod documents;
mod tags;

pub use associations::AssociationService;
pub use categories::CategoryService;
pub use documents::DocumentService;
pub use tags::{TagDeletion, TagService};

use crate::error::{Result, ServiceError};

/// Actor recorded when the caller does not identify one.
pub const DEFAULT_ACTOR: &str = "System";

/// Rejects blank required text fields.
fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid(format!("{field} cannot be empty")));
    }
    Ok(())
}
