use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::UserId;

/// A user account, reduced to what document verification needs.
///
/// Authentication and roles live outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
