mod association;
mod category;
mod document;
mod ids;
mod page;
mod tag;
mod user;
mod views;

pub use association::{Association, AssociationView};
pub use category::Category;
pub use document::{DocumentFilter, DocumentUpdate, LawDocument, NewDocument};
pub use ids::{AssociationId, CategoryId, DocumentId, TagId, UserId};
pub use page::{Page, PageRequest};
pub use tag::{Tag, TagFilter};
pub use user::User;
pub use views::{DocumentView, TagRef, TagView};
