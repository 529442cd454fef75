pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod mapping;
pub mod models;
pub mod service;
pub mod store;
pub mod telemetry;

pub use db::Database;
pub use error::{ErrorKind, Result, ServiceError};
pub use models::{
    Association, AssociationId, AssociationView, Category, CategoryId, DocumentFilter,
    DocumentId, DocumentUpdate, DocumentView, LawDocument, NewDocument, Page, PageRequest, Tag,
    TagFilter, TagId, TagRef, TagView, User, UserId,
};
pub use service::{
    AssociationService, CategoryService, DEFAULT_ACTOR, DocumentService, TagDeletion, TagService,
};
