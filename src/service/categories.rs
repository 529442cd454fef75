use tracing::{debug, info};

use super::{DEFAULT_ACTOR, require_text};
use crate::Database;
use crate::db::now;
use crate::error::{Result, ServiceError};
use crate::models::{Category, CategoryId, Page, PageRequest};
use crate::store::CategoryStore;

/// Document categories such as "Law", "Decree" or "Circular".
pub struct CategoryService<'db> {
    db: &'db Database,
    actor: String,
}

impl<'db> CategoryService<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    pub fn acting_as(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Lists live categories, newest first.
    pub fn list_paginated(
        &self,
        page_index: u32,
        page_size: u32,
        id: Option<CategoryId>,
        name: Option<String>,
    ) -> Result<Page<Category>> {
        let request = PageRequest::new(page_index, page_size)?;
        let (categories, total) =
            CategoryStore::new(self.db.connection()).search(id, &name, request)?;
        debug!(total, page = page_index, "listed categories");
        Ok(Page::new(categories, total, request))
    }

    pub fn get_by_id(&self, id: CategoryId) -> Result<Category> {
        CategoryStore::new(self.db.connection()).get_by_id(id)
    }

    /// Creates a category. Names are unique among live categories (case-sensitive).
    pub fn create(&self, name: &str) -> Result<Category> {
        require_text("category name", name)?;

        let category = self.db.transaction(|tx| {
            let store = CategoryStore::new(tx);
            if store.name_exists(name, None)? {
                return Err(ServiceError::conflict("document category", "name", name));
            }
            let at = now();
            let category = Category {
                id: CategoryId::generate(),
                name: name.to_string(),
                created_at: at,
                created_by: Some(self.actor.clone()),
                updated_at: at,
                updated_by: Some(self.actor.clone()),
                deleted_at: None,
                deleted_by: None,
            };
            store.create(&category)?;
            Ok(category)
        })?;

        info!(category_id = %category.id, name = %category.name, "created category");
        Ok(category)
    }

    pub fn update(&self, id: CategoryId, name: &str) -> Result<Category> {
        require_text("category name", name)?;

        let category = self.db.transaction(|tx| {
            let store = CategoryStore::new(tx);
            let mut category = store.get_by_id(id)?;
            if store.name_exists(name, Some(id))? {
                return Err(ServiceError::conflict("document category", "name", name));
            }
            category.name = name.to_string();
            category.updated_at = now();
            category.updated_by = Some(self.actor.clone());
            store.update(&category)?;
            Ok(category)
        })?;

        info!(category_id = %id, name = %category.name, "updated category");
        Ok(category)
    }

    pub fn soft_delete(&self, id: CategoryId) -> Result<()> {
        let store = CategoryStore::new(self.db.connection());
        if !store.soft_delete(id, &self.actor, now())? {
            return Err(ServiceError::not_found("document category", id));
        }
        info!(category_id = %id, "deleted category");
        Ok(())
    }
}
