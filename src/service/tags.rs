use serde::Serialize;
use tracing::{debug, info};

use super::{DEFAULT_ACTOR, require_text};
use crate::Database;
use crate::db::now;
use crate::error::{Result, ServiceError};
use crate::hierarchy::would_create_cycle;
use crate::mapping::tag_view;
use crate::models::{Page, PageRequest, Tag, TagFilter, TagId, TagView};
use crate::store::{AssociationStore, TagStore};

/// What a tag deletion cascaded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TagDeletion {
    pub tag_id: TagId,
    pub associations_removed: usize,
    pub children_detached: usize,
}

/// Maintains the tag tree.
///
/// Enforces name uniqueness among live tags, keeps the parent graph acyclic,
/// and cascades soft-deletes to associations and child tags.
///
/// # Examples
///
/// ```
/// use lawdoc::{Database, TagService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let tags = TagService::new(&db);
///
/// let traffic = tags.create("traffic", None)?;
/// let signals = tags.create("signals", Some(traffic.id))?;
/// assert_eq!(signals.parent_tag_name.as_deref(), Some("traffic"));
///
/// let traffic = tags.get_by_id(traffic.id)?;
/// assert_eq!(traffic.child_tag_names, vec!["signals"]);
/// # Ok(())
/// # }
/// ```
pub struct TagService<'db> {
    db: &'db Database,
    actor: String,
}

impl<'db> TagService<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// Records `actor` in the audit columns of subsequent writes.
    pub fn acting_as(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Lists live tags ordered by name, one page at a time.
    pub fn list_paginated(
        &self,
        page_index: u32,
        page_size: u32,
        filter: &TagFilter,
    ) -> Result<Page<TagView>> {
        let request = PageRequest::new(page_index, page_size)?;
        let store = TagStore::new(self.db.connection());

        let (tags, total) = store.search(filter, request)?;
        debug!(?filter, total, page = page_index, "listed tags");

        let mut views = Vec::with_capacity(tags.len());
        for tag in tags {
            views.push(view_of(&store, tag)?);
        }
        Ok(Page::new(views, total, request))
    }

    /// Returns a live tag with its parent and children resolved.
    pub fn get_by_id(&self, id: TagId) -> Result<TagView> {
        let store = TagStore::new(self.db.connection());
        let tag = store.get_by_id(id)?;
        view_of(&store, tag)
    }

    /// Creates a tag, optionally under `parent_id`.
    ///
    /// Fails with `Conflict` if a live tag already has `name`, `NotFound` if the
    /// parent is absent or deleted, and `InvalidArgument` if the placement
    /// would be cyclic.
    pub fn create(&self, name: &str, parent_id: Option<TagId>) -> Result<TagView> {
        require_text("tag name", name)?;

        let view = self.db.transaction(|tx| {
            let store = TagStore::new(tx);

            if store.name_exists(name, None)? {
                return Err(ServiceError::conflict("tag", "name", name));
            }
            if let Some(parent_id) = parent_id {
                store.get_by_id(parent_id)?;
                if would_create_cycle(&store, parent_id, None)? {
                    return Err(cyclic(parent_id));
                }
            }

            let tag = Tag::new(name, parent_id, &self.actor, now());
            store.create(&tag)?;
            view_of(&store, tag)
        })?;

        info!(tag_id = %view.id, name = %view.name, parent = ?view.parent_tag_id, "created tag");
        Ok(view)
    }

    /// Renames and/or reparents a tag.
    ///
    /// `parent_id` is the desired parent; `None` makes the tag a root. Parent
    /// validation only runs when the parent actually changes.
    pub fn update(&self, id: TagId, name: &str, parent_id: Option<TagId>) -> Result<TagView> {
        require_text("tag name", name)?;

        let view = self.db.transaction(|tx| {
            let store = TagStore::new(tx);
            let mut tag = store.get_by_id(id)?;

            if store.name_exists(name, Some(id))? {
                return Err(ServiceError::conflict("tag", "name", name));
            }

            let current_parent = tag.parent_tag_id;
            if let Some(new_parent) = parent_id.filter(|p| Some(*p) != current_parent) {
                if new_parent == id {
                    return Err(ServiceError::invalid(format!(
                        "tag {id} cannot be its own parent"
                    )));
                }
                store.get_by_id(new_parent)?;
                if would_create_cycle(&store, new_parent, Some(id))? {
                    return Err(cyclic(new_parent));
                }
            }

            tag.name = name.to_string();
            tag.parent_tag_id = parent_id;
            tag.updated_at = now();
            tag.updated_by = Some(self.actor.clone());
            store.update(&tag)?;
            view_of(&store, tag)
        })?;

        info!(tag_id = %id, name = %view.name, parent = ?view.parent_tag_id, "updated tag");
        Ok(view)
    }

    /// Soft-deletes a tag.
    ///
    /// In the same transaction, removes every document association with the tag
    /// and detaches its live children (they become roots, they are not deleted).
    pub fn delete(&self, id: TagId) -> Result<TagDeletion> {
        let deletion = self.db.transaction(|tx| {
            let tags = TagStore::new(tx);
            let associations = AssociationStore::new(tx);
            let at = now();

            if !tags.soft_delete(id, &self.actor, at)? {
                return Err(ServiceError::not_found("tag", id));
            }
            let associations_removed = associations.delete_all_for_tag(id)?;
            let children_detached = tags.detach_children(id, &self.actor, at)?;

            Ok::<_, ServiceError>(TagDeletion {
                tag_id: id,
                associations_removed,
                children_detached,
            })
        })?;

        info!(
            tag_id = %id,
            associations_removed = deletion.associations_removed,
            children_detached = deletion.children_detached,
            "deleted tag"
        );
        Ok(deletion)
    }
}

fn cyclic(parent_id: TagId) -> ServiceError {
    ServiceError::invalid(format!(
        "assigning parent {parent_id} would create a cyclic relationship"
    ))
}

fn view_of(store: &TagStore<'_>, tag: Tag) -> Result<TagView> {
    let parent_name = match tag.parent_tag_id {
        Some(parent_id) => store.find_live(parent_id)?.map(|p| p.name),
        None => None,
    };
    let child_names = store
        .list_children(tag.id)?
        .into_iter()
        .map(|child| child.name)
        .collect();
    Ok(tag_view(tag, parent_name, child_names))
}
