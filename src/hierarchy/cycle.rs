use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::TagId;
use crate::error::{Result, ServiceError};

/// Upper bound on the number of ancestors walked before giving up.
///
/// A legitimate tree never gets near this; reaching it means the stored data
/// is damaged.
pub const MAX_HIERARCHY_DEPTH: usize = 4096;

/// Source of parent pointers for live tags.
pub trait ParentLookup {
    /// Returns the parent of `id`.
    ///
    /// `None` means `id` is a root, or is not a live tag; either way the walk
    /// stops there.
    fn parent_of(&self, id: TagId) -> Result<Option<TagId>>;
}

impl ParentLookup for HashMap<TagId, Option<TagId>> {
    fn parent_of(&self, id: TagId) -> Result<Option<TagId>> {
        Ok(self.get(&id).copied().flatten())
    }
}

impl<T: ParentLookup + ?Sized> ParentLookup for &T {
    fn parent_of(&self, id: TagId) -> Result<Option<TagId>> {
        (**self).parent_of(id)
    }
}

/// Reports whether making `candidate_parent` the parent of `subject` would
/// create a cycle.
///
/// `subject` is `None` when the tag being placed does not exist yet; a new tag
/// has no descendants and can never close a loop. Otherwise the walk follows
/// parent pointers upward from `candidate_parent` and returns `true` as soon as
/// it reaches `subject` (including `candidate_parent == subject`).
///
/// The walk keeps a visited set. Revisiting a tag that is not `subject`, or
/// exceeding [`MAX_HIERARCHY_DEPTH`], means the stored tree already contains a
/// loop; that is reported as [`ServiceError::CorruptHierarchy`].
pub fn would_create_cycle(
    lookup: &impl ParentLookup,
    candidate_parent: TagId,
    subject: Option<TagId>,
) -> Result<bool> {
    let mut visited = HashSet::new();
    let mut current = Some(candidate_parent);

    while let Some(id) = current {
        if Some(id) == subject {
            return Ok(true);
        }
        if !visited.insert(id) || visited.len() > MAX_HIERARCHY_DEPTH {
            warn!(tag_id = %id, "parent chain loops without reaching the subject tag");
            return Err(ServiceError::CorruptHierarchy { tag_id: id });
        }
        current = lookup.parent_of(id)?;
    }

    Ok(false)
}
