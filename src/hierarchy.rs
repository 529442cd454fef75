//! Tag tree structure checks.
//!
//! The tag tree is stored as a nullable parent pointer per tag. Before a parent
//! is assigned, the guard in this module walks the ancestor chain of the
//! candidate parent to make sure the assignment keeps the live tags a forest.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//!
//! use lawdoc::TagId;
//! use lawdoc::hierarchy::would_create_cycle;
//!
//! # fn main() -> lawdoc::Result<()> {
//! let root = TagId::generate();
//! let mid = TagId::generate();
//! let leaf = TagId::generate();
//!
//! let parents: HashMap<TagId, Option<TagId>> =
//!     HashMap::from([(root, None), (mid, Some(root)), (leaf, Some(mid))]);
//!
//! // Making `leaf` the parent of `root` would close the loop root -> mid -> leaf -> root.
//! assert!(would_create_cycle(&parents, leaf, Some(root))?);
//!
//! // A brand-new tag can hang anywhere.
//! assert!(!would_create_cycle(&parents, leaf, None)?);
//! # Ok(())
//! # }
//! ```

mod cycle;

pub use cycle::{MAX_HIERARCHY_DEPTH, ParentLookup, would_create_cycle};
