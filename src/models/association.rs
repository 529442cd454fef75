use serde::{Deserialize, Serialize};

use super::{AssociationId, DocumentId, TagId};

/// One row of the many-to-many mapping between documents and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Association {
    pub id: AssociationId,
    pub document_id: DocumentId,
    pub tag_id: TagId,
}

impl Association {
    pub fn new(document_id: DocumentId, tag_id: TagId) -> Self {
        Self {
            id: AssociationId::generate(),
            document_id,
            tag_id,
        }
    }
}

/// An association joined with its tag's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationView {
    pub id: AssociationId,
    pub document_id: DocumentId,
    pub tag_id: TagId,
    pub tag_name: String,
}
