use tracing::info;

use crate::Database;
use crate::error::{Result, ServiceError};
use crate::models::{Association, AssociationId, AssociationView, DocumentId, TagId};
use crate::store::{AssociationStore, DocumentStore, TagStore};

/// Links individual tags to documents.
///
/// Unlike [`AssociationStore`], which is pure persistence, this service
/// requires the document and tag to be live before linking them.
pub struct AssociationService<'db> {
    db: &'db Database,
}

impl<'db> AssociationService<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Tags a live document with a live tag. Linking an already linked pair
    /// returns the existing association.
    pub fn add(&self, document_id: DocumentId, tag_id: TagId) -> Result<Association> {
        let association = self.db.transaction(|tx| {
            DocumentStore::new(tx).get_by_id(document_id)?;
            TagStore::new(tx).get_by_id(tag_id)?;
            AssociationStore::new(tx).add(document_id, tag_id)
        })?;

        info!(
            association_id = %association.id,
            document_id = %document_id,
            tag_id = %tag_id,
            "tagged document"
        );
        Ok(association)
    }

    /// Associations of a live document, with tag names, ordered by tag name.
    pub fn list_for_document(&self, document_id: DocumentId) -> Result<Vec<AssociationView>> {
        let conn = self.db.connection();
        DocumentStore::new(conn).get_by_id(document_id)?;
        AssociationStore::new(conn).list_by_document(document_id)
    }

    pub fn delete(&self, id: AssociationId) -> Result<()> {
        if !AssociationStore::new(self.db.connection()).delete_by_id(id)? {
            return Err(ServiceError::not_found("document tag", id));
        }
        info!(association_id = %id, "untagged document");
        Ok(())
    }

    /// Removes the link between a document and a tag.
    pub fn remove(&self, document_id: DocumentId, tag_id: TagId) -> Result<()> {
        let association = AssociationStore::new(self.db.connection())
            .find(document_id, tag_id)?
            .ok_or_else(|| {
                ServiceError::not_found("document tag", format!("{document_id}/{tag_id}"))
            })?;
        self.delete(association.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::NewDocument;
    use crate::service::{DocumentService, TagService};

    fn fixture(db: &Database) -> (DocumentId, TagId, TagId) {
        let tags = TagService::new(db);
        let speed = tags.create("speed", None).unwrap();
        let fines = tags.create("fines", None).unwrap();
        let doc = DocumentService::new(db)
            .create(NewDocument {
                title: "Decree".to_string(),
                code: "100/2019/ND-CP".to_string(),
                ..Default::default()
            })
            .unwrap();
        (doc.id, speed.id, fines.id)
    }

    #[test]
    fn add_is_idempotent_per_pair() {
        let db = Database::in_memory().unwrap();
        let (doc, speed, _) = fixture(&db);
        let service = AssociationService::new(&db);

        let first = service.add(doc, speed).unwrap();
        let second = service.add(doc, speed).unwrap();

        assert_eq!(first, second);
        assert_eq!(service.list_for_document(doc).unwrap().len(), 1);
    }

    #[test]
    fn list_joins_tag_names_in_order() {
        let db = Database::in_memory().unwrap();
        let (doc, speed, fines) = fixture(&db);
        let service = AssociationService::new(&db);
        service.add(doc, speed).unwrap();
        service.add(doc, fines).unwrap();

        let names: Vec<_> = service
            .list_for_document(doc)
            .unwrap()
            .into_iter()
            .map(|a| a.tag_name)
            .collect();
        assert_eq!(names, vec!["fines", "speed"]);
    }

    #[test]
    fn add_requires_live_document_and_tag() {
        let db = Database::in_memory().unwrap();
        let (doc, speed, _) = fixture(&db);
        let service = AssociationService::new(&db);

        let err = service.add(DocumentId::generate(), speed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        TagService::new(&db).delete(speed).unwrap();
        let err = service.add(doc, speed).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "tag", .. }));
    }

    #[test]
    fn delete_and_remove() {
        let db = Database::in_memory().unwrap();
        let (doc, speed, fines) = fixture(&db);
        let service = AssociationService::new(&db);
        let association = service.add(doc, speed).unwrap();
        service.add(doc, fines).unwrap();

        service.delete(association.id).unwrap();
        assert_eq!(
            service.delete(association.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        service.remove(doc, fines).unwrap();
        assert!(service.list_for_document(doc).unwrap().is_empty());
        assert_eq!(service.remove(doc, fines).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
