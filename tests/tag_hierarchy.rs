//! End-to-end behaviour of the tag tree through the public API.

use lawdoc::hierarchy::would_create_cycle;
use lawdoc::store::TagStore;
use lawdoc::{
    Database, DocumentFilter, DocumentService, ErrorKind, NewDocument, TagFilter, TagId,
    TagService, TagView,
};

struct Tree {
    root: TagView,
    mid: TagView,
    leaf: TagView,
}

fn tree(service: &TagService<'_>) -> Tree {
    let root = service.create("Root", None).expect("create root");
    let mid = service.create("Mid", Some(root.id)).expect("create mid");
    let leaf = service.create("Leaf", Some(mid.id)).expect("create leaf");
    Tree { root, mid, leaf }
}

#[test]
fn reparenting_root_under_its_leaf_is_rejected() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let service = TagService::new(&db);
    let Tree { root, leaf, .. } = tree(&service);

    let err = service
        .update(root.id, "Root", Some(leaf.id))
        .expect_err("cycle must be rejected");

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let root = service.get_by_id(root.id).expect("root still live");
    assert_eq!(root.parent_tag_id, None);
}

#[test]
fn deleting_mid_detaches_leaf_and_updates_root_children() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let service = TagService::new(&db);
    let Tree { root, mid, leaf } = tree(&service);

    service.delete(mid.id).expect("delete mid");

    assert_eq!(
        service.get_by_id(mid.id).expect_err("mid is deleted").kind(),
        ErrorKind::NotFound
    );
    assert_eq!(service.get_by_id(leaf.id).unwrap().parent_tag_id, None);
    assert!(
        !service
            .get_by_id(root.id)
            .unwrap()
            .child_tag_names
            .contains(&"Mid".to_string())
    );
}

#[test]
fn deleting_a_tag_untags_documents_atomically() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let tags = TagService::new(&db);
    let Tree { mid, leaf, .. } = tree(&tags);
    let documents = DocumentService::new(&db);
    let doc = documents
        .create(NewDocument {
            title: "Road Traffic Law".to_string(),
            code: "23/2008/QH12".to_string(),
            tag_ids: vec![mid.id, leaf.id],
            ..Default::default()
        })
        .unwrap();

    let deletion = tags.delete(mid.id).unwrap();
    assert_eq!(deletion.associations_removed, 1);
    assert_eq!(deletion.children_detached, 1);

    let view = documents.get_by_id(doc.id).unwrap();
    assert!(!view.has_tag(mid.id));
    assert!(view.has_tag(leaf.id));

    let page = documents
        .query_paginated(1, 10, &DocumentFilter::default(), &[mid.id])
        .unwrap();
    assert!(page.items.is_empty());
}

#[test]
fn names_are_unique_only_among_live_tags() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let service = TagService::new(&db);
    let first = service.create("Speed", None).unwrap();

    assert_eq!(
        service.create("Speed", None).unwrap_err().kind(),
        ErrorKind::Conflict
    );

    service.delete(first.id).unwrap();
    let second = service.create("Speed", None).expect("deleted name is reusable");
    assert_ne!(second.id, first.id);
}

#[test]
fn cycle_guard_matches_ancestor_chain() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let service = TagService::new(&db);
    let Tree { root, mid, leaf } = tree(&service);
    let store = TagStore::new(db.connection());

    // subject is an ancestor of (or equal to) the candidate parent
    for (parent, subject) in [(leaf.id, root.id), (leaf.id, mid.id), (mid.id, mid.id)] {
        assert!(would_create_cycle(&store, parent, Some(subject)).unwrap());
    }
    // subject is not in the candidate parent's chain
    for (parent, subject) in [(root.id, leaf.id), (mid.id, leaf.id), (root.id, mid.id)] {
        assert!(!would_create_cycle(&store, parent, Some(subject)).unwrap());
    }
    assert!(!would_create_cycle(&store, leaf.id, None).unwrap());
}

#[test]
fn zero_page_bounds_are_invalid() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let service = TagService::new(&db);

    for (index, size) in [(0, 1), (1, 0), (0, 0)] {
        let err = service
            .list_paginated(index, size, &TagFilter::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn listing_paginates_beyond_last_page_to_empty() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let service = TagService::new(&db);
    tree(&service);

    let page = service
        .list_paginated(5, 2, &TagFilter::default())
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 3);
    assert_eq!(page.total_pages, 2);
}

#[test]
fn unknown_parent_on_update_is_not_found() {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let service = TagService::new(&db);
    let Tree { leaf, .. } = tree(&service);

    let err = service
        .update(leaf.id, "Leaf", Some(TagId::generate()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
