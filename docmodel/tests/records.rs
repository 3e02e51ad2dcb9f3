use std::sync::Arc;

use docmodel::{backend::StoreBackend, bson::doc, memory::InMemoryStore, prelude::*};

#[derive(Debug, Default, Clone, PartialEq, Record)]
#[record(collection = "people", sequential_id)]
pub struct Person {
    id: Option<Id>,
    pub name: String,
    pub age: i32,
    pub tags: Vec<String>,
    scratch: String,
}

#[derive(Debug, Default, Record)]
#[record(collection = "notes")]
pub struct Note {
    id: Option<Id>,
    pub text: String,
}

#[derive(Debug, Default, Record)]
pub struct Unconfigured {
    id: Option<Id>,
    pub name: String,
}

fn person(name: &str, age: i32) -> Person {
    Person {
        name: name.to_string(),
        age,
        ..Default::default()
    }
}

#[tokio::test]
async fn insert_assigns_id_and_grows_collection() {
    let store = DocumentStore::new(InMemoryStore::new());
    let before = Person::count(&store, None).await.unwrap();

    let mut foo = person("Foo Bar", 30);
    foo.update(&store, UpdateOptions::default()).await.unwrap();

    assert_eq!(foo.id(), Some(&Id::Int(1)));
    assert_eq!(Person::count(&store, None).await.unwrap(), before + 1);
}

#[tokio::test]
async fn construct_round_trips_public_fields_only() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut ada = Person {
        name: "Ada".into(),
        age: 36,
        tags: vec!["math".into(), "engines".into()],
        scratch: "in-memory only".into(),
        ..Default::default()
    };
    ada.update(&store, UpdateOptions::default()).await.unwrap();

    let loaded = Person::construct(&store, ada.id().cloned()).await.unwrap();

    assert_eq!(loaded.id(), ada.id());
    assert_eq!(loaded.name, "Ada");
    assert_eq!(loaded.age, 36);
    assert_eq!(loaded.tags, vec!["math".to_string(), "engines".to_string()]);
    assert_eq!(loaded.scratch, "");
}

#[tokio::test]
async fn construct_without_id_is_empty_and_unsaved() {
    let store = DocumentStore::new(InMemoryStore::new());

    let empty = Person::construct(&store, None).await.unwrap();

    assert_eq!(empty, Person::default());
    assert!(empty.id().is_none());
}

#[tokio::test]
async fn construct_of_missing_id_fails_with_not_found() {
    let store = DocumentStore::new(InMemoryStore::new());

    let result = Person::construct(&store, Some(Id::Int(999))).await;

    match result {
        Err(DocumentStoreError::DocumentNotFound(id, collection)) => {
            assert_eq!(id, "999");
            assert_eq!(collection, "people");
        }
        other => panic!("expected DocumentNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn update_of_persisted_record_replaces_the_document() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut grace = person("Grace", 40);
    grace.tags = vec!["navy".into()];
    grace.update(&store, UpdateOptions::default()).await.unwrap();
    let id = grace.id().cloned();

    grace.name = "Grace Hopper".into();
    grace.tags.clear();
    grace.update(&store, UpdateOptions::default()).await.unwrap();

    assert_eq!(grace.id().cloned(), id);
    assert_eq!(Person::count(&store, None).await.unwrap(), 1);

    let loaded = Person::construct(&store, id).await.unwrap();
    assert_eq!(loaded.name, "Grace Hopper");
    assert!(loaded.tags.is_empty());
}

#[tokio::test]
async fn failed_replace_is_absorbed_and_does_not_reinsert() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::new(backend.clone());

    let mut linus = person("Linus", 28);
    linus.update(&store, UpdateOptions::default()).await.unwrap();
    let id = linus.id().cloned().unwrap();

    backend.remove_document(&id.to_bson(), "people").await.unwrap();

    linus.name = "Linus T".into();
    linus.update(&store, UpdateOptions::default()).await.unwrap();

    assert_eq!(linus.id(), Some(&id));
    assert_eq!(Person::count(&store, None).await.unwrap(), 0);
}

#[tokio::test]
async fn force_insert_allocates_a_new_id() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut original = person("Original", 1);
    original.update(&store, UpdateOptions::default()).await.unwrap();

    let mut copy = original.clone();
    copy.update(&store, UpdateOptions::new().force_insert(true)).await.unwrap();

    assert_eq!(original.id(), Some(&Id::Int(1)));
    assert_eq!(copy.id(), Some(&Id::Int(2)));
    assert_eq!(Person::count(&store, None).await.unwrap(), 2);
}

#[tokio::test]
async fn preserve_id_inserts_under_the_current_id() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut imported = person("Imported", 50);
    imported.set_id(Some(Id::Int(77)));
    imported
        .update(&store, UpdateOptions::new().force_insert(true).preserve_id(true))
        .await
        .unwrap();

    assert_eq!(imported.id(), Some(&Id::Int(77)));
    let loaded = Person::construct(&store, Some(Id::Int(77))).await.unwrap();
    assert_eq!(loaded.name, "Imported");

    // The counter was never touched.
    let mut next = person("Next", 1);
    next.update(&store, UpdateOptions::default()).await.unwrap();
    assert_eq!(next.id(), Some(&Id::Int(1)));

    // Inserting the same id twice is an error, not a silent replace.
    let duplicate = imported
        .update(&store, UpdateOptions::new().force_insert(true).preserve_id(true))
        .await;
    assert!(matches!(duplicate, Err(DocumentStoreError::DocumentAlreadyExists(..))));
}

#[tokio::test]
async fn delete_reports_whether_a_document_was_removed() {
    let store = DocumentStore::new(InMemoryStore::new());

    let unsaved = person("Unsaved", 1);
    assert!(!unsaved.delete(&store).await.unwrap());

    let mut saved = person("Saved", 2);
    saved.update(&store, UpdateOptions::default()).await.unwrap();

    assert!(saved.delete(&store).await.unwrap());
    assert_eq!(Person::count(&store, None).await.unwrap(), 0);
    assert!(saved.id().is_some());
    assert!(!saved.delete(&store).await.unwrap());
}

#[tokio::test]
async fn delete_without_id_never_contacts_the_store() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::new(backend.clone());
    backend.disconnect();

    assert!(!person("Offline", 1).delete(&store).await.unwrap());
}

#[tokio::test]
async fn search_one_and_retrieve_document_load_by_filter() {
    let store = DocumentStore::new(InMemoryStore::new());
    for (name, age) in [("Alice", 31), ("Bob", 25)] {
        person(name, age).update(&store, UpdateOptions::default()).await.unwrap();
    }

    let bob = Person::search_one(&store, Filter::eq("name", "Bob")).await.unwrap();
    assert_eq!(bob.age, 25);
    assert_eq!(bob.id(), Some(&Id::Int(2)));

    let mut target = Person::default();
    assert!(target.retrieve_document(&store, Filter::gt("age", 30)).await.unwrap());
    assert_eq!(target.name, "Alice");

    let mut untouched = person("Nobody", 0);
    assert!(!untouched.retrieve_document(&store, Filter::eq("name", "Zed")).await.unwrap());
    assert_eq!(untouched.name, "Nobody");

    let missing = Person::search_one(&store, Filter::eq("name", "Zed")).await;
    assert!(matches!(missing, Err(DocumentStoreError::DocumentNotFound(_, collection)) if collection == "people"));
}

#[tokio::test]
async fn count_applies_filters() {
    let store = DocumentStore::new(InMemoryStore::new());
    for (name, age) in [("A", 10), ("B", 20), ("C", 30)] {
        person(name, age).update(&store, UpdateOptions::default()).await.unwrap();
    }

    assert_eq!(Person::count(&store, Some(Filter::gte("age", 20))).await.unwrap(), 2);
    assert_eq!(Person::count(&store, Some(Filter::is_in("name", ["A", "C"]))).await.unwrap(), 2);
    assert_eq!(Note::count(&store, None).await.unwrap(), 0);
}

#[tokio::test]
async fn bindings_are_cached_per_record_type() {
    let store = DocumentStore::new(InMemoryStore::new());

    let first = Person::collection(&store).await.unwrap();
    let second = Person::collection(&store).await.unwrap();
    let notes = Note::collection(&store).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name(), "people");
    assert_eq!(notes.name(), "notes");
}

#[tokio::test]
async fn unconfigured_record_type_fails_with_configuration_error() {
    let store = DocumentStore::new(InMemoryStore::new());

    let count = Unconfigured::count(&store, None).await;
    assert!(matches!(count, Err(DocumentStoreError::Configuration(_))));

    let mut record = Unconfigured { name: "x".into(), ..Default::default() };
    let update = record.update(&store, UpdateOptions::default()).await;
    assert!(matches!(update, Err(DocumentStoreError::Configuration(_))));
    assert!(record.id().is_none());
}

#[tokio::test]
async fn lost_connection_surfaces_as_connection_error() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::new(backend.clone());
    backend.disconnect();

    let bind = Person::count(&store, None).await;
    assert!(matches!(bind, Err(DocumentStoreError::Connection(_))));

    backend.reconnect();
    assert_eq!(Person::count(&store, None).await.unwrap(), 0);

    backend.disconnect();
    let mut offline = person("Offline", 1);
    let insert = offline.update(&store, UpdateOptions::default()).await;
    assert!(matches!(insert, Err(DocumentStoreError::Connection(_))));
    assert!(offline.id().is_none());
}

#[tokio::test]
async fn opaque_ids_are_assigned_by_the_store() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::new(backend.clone());

    let mut note = Note { text: "hello".into(), ..Default::default() };
    note.update(&store, UpdateOptions::default()).await.unwrap();

    let Some(Id::Object(oid)) = note.id().cloned() else {
        panic!("expected an object id, got {:?}", note.id());
    };

    let stored = backend
        .find_one_document(Some(Filter::eq("_id", oid)), None, "notes")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, doc! { "_id": oid, "text": "hello" });
}

#[tokio::test]
async fn shutdown_succeeds_with_and_without_live_handles() {
    let store = DocumentStore::new(InMemoryStore::new());
    let handle = Person::collection(&store).await.unwrap();

    store.shutdown().await.unwrap();
    assert_eq!(handle.name(), "people");

    let store = DocumentStore::new(InMemoryStore::new());
    Person::count(&store, None).await.unwrap();
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn bound_collection_exposes_index_creation() {
    let store = DocumentStore::new(InMemoryStore::new());

    let people = Person::collection(&store).await.unwrap();

    people.ensure_index("name", true).await.unwrap();
}

#[tokio::test]
async fn update_of_existing_record_absorbs_transport_failures() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::new(backend.clone());

    let mut margaret = person("Margaret", 33);
    margaret.update(&store, UpdateOptions::default()).await.unwrap();
    let id = margaret.id().cloned();

    backend.disconnect();
    margaret.name = "Margaret H".into();
    let result = margaret.update(&store, UpdateOptions::default()).await;

    assert!(result.is_ok());
    assert_eq!(margaret.id().cloned(), id);

    backend.reconnect();
    let stored = Person::construct(&store, id).await.unwrap();
    assert_eq!(stored.name, "Margaret");
    assert_eq!(Person::count(&store, None).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_reports_false_when_the_store_fails() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::new(backend.clone());

    let mut barbara = person("Barbara", 45);
    barbara.update(&store, UpdateOptions::default()).await.unwrap();

    backend.disconnect();
    assert!(!barbara.delete(&store).await.unwrap());

    backend.reconnect();
    assert_eq!(Person::count(&store, None).await.unwrap(), 1);
    assert!(barbara.delete(&store).await.unwrap());
}
