mod common;

use common::{FailOn, FailingStore, memory_store, users};
use docrest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Guardian {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
}

impl Document for Guardian {
    fn collection_name() -> &'static str {
        "guardians"
    }
}

#[tokio::test]
async fn post_on_empty_collection_stamps_identity_and_timestamps() {
    let store = memory_store();
    let schema = Schema::builder("guardians").build();
    let guardians = store.model(&schema);

    let jane = guardians.post(doc! { "name": "Jane" }).await.unwrap();

    assert!(!jane.is_new());
    let id = jane.id().expect("generated id");
    assert_eq!(jane.get("name"), Some(&Bson::String("Jane".to_string())));

    let created = jane.get_datetime("createdAt").expect("createdAt");
    let updated = jane.get_datetime("updatedAt").expect("updatedAt");
    assert_eq!(created, updated);

    let stored = guardians.get_by_id(id).await.unwrap();
    assert_eq!(stored, jane);
}

#[tokio::test]
async fn post_keeps_caller_supplied_id() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    let id = Uuid::new();

    let record = model.post(doc! { "_id": id, "name": "Jane" }).await.unwrap();
    assert_eq!(record.id(), Some(id));

    let error = model.post(doc! { "_id": id, "name": "Jane again" }).await.unwrap_err();
    assert_eq!(error.status(), 400);
    assert!(matches!(
        error.kind(),
        ActionErrorKind::Store(DocumentStoreError::DocumentAlreadyExists(..))
    ));
}

#[tokio::test]
async fn post_rejects_malformed_id() {
    let store = memory_store();
    let schema = users();

    let error = store
        .model(&schema)
        .post(doc! { "_id": "not-a-uuid", "name": "Jane" })
        .await
        .unwrap_err();

    assert_eq!(error.status(), 400);
    assert!(matches!(error.kind(), ActionErrorKind::InvalidArgument(_)));
}

#[tokio::test]
async fn instance_post_saves_typed_documents() {
    let store = memory_store();
    let schema = Schema::for_document::<Guardian>().build();
    let guardians = store.model(&schema);
    let guardian = Guardian { id: Uuid::new(), name: "Jane".to_string() };

    let record = Record::from_typed(&guardian).unwrap();
    let saved = guardians.instance(record).post().await.unwrap();

    assert_eq!(saved.to_typed::<Guardian>().unwrap(), guardian);
    assert_eq!(guardians.name(), "guardians");
}

#[tokio::test]
async fn unique_fields_reject_duplicates_once_indexed() {
    let store = memory_store();
    let schema = Schema::builder("users")
        .with_options(SchemaOptions::builder().with_unique_fields(["email"]).build())
        .build();
    let model = store.model(&schema);
    model.ensure_indexes().await.unwrap();

    model.post(doc! { "email": "jane@example.com" }).await.unwrap();
    let error = model
        .post(doc! { "email": "jane@example.com" })
        .await
        .unwrap_err();

    assert_eq!(error.status(), 400);
    assert!(matches!(
        error.kind(),
        ActionErrorKind::Store(DocumentStoreError::DuplicateKey(field, _)) if field == "email"
    ));
}

#[tokio::test]
async fn backend_status_is_reported_unchanged() {
    common::init_logging();
    let store = DocumentStore::new(FailingStore::new(FailOn::Insert, 503));
    let schema = users();

    let error = store
        .model(&schema)
        .post(doc! { "name": "Jane" })
        .await
        .unwrap_err();

    assert_eq!(error.status(), 503);
    assert_eq!(error.to_string(), "Insert refused");
}
