mod common;

use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use common::{FailOn, FailingStore, memory_store, seed_users, users};
use docrest::prelude::*;

#[tokio::test]
async fn first_page_of_many_records() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 32).await;

    let page = model
        .get(QueryOptions::builder().page(1).limit(20).build())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 20);
    assert_eq!(page.size, 20);
    assert_eq!(page.total, 32);
    assert_eq!(page.pages, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.skip, 0);
    assert!(!page.has_more);
}

#[tokio::test]
async fn default_limit_splits_into_pages() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 32).await;

    let page = model.get(QueryOptions::default()).await.unwrap();

    assert_eq!(page.limit, 10);
    assert_eq!(page.pages, 4);
    assert_eq!(page.data.len(), 10);
}

#[tokio::test]
async fn page_overrides_explicit_skip() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 32).await;

    let page = model
        .get(
            QueryOptions::builder()
                .sort(Sort::asc("rank"))
                .limit(10)
                .skip(5)
                .page(3)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(page.skip, 20);
    assert_eq!(page.page, 3);
    assert_eq!(page.data[0].get("name"), Some(&Bson::String("user-20".to_string())));
}

#[tokio::test]
async fn page_past_the_end_is_empty_and_flagged() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 5).await;

    let page = model
        .get(QueryOptions::builder().page(4).limit(2).build())
        .await
        .unwrap();

    assert!(page.data.is_empty());
    assert_eq!(page.pages, 3);
    assert!(page.has_more);
}

#[tokio::test]
async fn filter_search_sort_and_select_combine() {
    let store = memory_store();
    let schema = Schema::builder("users")
        .with_options(SchemaOptions::builder().with_search_fields(["name"]).build())
        .build();
    let model = store.model(&schema);

    for (name, team) in [("Jane", "red"), ("Janet", "red"), ("Jan", "blue"), ("Bob", "red")] {
        model.post(doc! { "name": name, "team": team }).await.unwrap();
    }

    let page = model
        .get(
            QueryOptions::builder()
                .filter(doc! { "team": "red", "q": "JAN" })
                .sort(Sort::desc("name"))
                .select(Projection::include(["name"]))
                .build(),
        )
        .await
        .unwrap();

    let names: Vec<_> = page
        .data
        .iter()
        .filter_map(|record| record.get("name").and_then(Bson::as_str))
        .collect();
    assert_eq!(names, vec!["Janet", "Jane"]);
    assert_eq!(page.total, 2);
    assert!(page.data.iter().all(|record| record.get("team").is_none()));
    assert!(page.data.iter().all(|record| record.id().is_some()));
}

#[tokio::test]
async fn filter_aliases_use_first_non_empty() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 3).await;

    let options = QueryOptions {
        filter: Some(doc! {}),
        criteria: Some(doc! { "rank": 1 }),
        query: Some(doc! { "rank": 2 }),
        ..QueryOptions::default()
    };
    let page = model.get(options).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].get("rank"), Some(&Bson::Int32(1)));
}

#[tokio::test]
async fn if_modified_since_in_the_future_matches_nothing() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 3).await;

    let page = model
        .get(
            QueryOptions::builder()
                .if_modified_since(Utc::now() + Duration::days(1))
                .build(),
        )
        .await
        .unwrap();

    assert!(page.data.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(page.last_modified, None);
}

#[tokio::test]
async fn last_modified_tracks_latest_update() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    let seeded = seed_users(&model, 3).await;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let id = seeded[0].id().unwrap();
    let patched = model
        .patch(UpdateRequest::by_id(id, doc! { "name": "renamed" }))
        .await
        .unwrap();

    let page = model.get(QueryOptions::default()).await.unwrap();

    assert_eq!(page.last_modified, patched.get_datetime("updatedAt"));
}

#[tokio::test]
async fn options_parse_from_documents() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 12).await;

    let options = QueryOptions::try_from(doc! {
        "criteria": { "rank": { "$gte": 2 } },
        "sort": "-rank",
        "select": "name",
        "paginate": { "limit": 4, "page": 2 },
    })
    .unwrap();
    let page = model.get(options).await.unwrap();

    assert_eq!(page.total, 10);
    assert_eq!(page.limit, 4);
    assert_eq!(page.skip, 4);
    assert_eq!(page.data[0].get("name"), Some(&Bson::String("user-07".to_string())));
    assert!(page.data[0].get("rank").is_none());
}

#[tokio::test]
async fn string_ids_in_filters_match_stored_ids() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    let jane = model.post(doc! { "name": "Jane" }).await.unwrap();
    let john = model.post(doc! { "name": "John" }).await.unwrap();
    let (jane_id, john_id) = (jane.id().unwrap(), john.id().unwrap());

    let options = QueryOptions::try_from(doc! { "filter": { "_id": jane_id.to_string() } }).unwrap();
    let page = model.get(options).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id(), Some(jane_id));

    let options = QueryOptions::try_from(doc! {
        "filter": { "_id": { "$in": [jane_id.to_string(), john_id.to_string()] } },
    })
    .unwrap();
    assert_eq!(model.get(options).await.unwrap().total, 2);

    let options = QueryOptions::try_from(doc! {
        "filter": { "_id": { "$ne": john_id.to_string() } },
    })
    .unwrap();
    let page = model.get(options).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id(), Some(jane_id));
}

#[tokio::test]
async fn populate_expands_references() {
    let store = memory_store();
    let guardians_schema = Schema::builder("guardians").build();
    let children_schema = users();
    let guardians = store.model(&guardians_schema);
    let children = store.model(&children_schema);

    let jane = guardians.post(doc! { "name": "Jane", "phone": "555" }).await.unwrap();
    let jane_id = jane.id().unwrap();
    children
        .post(doc! { "name": "Tom", "guardian": jane_id, "siblings": [jane_id, Uuid::new()] })
        .await
        .unwrap();

    let page = children
        .get(
            QueryOptions::builder()
                .populate(Populate::new("guardian", "guardians").select(Projection::include(["name"])))
                .populate(Populate::new("siblings", "guardians"))
                .build(),
        )
        .await
        .unwrap();

    let tom = &page.data[0];
    assert_eq!(
        tom.get("guardian"),
        Some(&Bson::Document(doc! { "_id": jane_id, "name": "Jane" }))
    );
    match tom.get("siblings") {
        Some(Bson::Array(siblings)) => assert_eq!(siblings.len(), 1),
        other => panic!("unexpected siblings {other:?}"),
    }
}

#[tokio::test]
async fn list_hooks_can_substitute_options_and_envelope() {
    let store = memory_store();
    let schema = Schema::builder("users")
        .before_get(|mut options: QueryOptions| async move {
            options.limit = Some(2);
            Ok(Some(options))
        })
        .after_get(|(options, mut envelope): (QueryOptions, ResultEnvelope)| async move {
            assert_eq!(options.limit, Some(2));
            envelope.data.truncate(1);
            Ok(Some(envelope))
        })
        .build();
    let model = store.model(&schema);
    seed_users(&model, 5).await;

    let page = model.get(QueryOptions::default()).await.unwrap();
    assert_eq!(page.limit, 2);
    assert_eq!(page.data.len(), 1);

    let fresh = model.fresh(QueryOptions::default()).await.unwrap();
    assert_eq!(fresh.limit, 10);
    assert_eq!(fresh.data.len(), 5);
}

#[tokio::test]
async fn first_failing_read_fails_the_list() {
    common::init_logging();
    let backend = FailingStore::new(FailOn::Count, 0);
    let calls = backend.calls.clone();
    let store = DocumentStore::new(backend);
    let schema = users();

    let error = store.model(&schema).get(QueryOptions::default()).await.unwrap_err();

    assert_eq!(error.status(), 400);
    assert!(matches!(
        error.kind(),
        ActionErrorKind::Store(DocumentStoreError::Backend(_))
    ));
    assert!(calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn page_query_failure_keeps_backend_status() {
    common::init_logging();
    let store = DocumentStore::new(FailingStore::new(FailOn::Query, 502));
    let schema = users();

    let error = store.model(&schema).fresh(QueryOptions::default()).await.unwrap_err();

    assert_eq!(error.status(), 502);
}

#[tokio::test]
async fn envelope_serializes_camel_case() {
    let store = memory_store();
    let schema = users();
    let model = store.model(&schema);
    seed_users(&model, 1).await;

    let page = model.get(QueryOptions::default()).await.unwrap();
    let json = serde_json::to_value(&page).unwrap();

    assert_eq!(json["total"], 1);
    assert_eq!(json["hasMore"], false);
    assert!(json["lastModified"].is_string());
    assert_eq!(json["data"][0]["name"], "user-00");
}
