use kv_models::{
    attrs, Collection, Document, FieldValue, IndexRegistry, KvClient, ListOptions, MemoryBackend,
    MemoryKv, ModelError, Query,
};
use std::sync::Arc;

fn people() -> (Collection, Arc<MemoryKv>) {
    let mut registry = IndexRegistry::new();
    registry.declare_unique("email").unwrap();
    registry.declare_set("first").unwrap();
    registry.declare_sorted("age").unwrap();
    let kv = Arc::new(MemoryKv::new());
    let collection = Collection::new(
        "people",
        registry,
        kv.clone(),
        Arc::new(MemoryBackend::new()),
    );
    (collection, kv)
}

async fn seed(people: &Collection) -> (Document, Document) {
    let a = people
        .create(attrs! { "email" => "a@x", "first" => "Jo", "age" => 20i64 })
        .await
        .unwrap();
    let b = people
        .create(attrs! { "email" => "b@x", "first" => "Jo", "age" => 30i64 })
        .await
        .unwrap();
    (a, b)
}

#[tokio::test]
async fn unique_index_round_trip() {
    let (people, _) = people();
    let (a, _) = seed(&people).await;

    let query: Query = attrs! { "email" => "a@x" };
    let found = people.load_by(&query).await.unwrap().unwrap();
    assert_eq!(found, a);

    // A second create with the same unique value fails and commits nothing.
    let err = people
        .create(attrs! { "email" => "a@x", "first" => "Imp", "age" => 99i64 })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateKey(field) if field == "email"));
    assert_eq!(
        people
            .list_ids(None, &ListOptions::default())
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn set_index_equality_query() {
    let (people, _) = people();
    let (a, b) = seed(&people).await;

    let query: Query = attrs! { "first" => "Jo" };
    let mut ids = people
        .list_ids(Some(&query), &ListOptions::default())
        .await
        .unwrap();
    ids.sort();
    let mut expected = vec![a.id().to_owned(), b.id().to_owned()];
    expected.sort();
    assert_eq!(ids, expected);

    people.destroy(a.id()).await.unwrap();
    let ids = people
        .list_ids(Some(&query), &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(ids, vec![b.id().to_owned()]);
}

#[tokio::test]
async fn set_index_migrates_on_field_change() {
    let (people, _) = people();
    let (mut a, _) = seed(&people).await;

    a.set("first", "Sam");
    let a = people.save(a).await.unwrap();

    let jo: Query = attrs! { "first" => "Jo" };
    let sam: Query = attrs! { "first" => "Sam" };
    let jo_ids = people
        .list_ids(Some(&jo), &ListOptions::default())
        .await
        .unwrap();
    assert!(!jo_ids.contains(&a.id().to_owned()));
    let sam_ids = people
        .list_ids(Some(&sam), &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(sam_ids, vec![a.id().to_owned()]);
}

#[tokio::test]
async fn sorted_index_orders_and_rescoring_moves() {
    let (people, _) = people();
    let (a, b) = seed(&people).await;

    let by_age = ListOptions {
        sort: Some("age".into()),
        ..Default::default()
    };
    let ids = people.list_ids(None, &by_age).await.unwrap();
    assert_eq!(ids, vec![a.id().to_owned(), b.id().to_owned()]);

    let descending = ListOptions {
        sort: Some("age".into()),
        reverse: true,
        ..Default::default()
    };
    let ids = people.list_ids(None, &descending).await.unwrap();
    assert_eq!(ids, vec![b.id().to_owned(), a.id().to_owned()]);

    // Re-saving with a changed score moves the entry without duplicating it.
    let mut a2 = people.load(a.id()).await.unwrap().unwrap();
    a2.set("age", 40i64);
    people.save(a2).await.unwrap();
    let ids = people.list_ids(None, &by_age).await.unwrap();
    assert_eq!(ids, vec![b.id().to_owned(), a.id().to_owned()]);
}

#[tokio::test]
async fn compound_query_with_sort() {
    let (people, _) = people();
    let (a, b) = seed(&people).await;
    // A third person outside the Jo set.
    people
        .create(attrs! { "email" => "c@x", "first" => "Max", "age" => 25i64 })
        .await
        .unwrap();

    let query: Query = attrs! { "first" => "Jo" };
    let options = ListOptions {
        sort: Some("age".into()),
        reverse: true,
        ..Default::default()
    };
    let docs = people.list(Some(&query), &options).await.unwrap();
    let ids: Vec<&str> = docs.iter().map(Document::id).collect();
    assert_eq!(ids, vec![b.id(), a.id()]);
}

#[tokio::test]
async fn query_errors_surface() {
    let (people, _) = people();
    seed(&people).await;

    let query: Query = attrs! { "last" => "Ray" };
    assert!(matches!(
        people.list_ids(Some(&query), &ListOptions::default()).await,
        Err(ModelError::NonIndexedProperty(field)) if field == "last"
    ));

    let options = ListOptions {
        sort: Some("email".into()),
        ..Default::default()
    };
    assert!(matches!(
        people.list_ids(None, &options).await,
        Err(ModelError::NonSortableProperty(_))
    ));

    // Zero members is a successful empty answer.
    let query: Query = attrs! { "first" => "Nobody" };
    let ids = people
        .list_ids(Some(&query), &ListOptions::default())
        .await
        .unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn destroy_clears_every_index() {
    let (people, kv) = people();
    let (a, _) = seed(&people).await;

    people.destroy(a.id()).await.unwrap();
    assert_eq!(people.load(a.id()).await.unwrap(), None);

    let query: Query = attrs! { "email" => "a@x" };
    assert_eq!(people.load_by(&query).await.unwrap(), None);
    assert_eq!(
        kv.get("models:people:indexes:email:a@x").await.unwrap(),
        None
    );

    // The freed unique value can be claimed again.
    people
        .create(attrs! { "email" => "a@x", "first" => "New", "age" => 50i64 })
        .await
        .unwrap();
}

#[tokio::test]
async fn store_outage_fails_save_before_persisting() {
    let (people, kv) = people();
    let (mut a, _) = seed(&people).await;

    a.set("age", 40i64);
    kv.set_offline(true);
    assert!(matches!(
        people.save(a).await,
        Err(ModelError::Store { .. })
    ));
    kv.set_offline(false);

    // The uniqueness check failed before the write, so the previous revision
    // is untouched and indexes still answer from the last synchronization.
    let stored = people
        .load_by(&attrs! { "email" => "a@x" })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.rev(), 1);
    assert_eq!(stored.get("age"), Some(&FieldValue::from(20i64)));
}

#[tokio::test]
async fn spec_scenario_end_to_end() {
    let (people, _) = people();
    let a = people
        .create(attrs! { "email" => "a@x", "first" => "Jo", "age" => 20i64 })
        .await
        .unwrap();
    let b = people
        .create(attrs! { "email" => "b@x", "first" => "Jo", "age" => 30i64 })
        .await
        .unwrap();

    let jo: Query = attrs! { "first" => "Jo" };
    let mut ids = people
        .list_ids(Some(&jo), &ListOptions::default())
        .await
        .unwrap();
    ids.sort();
    let mut expected = vec![a.id().to_owned(), b.id().to_owned()];
    expected.sort();
    assert_eq!(ids, expected);

    let by_age = ListOptions {
        sort: Some("age".into()),
        ..Default::default()
    };
    assert_eq!(
        people.list_ids(None, &by_age).await.unwrap(),
        vec![a.id().to_owned(), b.id().to_owned()]
    );

    let by_age_desc = ListOptions {
        sort: Some("age".into()),
        reverse: true,
        ..Default::default()
    };
    assert_eq!(
        people.list_ids(None, &by_age_desc).await.unwrap(),
        vec![b.id().to_owned(), a.id().to_owned()]
    );

    let err = people
        .create(attrs! { "email" => "a@x", "first" => "C", "age" => 1i64 })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateKey(field) if field == "email"));
}

#[tokio::test]
async fn empty_string_values_are_unindexed() {
    let (people, kv) = people();

    // A set-indexed empty string is skipped, not a failed save.
    let doc = people
        .create(attrs! { "email" => "a@x", "first" => "", "age" => 20i64 })
        .await
        .unwrap();
    assert_eq!(doc.rev(), 1);
    assert_eq!(
        people
            .list_ids(None, &ListOptions::default())
            .await
            .unwrap(),
        vec![doc.id().to_owned()]
    );
    assert!(kv
        .smembers("models:people:sets:first:")
        .await
        .unwrap()
        .is_empty());

    // A unique empty string counts as missing, like an absent field.
    let err = people
        .create(attrs! { "email" => "", "first" => "Jo", "age" => 30i64 })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::MissingIndexedProperty(field) if field == "email"));
}

#[tokio::test]
async fn post_save_index_failure_leaves_document_persisted() {
    // No unique index, so nothing touches the store before the write.
    let mut registry = IndexRegistry::new();
    registry.declare_set("first").unwrap();
    registry.declare_sorted("age").unwrap();
    let kv = Arc::new(MemoryKv::new());
    let people = Collection::new(
        "people",
        registry,
        kv.clone(),
        Arc::new(MemoryBackend::new()),
    );

    kv.set_offline(true);
    let doc = Document::generate(attrs! { "first" => "Jo", "age" => 20i64 });
    let id = doc.id().to_owned();
    assert!(matches!(
        people.save(doc).await,
        Err(ModelError::Store { .. })
    ));

    // The document write stands; only the index mutation failed.
    let stored = people.load(&id).await.unwrap().unwrap();
    assert_eq!(stored.rev(), 1);

    // Until a corrective re-save, the set index is stale.
    kv.set_offline(false);
    let jo: Query = attrs! { "first" => "Jo" };
    assert!(people
        .list_ids(Some(&jo), &ListOptions::default())
        .await
        .unwrap()
        .is_empty());
    let stored = people.save(stored).await.unwrap();
    assert_eq!(
        people
            .list_ids(Some(&jo), &ListOptions::default())
            .await
            .unwrap(),
        vec![stored.id().to_owned()]
    );
}

#[tokio::test]
async fn load_by_id_key_delegates_to_plain_load() {
    let (people, _) = people();
    let (a, _) = seed(&people).await;

    let query: Query = attrs! { "id" => a.id() };
    let found = people.load_by(&query).await.unwrap().unwrap();
    assert_eq!(found, a);

    let query: Query = attrs! { "id" => "ghost" };
    assert_eq!(people.load_by(&query).await.unwrap(), None);
}

#[tokio::test]
async fn missing_unique_field_rejected() {
    let (people, _) = people();
    let err = people
        .create(attrs! { "first" => "Jo", "age" => 20i64 })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::MissingIndexedProperty(field) if field == "email"));
}

#[tokio::test]
async fn hydrated_list_skips_nothing_and_orders() {
    let (people, _) = people();
    let (a, b) = seed(&people).await;

    let by_age = ListOptions {
        sort: Some("age".into()),
        ..Default::default()
    };
    let docs = people.list(None, &by_age).await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id(), a.id());
    assert_eq!(docs[1].id(), b.id());
    assert_eq!(docs[0].get("email"), Some(&FieldValue::from("a@x")));
}
