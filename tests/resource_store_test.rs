mod common;

use std::sync::Arc;
use std::time::Duration;

use campusdesk::domain::{ClientError, ListParams, StoreError};
use campusdesk::models::{Book, Category};
use campusdesk::services::{FetchOutcome, ResourceStore};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{book_json, page, test_client};

fn categories(n: i64) -> Vec<serde_json::Value> {
    (1..=n)
        .map(|id| json!({ "id": id, "name": format!("Category {}", id) }))
        .collect()
}

#[tokio::test]
async fn test_delete_decrements_count_without_refetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(5, None, categories(5))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/library/categories/3/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    assert_eq!(store.fetch(ListParams::new()).await.unwrap(), FetchOutcome::Applied);
    let before = store.results().await;

    store.delete(3).await.unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.count, 4);
    assert_eq!(snapshot.results.len(), 4);
    assert!(snapshot.results.iter().all(|c| c.id != Some(3)));
    // untouched rows are the same allocations
    assert!(Arc::ptr_eq(&before[0], &snapshot.results[0]));
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_create_appends_row_and_bumps_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(2, None, categories(2))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/library/categories/"))
        .and(body_json(json!({ "name": "Poetry", "description": null })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 3, "name": "Poetry" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    store.fetch(ListParams::new()).await.unwrap();

    let created = store
        .create(&Category {
            id: None,
            name: "Poetry".to_string(),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(created.id, Some(3));
    assert_eq!(store.count().await, 3);
    assert_eq!(store.results().await.last().unwrap().name, "Poetry");
}

#[tokio::test]
async fn test_invalid_form_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    let err = store.create(&Category::default()).await.unwrap_err();

    match err {
        StoreError::Invalid(errors) => assert!(errors.has("name")),
        other => panic!("expected local validation error, got {:?}", other),
    }
    assert!(store.error().await.is_none());
}

#[tokio::test]
async fn test_server_field_errors_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/library/books/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "isbn": ["Book with this isbn already exists."]
        })))
        .mount(&server)
        .await;

    let store: ResourceStore<Book> = ResourceStore::rest(&test_client(&server));
    let book = Book {
        title: "Dune".to_string(),
        isbn: Some("9780441013593".to_string()),
        total_copies: 1,
        available_copies: 1,
        ..Default::default()
    };

    match store.create(&book).await.unwrap_err() {
        StoreError::Client(ClientError::Validation { fields, .. }) => {
            assert_eq!(
                fields.get("isbn").unwrap(),
                &vec!["Book with this isbn already exists.".to_string()]
            );
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(store.error().await.is_some());
    assert!(!store.is_loading().await);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "boom" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(2, None, categories(2))))
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    store.fetch(ListParams::new()).await.unwrap();

    let err = store.fetch(ListParams::new().page(2)).await.unwrap_err();
    assert!(err.to_string().contains("boom"));

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.results.len(), 2);
    assert_eq!(snapshot.current_page(), 1);
    assert!(snapshot.error.unwrap().contains("boom"));
}

#[tokio::test]
async fn test_fetch_next_follows_link() {
    let server = MockServer::start().await;
    let next = format!("{}/api/v1/library/categories/?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(3, None, vec![json!({ "id": 3, "name": "Category 3" })])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(3, Some(next), categories(2))),
        )
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    store.fetch(ListParams::new().page_size(2)).await.unwrap();
    assert!(store.snapshot().await.has_next());

    assert_eq!(store.fetch_next().await.unwrap(), FetchOutcome::Applied);
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.current_page(), 2);
    assert_eq!(snapshot.results[0].id, Some(3));
    assert!(!snapshot.has_next());

    assert_eq!(store.fetch_next().await.unwrap(), FetchOutcome::NoPage);
}

#[tokio::test]
async fn test_slow_older_response_is_dropped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/library/books/"))
        .and(query_param("search", "slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(1, None, vec![book_json(1, "Slow", None, 1, 1)]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/books/"))
        .and(query_param("search", "fast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(1, None, vec![book_json(2, "Fast", None, 1, 1)])),
        )
        .mount(&server)
        .await;

    let store: ResourceStore<Book> = ResourceStore::rest(&test_client(&server));
    let (slow, fast) = tokio::join!(
        store.fetch(ListParams::new().search("slow")),
        store.fetch(ListParams::new().search("fast")),
    );

    assert_eq!(slow.unwrap(), FetchOutcome::Stale);
    assert_eq!(fast.unwrap(), FetchOutcome::Applied);

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.results.len(), 1);
    assert_eq!(snapshot.results[0].title, "Fast");
    assert_eq!(snapshot.params.search.as_deref(), Some("fast"));
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn test_plain_array_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(categories(3)))
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    store.fetch(ListParams::new()).await.unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.count, 3);
    assert!(!snapshot.has_next());
}

#[tokio::test]
async fn test_fetch_previous_follows_link_back() {
    let server = MockServer::start().await;
    // the backend drops `page` from the link to the first page
    let previous = format!("{}/api/v1/library/categories/?page_size=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": null,
            "previous": previous,
            "results": [{ "id": 3, "name": "Category 3" }],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(3, None, categories(2))))
        .expect(1)
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    store.fetch(ListParams::new().page(2).page_size(2)).await.unwrap();
    assert!(store.snapshot().await.has_previous());

    assert_eq!(store.fetch_previous().await.unwrap(), FetchOutcome::Applied);
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.current_page(), 1);
    assert_eq!(snapshot.results.len(), 2);
    assert!(!snapshot.has_previous());

    assert_eq!(store.fetch_previous().await.unwrap(), FetchOutcome::NoPage);
}

#[tokio::test]
async fn test_retrieve_replaces_cached_row_in_place() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(3, None, categories(3))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/library/categories/2/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": 2, "name": "Poetry" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store: ResourceStore<Category> = ResourceStore::rest(&test_client(&server));
    store.fetch(ListParams::new()).await.unwrap();
    let before = store.results().await;

    let fresh = store.retrieve(2).await.unwrap();
    assert_eq!(fresh.name, "Poetry");

    let after = store.results().await;
    assert_eq!(store.count().await, 3);
    assert_eq!(after.len(), 3);
    assert_eq!(after[1].name, "Poetry");
    assert!(Arc::ptr_eq(&before[0], &after[0]));
    assert!(Arc::ptr_eq(&before[2], &after[2]));
}
