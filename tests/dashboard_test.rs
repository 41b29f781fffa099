mod common;

use campusdesk::services::dashboard_service::load_summary;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{book_json, page, test_state};

async fn mount_list(server: &MockServer, route: &str, status: Option<&str>, body: serde_json::Value) {
    let mock = Mock::given(method("GET")).and(path(route));
    let mock = match status {
        Some(status) => mock.and(query_param("status", status)),
        None => mock,
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_summary_combines_every_source() {
    let server = MockServer::start().await;

    mount_list(
        &server,
        "/api/v1/library/books/",
        None,
        page(
            2,
            None,
            vec![
                book_json(1, "Dune", None, 3, 1),
                book_json(2, "Emma", None, 2, 2),
            ],
        ),
    )
    .await;
    mount_list(
        &server,
        "/api/v1/library/borrowings/",
        Some("borrowed"),
        page(
            2,
            None,
            vec![
                json!({ "id": 1, "book": 1, "borrower": 3, "borrowed_date": "2024-03-01", "due_date": "2024-03-10", "status": "borrowed" }),
                json!({ "id": 2, "book": 1, "borrower": 4, "borrowed_date": "2024-03-05", "due_date": "2024-03-25", "status": "borrowed" }),
            ],
        ),
    )
    .await;
    mount_list(
        &server,
        "/api/v1/library/borrowings/",
        Some("overdue"),
        page(0, None, vec![]),
    )
    .await;
    mount_list(
        &server,
        "/api/v1/library/fines/",
        Some("pending"),
        page(
            1,
            None,
            vec![json!({ "id": 1, "borrowing": 9, "amount": 2.0, "status": "pending" })],
        ),
    )
    .await;
    mount_list(&server, "/api/v1/students/", None, page(120, None, vec![])).await;
    mount_list(&server, "/api/v1/teachers/", None, page(11, None, vec![])).await;
    mount_list(&server, "/api/v1/classes/", None, page(6, None, vec![])).await;
    mount_list(&server, "/api/v1/billing/invoices/", Some("sent"), page(4, None, vec![])).await;
    mount_list(
        &server,
        "/api/v1/billing/invoices/",
        Some("partially_paid"),
        page(2, None, vec![]),
    )
    .await;
    mount_list(&server, "/api/v1/billing/invoices/", Some("overdue"), page(1, None, vec![])).await;

    let state = test_state(&server);
    let today = NaiveDate::from_ymd_opt(2024, 3, 19).unwrap();
    let summary = load_summary(&state, today).await.unwrap();

    assert_eq!(summary.books, 2);
    assert_eq!(summary.total_copies, 5);
    assert_eq!(summary.available_copies, 3);
    assert_eq!(summary.open_borrowings, 2);
    assert_eq!(summary.overdue_borrowings, 1);
    assert_eq!(summary.accruing_fines, 4.5);
    assert_eq!(summary.outstanding_fines, 2.0);
    assert_eq!(summary.students, 120);
    assert_eq!(summary.teachers, 11);
    assert_eq!(summary.classes, 6);
    assert_eq!(summary.open_invoices, 7);
}

#[tokio::test]
async fn test_summary_fails_when_a_source_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/students/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "detail": "Staff only" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, None, vec![])))
        .mount(&server)
        .await;

    let state = test_state(&server);
    let today = NaiveDate::from_ymd_opt(2024, 3, 19).unwrap();
    let err = load_summary(&state, today).await.unwrap_err();
    assert!(err.to_string().contains("Staff only"));
}

#[tokio::test]
async fn test_summary_counts_borrowings_once_when_filter_is_ignored() {
    let server = MockServer::start().await;
    // same rows whatever the status filter
    mount_list(
        &server,
        "/api/v1/library/borrowings/",
        None,
        page(
            2,
            None,
            vec![
                json!({ "id": 1, "book": 1, "borrower": 3, "borrowed_date": "2024-03-01", "due_date": "2024-03-10", "status": "overdue" }),
                json!({ "id": 2, "book": 1, "borrower": 4, "borrowed_date": "2024-03-05", "due_date": "2024-03-25", "status": "borrowed" }),
            ],
        ),
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, None, vec![])))
        .mount(&server)
        .await;

    let state = test_state(&server);
    let today = NaiveDate::from_ymd_opt(2024, 3, 19).unwrap();
    let summary = load_summary(&state, today).await.unwrap();

    assert_eq!(summary.open_borrowings, 2);
    assert_eq!(summary.overdue_borrowings, 1);
    assert_eq!(summary.accruing_fines, 4.5);
}
