mod common;

use serde_json::{json, Value};

use axum::http::StatusCode;
use common::{student_body, TestApp};

/// Six students with varied years, grades, and statuses.
async fn seeded() -> TestApp {
    let app = TestApp::new();
    let rows = [
        ("Ada", 2021, 3.9, "Active", vec!["Rust", "SQL"]),
        ("Ben", 2023, 2.8, "Active", vec!["Go"]),
        ("Cal", 2023, 3.5, "Graduated", vec![]),
        ("Dee", 2022, 3.1, "Suspended", vec!["Rust"]),
        ("Abe", 2023, 3.7, "Active", vec![]),
        ("Eve", 2020, 1.9, "Dropped", vec!["SQL"]),
    ];
    for (n, (first, year, gpa, status, skills)) in rows.into_iter().enumerate() {
        let mut body = student_body(n as u32 + 1);
        body["firstName"] = json!(first);
        body["enrollmentYear"] = json!(year);
        body["gpa"] = json!(gpa);
        body["status"] = json!(status);
        body["skills"] = json!(skills);
        app.create(body).await;
    }
    app
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|r| r["firstName"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

#[tokio::test]
async fn range_operator_filters_by_gpa() {
    let app = seeded().await;
    let (status, body) = app.get("/api/students?gpa[gte]=3.5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(sorted(names(&body)), vec!["Abe", "Ada", "Cal"]);
    assert_eq!(body["count"], 3);

    let (_, body) = app.get("/api/students?gpa[gt]=2&gpa[lt]=3.5").await;
    assert_eq!(sorted(names(&body)), vec!["Ben", "Dee"]);
}

#[tokio::test]
async fn plain_values_are_equality() {
    let app = seeded().await;
    let (_, body) = app.get("/api/students?status=Active&enrollmentYear=2023").await;
    assert_eq!(sorted(names(&body)), vec!["Abe", "Ben"]);

    let (_, body) = app.get("/api/students?skills=Rust").await;
    assert_eq!(sorted(names(&body)), vec!["Ada", "Dee"]);
}

#[tokio::test]
async fn in_operator_matches_any_listed_value() {
    let app = seeded().await;
    let (status, body) = app
        .get("/api/students?status[in][]=Graduated&status[in][]=Dropped")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted(names(&body)), vec!["Cal", "Eve"]);

    let (_, body) = app.get("/api/students?status[in]=Suspended").await;
    assert_eq!(names(&body), vec!["Dee"]);
}

#[tokio::test]
async fn reserved_keys_never_filter() {
    let app = seeded().await;
    let (status, body) = app
        .get("/api/students?select=firstName&sort=firstName&page=1&limit=10")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 6);
}

#[tokio::test]
async fn sorts_by_multiple_keys() {
    let app = seeded().await;
    let (_, body) = app.get("/api/students?sort=-enrollmentYear,firstName").await;
    assert_eq!(names(&body), vec!["Abe", "Ben", "Cal", "Dee", "Ada", "Eve"]);
}

#[tokio::test]
async fn default_order_is_newest_first() {
    let app = seeded().await;
    let (_, body) = app.get("/api/students").await;
    let created: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["createdAt"].as_str().unwrap())
        .collect();
    assert!(created.windows(2).all(|w| w[0] >= w[1]), "not descending: {:?}", created);
}

#[tokio::test]
async fn pagination_links_follow_filtered_total() {
    let app = seeded().await;

    let (_, first) = app.get("/api/students?status=Active&sort=firstName&limit=2").await;
    assert_eq!(names(&first), vec!["Abe", "Ada"]);
    assert_eq!(first["pagination"]["next"], json!({ "page": 2, "limit": 2 }));
    assert!(first["pagination"].get("prev").is_none());

    let (_, second) = app
        .get("/api/students?status=Active&sort=firstName&limit=2&page=2")
        .await;
    assert_eq!(names(&second), vec!["Ben"]);
    assert_eq!(second["count"], 1);
    assert!(second["pagination"].get("next").is_none());
    assert_eq!(second["pagination"]["prev"], json!({ "page": 1, "limit": 2 }));

    let (_, everything) = app.get("/api/students?limit=50").await;
    assert_eq!(everything["pagination"], json!({}));
}

#[tokio::test]
async fn garbage_pagination_falls_back_to_defaults() {
    let app = seeded().await;
    let (status, body) = app.get("/api/students?page=zero&limit=-4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 6);
    assert!(body["pagination"].get("prev").is_none());
}

#[tokio::test]
async fn select_returns_only_requested_fields_and_id() {
    let app = seeded().await;
    let (status, body) = app.get("/api/students?select=firstName,gpa&sort=firstName").await;
    assert_eq!(status, StatusCode::OK);

    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 6);
    for row in rows {
        let mut keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["firstName", "gpa", "id"]);
    }
}

#[tokio::test]
async fn nested_members_can_be_filtered() {
    let app = TestApp::new();
    let mut lyon = student_body(1);
    lyon["address"] = json!({ "city": "Lyon", "country": "France" });
    app.create(lyon).await;
    let mut oslo = student_body(2);
    oslo["address"] = json!({ "city": "Oslo" });
    app.create(oslo).await;

    let (status, body) = app.get("/api/students?address.city=Lyon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["address"]["country"], "France");
}

#[tokio::test]
async fn bad_queries_are_client_errors() {
    let app = seeded().await;
    let cases = [
        ("/api/students?nickname=Ace", "UNKNOWN_FIELD"),
        ("/api/students?gpa[gt]=abc", "INVALID_VALUE"),
        ("/api/students?enrollmentYear=soon", "INVALID_VALUE"),
        ("/api/students?gpa[gt=3", "MALFORMED_FILTER"),
        ("/api/students?gpa[$gt]=3", "MALFORMED_FILTER"),
        ("/api/students?$where=1", "MALFORMED_FILTER"),
        ("/api/students?skills[gt]=Go", "UNSUPPORTED_OPERATOR"),
        ("/api/students?select=password", "UNKNOWN_FIELD"),
        ("/api/students?sort=-password", "UNKNOWN_FIELD"),
    ];

    for (uri, code) in cases {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}: {}", uri, body);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], code, "{}: {}", uri, body);
    }
}
