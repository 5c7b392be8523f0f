//! ApiClient against a local stub backend

mod common;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use vitrina::api::{ApiClient, ApiError, ProductQuery};
use vitrina::models::Size;
use vitrina::normalize;
use vitrina::types::{LoginRequest, RegisterRequest};

fn client(url: &str) -> ApiClient {
    ApiClient::new(url, 5_000, 2).unwrap()
}

#[tokio::test]
async fn list_products_sends_filters_and_reads_envelope() {
    let (url, seen) = common::spawn_backend().await;
    let mut query = ProductQuery {
        page: Some(2),
        page_size: Some(24),
        search: Some(" jakna ".into()),
        ..ProductQuery::default()
    };
    query.filters.add_size(Size::M);
    query.filters.add_brand("Nike");
    query.filters.set_min_price(Some(1000));

    let page = client(&url).list_products(&query).await.unwrap();
    assert_eq!(page.items.len(), 4);
    assert_eq!(page.total, Some(4));

    let sent = seen.product_queries.lock().unwrap()[0].clone();
    assert!(sent.contains("page=2"), "{sent}");
    assert!(sent.contains("pageSize=24"), "{sent}");
    assert!(sent.contains("search=jakna"), "{sent}");
    assert!(sent.contains("sizes=M"), "{sent}");
    assert!(sent.contains("brands=nike"), "{sent}");
    assert!(sent.contains("minPrice=1000"), "{sent}");
}

#[tokio::test]
async fn missing_entities_are_none_not_errors() {
    let (url, _) = common::spawn_backend().await;
    let api = client(&url);

    let p = api.get_product("p1").await.unwrap().unwrap();
    assert_eq!(normalize::product(&p).title, "Zimska jakna");
    assert!(api.get_product("nope").await.unwrap().is_none());
    assert!(api.get_user("nope").await.unwrap().is_none());
    assert!(api.get_review_summary("u-marko").await.unwrap().is_none());

    let summary = api.get_review_summary("u-ana").await.unwrap().unwrap();
    assert_eq!(summary.total_reviews, 12);
    assert_eq!(summary.recommendation_percentage, 96);
}

#[tokio::test]
async fn brands_accept_names_and_objects() {
    let (url, _) = common::spawn_backend().await;
    let brands = client(&url).list_brands().await.unwrap();
    let names: Vec<String> = brands
        .iter()
        .filter_map(normalize::brand)
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["Nike", "Zara", "Čizme & Co", "Mango"]);
}

#[tokio::test]
async fn user_products_and_profile() {
    let (url, _) = common::spawn_backend().await;
    let api = client(&url);
    let user = normalize::user(&api.get_user("u-ana").await.unwrap().unwrap());
    assert_eq!(user.first_name.as_deref(), Some("Ana"));
    assert_eq!(user.review_count, 12);

    let page = api.get_user_products("u-ana").await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id.as_deref(), Some("p2"));
}

#[tokio::test]
async fn login_error_surfaces_backend_message() {
    let (url, _) = common::spawn_backend().await;
    let err = client(&url)
        .login(&LoginRequest {
            email: "ana.ilic@primer.rs".into(),
            password: "pogresno".into(),
        })
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Pogrešan email ili lozinka");
}

#[tokio::test]
async fn login_then_me_with_bearer() {
    let (url, seen) = common::spawn_backend().await;
    let api = client(&url);
    let tokens = api
        .login(&LoginRequest {
            email: "ana.ilic@primer.rs".into(),
            password: common::PASSWORD.into(),
        })
        .await
        .unwrap();
    assert_eq!(tokens.refresh_token.as_deref(), Some(common::REFRESH));

    assert!(api.me().await.unwrap_err().is_unauthorized());
    let authed = api.with_token(Some(tokens.access_token.clone()));
    assert_eq!(authed.me().await.unwrap().id.as_deref(), Some("u-ana"));

    authed.logout().await.unwrap();
    assert_eq!(*seen.logouts.lock().unwrap(), 1);

    let refreshed = api.refresh(common::REFRESH).await.unwrap();
    assert_eq!(refreshed.access_token, common::ACCESS);
    assert!(api.refresh("stale").await.is_err());
}

#[tokio::test]
async fn register_conflict_joins_messages() {
    let (url, _) = common::spawn_backend().await;
    let err = client(&url)
        .register(&RegisterRequest {
            email: "ana.ilic@primer.rs".into(),
            password: "dovoljnodugo".into(),
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Email je već registrovan");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn upload_is_multipart() {
    let (url, seen) = common::spawn_backend().await;
    let out = client(&url)
        .upload_image(b"\xFF\xD8fake".to_vec(), "jakna.jpg", "image/jpeg")
        .await
        .unwrap();
    assert_eq!(out, "https://cdn.test/uploads/1.jpg");
    let body = seen.uploads.lock().unwrap()[0].clone();
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"jakna.jpg\""));
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/brands",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})))
                } else {
                    (StatusCode::OK, Json(json!([{ "_id": "nike", "name": "Nike" }])))
                }
            }
        }),
    );
    let url = common::spawn(app).await;

    let brands = client(&url).list_brands().await.unwrap();
    assert_eq!(brands.len(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    // no retries configured -> the 503 surfaces
    hits.store(0, Ordering::SeqCst);
    let err = ApiClient::new(&url, 5_000, 0)
        .unwrap()
        .list_brands()
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), vitrina::api::FALLBACK_ERROR_MESSAGE);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // Bind then drop to get a closed port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = ApiClient::new(&format!("http://{addr}"), 2_000, 0)
        .unwrap()
        .list_brands()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.user_message(), vitrina::api::NETWORK_ERROR_MESSAGE);
}

#[tokio::test]
async fn one_malformed_product_keeps_the_rest_of_the_page() {
    let app = Router::new().route(
        "/users/:id/products",
        get(|| async {
            Json(json!({
                "products": [
                    { "_id": "p1", "seller": "u-ana", "createdAt": 1767225600000u64 },
                    { "_id": "p2", "images": null, "price": "1500" },
                    "garbage"
                ]
            }))
        }),
    );
    let url = common::spawn(app).await;

    let page = client(&url).get_user_products("u-ana").await.unwrap();
    assert_eq!(page.items.len(), 2);
    let first = normalize::product(&page.items[0]);
    assert_eq!(first.seller.id, "u-ana");
    assert_eq!(first.created_at.timestamp_millis(), 1_767_225_600_000);
    let second = normalize::product(&page.items[1]);
    assert!(second.images.is_empty());
    assert_eq!(second.price, 1500);
}
