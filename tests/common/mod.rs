//! Stub marketplace backend shared by the integration tests

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const PASSWORD: &str = "tajna1234";
pub const ACCESS: &str = "acc-ana";
pub const REFRESH: &str = "ref-ana";

/// Requests the stub saw, for assertions
#[derive(Clone, Default)]
pub struct Seen {
    pub product_queries: Arc<Mutex<Vec<String>>>,
    pub logouts: Arc<Mutex<u32>>,
    pub uploads: Arc<Mutex<Vec<String>>>,
}

pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn ana() -> Value {
    json!({
        "_id": "u-ana",
        "email": "ana.ilic@primer.rs",
        "firstName": "Ana",
        "lastName": "Ilić",
        "rating": 4.75,
        "reviewCount": 12,
        "itemsSold": 30,
        "createdAt": "2024-01-10T10:00:00Z"
    })
}

pub fn marko() -> Value {
    json!({ "_id": "u-marko", "email": "marko@primer.rs", "firstName": "Marko" })
}

pub fn products() -> Value {
    json!([
        {"_id": "p1", "title": "Zimska jakna", "price": 4500, "size": "M", "condition": "VERY_GOOD",
         "brand": {"_id": "nike", "name": "Nike"}, "images": ["https://cdn.test/p1.jpg"],
         "seller": marko(), "createdAt": "2026-10-01T10:00:00Z"},
        {"_id": "p2", "title": "Lanena haljina", "price": 2500, "size": "S",
         "brand": "Zara", "seller": ana(), "createdAt": "2026-10-02T10:00:00Z"},
        {"_id": "p3", "title": "Patike", "price": 7000, "size": "L", "isSold": true,
         "brand": {"_id": "nike", "name": "Nike"}, "seller": marko()},
        {"_id": "p4", "title": "Šal", "price": 1200, "size": "ONE_SIZE", "isReserved": true,
         "seller": marko()}
    ])
}

fn product(id: &str) -> Option<Value> {
    products()
        .as_array()?
        .iter()
        .find(|p| p["_id"] == id)
        .cloned()
}

fn tokens(with_user: bool) -> Value {
    let mut t = json!({ "accessToken": ACCESS, "idToken": "id-ana", "refreshToken": REFRESH });
    if with_user {
        t["user"] = ana();
    }
    t
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response()
}

async fn list_products(State(seen): State<Seen>, RawQuery(q): RawQuery) -> Json<Value> {
    seen.product_queries
        .lock()
        .unwrap()
        .push(q.unwrap_or_default());
    Json(json!({ "data": products(), "total": 4, "page": 1 }))
}

async fn get_product(Path(id): Path<String>) -> Response {
    match product(&id) {
        Some(p) => Json(p).into_response(),
        None => not_found(),
    }
}

async fn brands() -> Json<Value> {
    Json(json!([
        {"_id": "nike", "name": "Nike"},
        {"_id": "zara", "name": "Zara"},
        {"_id": "cos", "name": "Čizme & Co"},
        "Mango"
    ]))
}

async fn get_user(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "u-ana" => Json(ana()).into_response(),
        "u-marko" => Json(marko()).into_response(),
        _ => not_found(),
    }
}

async fn user_products(Path(id): Path<String>) -> Json<Value> {
    let items: Vec<Value> = products()
        .as_array()
        .map(|all| {
            all.iter()
                .filter(|p| p["seller"]["_id"] == id)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(json!({ "products": items }))
}

async fn review_summary(Path(id): Path<String>) -> Response {
    if id != "u-ana" {
        return not_found();
    }
    Json(json!({
        "averageRating": 4.75,
        "totalReviews": 12,
        "breakdown": { "accuracy": 4.8, "communication": 5.0, "shipping": 4.5 },
        "recommendationPercentage": 96,
        "highlights": ["Brza isporuka"]
    }))
    .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD && body["email"] == "ana.ilic@primer.rs" {
        Json(tokens(true)).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Pogrešan email ili lozinka" })),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "ana.ilic@primer.rs" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": ["Email je već registrovan"] })),
        )
            .into_response();
    }
    Json(tokens(false)).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(ACCESS) => Json(ana()).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthorized" }))).into_response(),
    }
}

async fn logout(State(seen): State<Seen>) -> StatusCode {
    *seen.logouts.lock().unwrap() += 1;
    StatusCode::NO_CONTENT
}

async fn refresh(Json(body): Json<Value>) -> Response {
    if body["refreshToken"] == REFRESH {
        Json(json!({ "accessToken": ACCESS })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Session expired" }))).into_response()
    }
}

async fn upload(State(seen): State<Seen>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("multipart/form-data") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    seen.uploads
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&body).into_owned());
    Json(json!({ "url": "https://cdn.test/uploads/1.jpg" })).into_response()
}

pub fn backend(seen: Seen) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/brands", get(brands))
        .route("/users/:id", get(get_user))
        .route("/users/:id/products", get(user_products))
        .route("/users/:id/reviews/summary", get(review_summary))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/upload/image", post(upload))
        .with_state(seen)
}

pub async fn spawn_backend() -> (String, Seen) {
    let seen = Seen::default();
    let url = spawn(backend(seen.clone())).await;
    (url, seen)
}
