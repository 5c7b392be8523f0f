//! Raw backend records -> display entities.
//!
//! Every mapping here is total. Missing or malformed fields are replaced by
//! the defaults below instead of failing the whole page:
//!
//! | field            | default                                   |
//! |------------------|-------------------------------------------|
//! | seller           | `seller`, then `user`, then `sellerId`, then placeholder |
//! | seller id/email  | [`PLACEHOLDER_SELLER_ID`] / [`PLACEHOLDER_EMAIL`] |
//! | created_at       | Unix epoch                                |
//! | price            | 0 (negative and non-numeric values too)   |
//! | condition        | `Good`                                    |
//! | size             | `OneSize`                                 |
//! | title            | "Bez naziva"                              |
//! | category         | "Ostalo"                                  |
//! | availability     | sold > reserved > available               |

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{Availability, Brand, Condition, Product, Size, User};
use crate::types::{RawBrand, RawProduct, RawUser, SellerSource};

pub const PLACEHOLDER_SELLER_ID: &str = "unknown-seller";
pub const PLACEHOLDER_EMAIL: &str = "unknown@vitrina.invalid";
pub const PLACEHOLDER_PRODUCT_ID: &str = "unknown-product";

fn non_blank(s: Option<&String>) -> Option<String> {
    s.map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// RFC 3339, or epoch milliseconds as a string
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    s.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// Whole dinars from a number or numeric string, clamped at zero
pub fn parse_price(raw: Option<&Value>) -> u64 {
    let value = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

fn brand_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

pub fn brand(raw: &RawBrand) -> Option<Brand> {
    let (id, name) = match raw {
        RawBrand::Named(name) => (None, name),
        RawBrand::Object { id, name } => (id.as_ref(), name),
    };
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Brand {
        id: non_blank(id).unwrap_or_else(|| brand_slug(name)),
        name: name.to_string(),
    })
}

pub fn user(raw: &RawUser) -> User {
    User {
        id: non_blank(raw.id.as_ref()).unwrap_or_else(|| PLACEHOLDER_SELLER_ID.to_string()),
        email: non_blank(raw.email.as_ref()).unwrap_or_else(|| PLACEHOLDER_EMAIL.to_string()),
        first_name: non_blank(raw.first_name.as_ref()),
        last_name: non_blank(raw.last_name.as_ref()),
        avatar: non_blank(raw.avatar.as_ref()),
        rating: raw
            .rating
            .filter(|r| r.is_finite())
            .map(|r| r.clamp(0.0, 5.0)),
        review_count: raw.review_count.unwrap_or(0),
        items_sold: raw.items_sold.unwrap_or(0),
        response_time: non_blank(raw.response_time.as_ref()),
        member_since: parse_timestamp(raw.created_at.as_deref()),
    }
}

fn placeholder_seller(id: Option<&str>) -> User {
    user(&RawUser {
        id: id.map(str::to_string),
        ..RawUser::default()
    })
}

pub fn seller(source: SellerSource<'_>) -> User {
    match source {
        SellerSource::Seller(raw) | SellerSource::User(raw) => user(raw),
        SellerSource::IdOnly(id) => placeholder_seller(Some(id)),
        SellerSource::Missing => placeholder_seller(None),
    }
}

pub fn product(raw: &RawProduct) -> Product {
    let id = non_blank(raw.id.as_ref()).unwrap_or_else(|| PLACEHOLDER_PRODUCT_ID.to_string());
    let created_at = parse_timestamp(raw.created_at.as_deref()).unwrap_or_else(|| {
        log::debug!("[normalize] product {id}: missing or bad createdAt, using epoch");
        DateTime::<Utc>::default()
    });
    let source = raw.seller_source();
    if matches!(source, SellerSource::Missing) {
        log::debug!("[normalize] product {id}: no seller, using placeholder");
    }

    let availability = if raw.is_sold.unwrap_or(false) {
        Availability::Sold
    } else if raw.is_reserved.unwrap_or(false) {
        Availability::Reserved
    } else {
        Availability::Available
    };

    Product {
        title: non_blank(raw.title.as_ref()).unwrap_or_else(|| "Bez naziva".to_string()),
        description: non_blank(raw.description.as_ref()),
        price: parse_price(raw.price.as_ref()),
        images: raw
            .images
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        condition: raw
            .condition
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(Condition::Good),
        size: raw
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Size::OneSize),
        brand: raw.brand.as_ref().and_then(brand),
        category: non_blank(raw.category.as_ref()).unwrap_or_else(|| "Ostalo".to_string()),
        location: non_blank(raw.location.as_ref()).unwrap_or_default(),
        seller: seller(source),
        created_at,
        availability,
        id,
    }
}
