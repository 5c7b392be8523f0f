//! Raw backend records, exactly as the marketplace API sends them.
//!
//! Fields are optional wherever the backend has been seen to omit them, and
//! a field of the wrong type decodes as absent instead of failing the record.
//! List items that are not records at all are skipped, so one bad entry never
//! costs the whole page. [`crate::normalize`] turns these into display
//! entities.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Field decoders that never reject a record
mod lenient {
    use serde::{
        de::{DeserializeOwned, Error},
        Deserialize, Deserializer,
    };
    use serde_json::Value;

    use super::{RawSellerRef, RawUser};

    /// Wrong type or null -> `None`
    pub fn opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let v = Value::deserialize(d)?;
        Ok(serde_json::from_value(v).ok())
    }

    /// Strings as sent, numbers rendered (numeric ids, epoch-ms timestamps)
    pub fn string<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn strings<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Value::String(s) => vec![s],
            _ => Vec::new(),
        })
    }

    /// Embedded user object, or a bare id
    pub fn seller<'de, D>(d: D) -> Result<Option<RawSellerRef>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::String(id) => Some(RawSellerRef::Id(id)),
            Value::Number(n) => Some(RawSellerRef::Id(n.to_string())),
            v @ Value::Object(_) => serde_json::from_value::<RawUser>(v)
                .ok()
                .map(RawSellerRef::Embedded),
            _ => None,
        })
    }

    /// Keep the items that decode, log how many did not
    pub fn items<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = match Value::deserialize(d)? {
            Value::Array(items) => items,
            other => return Err(D::Error::custom(format!("expected a list, got {other}"))),
        };
        let total = raw.len();
        let items: Vec<T> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        if items.len() < total {
            log::warn!("[api] skipped {} malformed record(s) of {total}", total - items.len());
        }
        Ok(items)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(default, alias = "_id", deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub last_name: Option<String>,
    #[serde(default, alias = "avatarUrl", deserialize_with = "lenient::string")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub rating: Option<f32>,
    #[serde(default, alias = "reviewsCount", deserialize_with = "lenient::opt")]
    pub review_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub items_sold: Option<u32>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub response_time: Option<String>,
    #[serde(default, alias = "memberSince", deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
}

/// Brand arrives either as a bare name or as an object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBrand {
    Named(String),
    Object {
        #[serde(default, alias = "_id")]
        id: Option<String>,
        name: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(default, alias = "_id", deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: Option<String>,
    /// Number or numeric string
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub brand: Option<RawBrand>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub location: Option<String>,
    /// Newer endpoints embed the seller here...
    #[serde(default, deserialize_with = "lenient::seller")]
    pub seller: Option<RawSellerRef>,
    /// ...older ones under `user`
    #[serde(default, deserialize_with = "lenient::seller")]
    pub user: Option<RawSellerRef>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub seller_id: Option<String>,
    /// RFC 3339 or epoch milliseconds
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub is_sold: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub is_reserved: Option<bool>,
}

/// `seller`/`user` hold either the embedded user or just its id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSellerRef {
    Id(String),
    Embedded(RawUser),
}

/// Where a product's seller identity came from
#[derive(Debug, Clone, Copy)]
pub enum SellerSource<'a> {
    Seller(&'a RawUser),
    User(&'a RawUser),
    IdOnly(&'a str),
    Missing,
}

impl RawProduct {
    pub fn seller_source(&self) -> SellerSource<'_> {
        let blank = |id: &str| id.trim().is_empty();
        match (&self.seller, &self.user) {
            (Some(RawSellerRef::Embedded(s)), _) => SellerSource::Seller(s),
            (_, Some(RawSellerRef::Embedded(u))) => SellerSource::User(u),
            (Some(RawSellerRef::Id(id)), _) | (_, Some(RawSellerRef::Id(id))) if !blank(id) => {
                SellerSource::IdOnly(id)
            }
            _ => match self.seller_id.as_deref() {
                Some(id) if !blank(id) => SellerSource::IdOnly(id),
                _ => SellerSource::Missing,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    #[serde(alias = "data", alias = "products", deserialize_with = "lenient::items")]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub page_size: Option<u32>,
}

/// Some list endpoints return a bare array instead of a page envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged, bound(deserialize = "T: DeserializeOwned"))]
pub enum PageEnvelope<T> {
    Bare(#[serde(deserialize_with = "lenient::items")] Vec<T>),
    Page(Page<T>),
}

impl<T> From<PageEnvelope<T>> for Page<T> {
    fn from(env: PageEnvelope<T>) -> Self {
        match env {
            PageEnvelope::Page(p) => p,
            PageEnvelope::Bare(items) => Page {
                total: Some(items.len() as u64),
                items,
                page: None,
                page_size: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Tokens returned by login/register/refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<RawUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seller_prefers_seller_over_user() {
        let p: RawProduct = serde_json::from_value(json!({
            "_id": "p1",
            "seller": {"_id": "s1", "email": "s@x.rs"},
            "user": {"_id": "u1", "email": "u@x.rs"}
        }))
        .unwrap();
        match p.seller_source() {
            SellerSource::Seller(u) => assert_eq!(u.id.as_deref(), Some("s1")),
            other => panic!("expected seller, got {other:?}"),
        }
    }

    #[test]
    fn seller_falls_back_to_user_then_id() {
        let p: RawProduct = serde_json::from_value(json!({"user": {"id": "u1"}})).unwrap();
        assert!(matches!(p.seller_source(), SellerSource::User(_)));

        let p: RawProduct = serde_json::from_value(json!({"sellerId": "s9"})).unwrap();
        assert!(matches!(p.seller_source(), SellerSource::IdOnly("s9")));

        let p: RawProduct = serde_json::from_value(json!({"sellerId": "  "})).unwrap();
        assert!(matches!(p.seller_source(), SellerSource::Missing));
    }

    #[test]
    fn brand_accepts_string_or_object() {
        let p: RawProduct = serde_json::from_value(json!({"brand": "Zara"})).unwrap();
        assert!(matches!(p.brand, Some(RawBrand::Named(ref n)) if n == "Zara"));

        let p: RawProduct =
            serde_json::from_value(json!({"brand": {"_id": "b1", "name": "Nike"}})).unwrap();
        assert!(matches!(p.brand, Some(RawBrand::Object { ref name, .. }) if name == "Nike"));
    }

    #[test]
    fn seller_given_as_bare_id() {
        let p: RawProduct = serde_json::from_value(json!({"seller": "s1"})).unwrap();
        assert!(matches!(p.seller_source(), SellerSource::IdOnly("s1")));

        let p: RawProduct = serde_json::from_value(json!({"user": 42})).unwrap();
        assert!(matches!(p.seller_source(), SellerSource::IdOnly("42")));

        // embedded object wins over a bare id on the other field
        let p: RawProduct =
            serde_json::from_value(json!({"seller": "s1", "user": {"_id": "u1"}})).unwrap();
        assert!(matches!(p.seller_source(), SellerSource::User(_)));
    }

    #[test]
    fn wrong_field_types_decode_as_absent() {
        let p: RawProduct = serde_json::from_value(json!({
            "_id": 17,
            "images": null,
            "createdAt": 1767225600000u64,
            "seller": {"_id": 42, "rating": "odlično", "reviewCount": -3},
            "brand": 5,
            "isSold": "da"
        }))
        .unwrap();
        assert_eq!(p.id.as_deref(), Some("17"));
        assert!(p.images.is_empty());
        assert_eq!(p.created_at.as_deref(), Some("1767225600000"));
        assert!(p.brand.is_none());
        assert!(p.is_sold.is_none());
        match p.seller_source() {
            SellerSource::Seller(u) => {
                assert_eq!(u.id.as_deref(), Some("42"));
                assert!(u.rating.is_none());
                assert!(u.review_count.is_none());
            }
            other => panic!("expected seller, got {other:?}"),
        }
    }

    #[test]
    fn one_bad_record_does_not_fail_the_page() {
        let env: PageEnvelope<RawProduct> = serde_json::from_value(json!({
            "data": [
                {"_id": "good", "title": "Jakna", "seller": {"_id": "s1"}},
                {"_id": "p1", "seller": "s1"},
                {"_id": "p2", "images": null},
                {"_id": "p3", "createdAt": 1767225600000u64},
                {"_id": "p4", "seller": {"_id": 42}},
                null,
                "not a record"
            ],
            "total": "7"
        }))
        .unwrap();
        let page: Page<RawProduct> = env.into();
        let ids: Vec<_> = page.items.iter().filter_map(|p| p.id.as_deref()).collect();
        assert_eq!(ids, vec!["good", "p1", "p2", "p3", "p4"]);
        assert!(page.total.is_none());

        let env: PageEnvelope<RawBrand> =
            serde_json::from_value(json!(["Zara", 12, {"name": "Nike"}])).unwrap();
        let page: Page<RawBrand> = env.into();
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn page_envelope_accepts_bare_arrays() {
        let env: PageEnvelope<RawBrand> = serde_json::from_value(json!(["A", "B"])).unwrap();
        let page: Page<RawBrand> = env.into();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(2));

        let env: PageEnvelope<RawProduct> =
            serde_json::from_value(json!({"data": [{"title": "x"}], "total": 40})).unwrap();
        let page: Page<RawProduct> = env.into();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, Some(40));
    }
}
