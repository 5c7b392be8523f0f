//! Display entities consumed by the view layer.
//!
//! These are the normalized shapes; raw backend records live in
//! [`crate::types`] and are converted by [`crate::normalize`].

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    VeryGood,
    Good,
    Satisfactory,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::New,
        Condition::VeryGood,
        Condition::Good,
        Condition::Satisfactory,
    ];

    /// Wire / query-string value
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::VeryGood => "very_good",
            Condition::Good => "good",
            Condition::Satisfactory => "satisfactory",
        }
    }

    /// Label shown to shoppers
    pub fn label(self) -> &'static str {
        match self {
            Condition::New => "Novo sa etiketom",
            Condition::VeryGood => "Veoma dobro",
            Condition::Good => "Dobro",
            Condition::Satisfactory => "Zadovoljavajuće",
        }
    }
}

/// Normalize "VERY-GOOD", "very good", "veryGood" and friends to one key
fn enum_key(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl std::str::FromStr for Condition {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match enum_key(s).as_str() {
            "new" => Ok(Condition::New),
            "verygood" => Ok(Condition::VeryGood),
            "good" => Ok(Condition::Good),
            "satisfactory" => Ok(Condition::Satisfactory),
            _ => Err(anyhow!(
                "Invalid condition '{s}'. Valid options: new, very_good, good, satisfactory"
            )),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Size {
    #[serde(rename = "XS")]
    Xs,
    #[serde(rename = "S")]
    S,
    #[serde(rename = "M")]
    M,
    #[serde(rename = "L")]
    L,
    #[serde(rename = "XL")]
    Xl,
    #[serde(rename = "XXL")]
    Xxl,
    #[serde(rename = "ONE_SIZE")]
    OneSize,
}

impl Size {
    pub const ALL: [Size; 7] = [
        Size::Xs,
        Size::S,
        Size::M,
        Size::L,
        Size::Xl,
        Size::Xxl,
        Size::OneSize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Size::Xs => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Xxl => "XXL",
            Size::OneSize => "ONE_SIZE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Size::OneSize => "Univerzalna",
            other => other.as_str(),
        }
    }
}

impl std::str::FromStr for Size {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match enum_key(s).as_str() {
            "xs" => Ok(Size::Xs),
            "s" => Ok(Size::S),
            "m" => Ok(Size::M),
            "l" => Ok(Size::L),
            "xl" => Ok(Size::Xl),
            "xxl" => Ok(Size::Xxl),
            "onesize" | "univerzalna" => Ok(Size::OneSize),
            _ => Err(anyhow!("Invalid size '{s}'")),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Listing availability. A single value, so "sold" and "reserved" can never
/// both be set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    Reserved,
    Sold,
}

impl Availability {
    pub fn badge(self) -> Option<&'static str> {
        match self {
            Availability::Available => None,
            Availability::Reserved => Some("Rezervisano"),
            Availability::Sold => Some("Prodato"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Brand {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    /// 0.0..=5.0 when present
    pub rating: Option<f32>,
    pub review_count: u32,
    pub items_sold: u32,
    pub response_time: Option<String>,
    pub member_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Whole dinars
    pub price: u64,
    pub images: Vec<String>,
    pub condition: Condition,
    pub size: Size,
    pub brand: Option<Brand>,
    pub category: String,
    pub location: String,
    pub seller: User,
    pub created_at: DateTime<Utc>,
    pub availability: Availability,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Review categories, always all three present in a summary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReviewCategory {
    Accuracy,
    Communication,
    Shipping,
}

impl ReviewCategory {
    pub const ALL: [ReviewCategory; 3] = [
        ReviewCategory::Accuracy,
        ReviewCategory::Communication,
        ReviewCategory::Shipping,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReviewCategory::Accuracy => "Tačnost opisa",
            ReviewCategory::Communication => "Komunikacija",
            ReviewCategory::Shipping => "Brzina slanja",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRatings {
    pub accuracy: f32,
    pub communication: f32,
    pub shipping: f32,
}

impl CategoryRatings {
    pub fn get(&self, cat: ReviewCategory) -> f32 {
        match cat {
            ReviewCategory::Accuracy => self.accuracy,
            ReviewCategory::Communication => self.communication,
            ReviewCategory::Shipping => self.shipping,
        }
    }
}

/// Aggregate computed upstream; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub average_rating: f32,
    pub total_reviews: u32,
    pub breakdown: CategoryRatings,
    pub recommendation_percentage: u8,
    #[serde(default)]
    pub highlights: Vec<String>,
}
