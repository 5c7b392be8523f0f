//! Seller review summary, prepared for display. The aggregate itself is
//! computed upstream; this only formats it.

use serde::Serialize;

use crate::models::{ReviewCategory, ReviewSummary};
use crate::util_text::{format_decimal_1, plural_sr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stars {
    pub full: u8,
    pub half: bool,
    pub empty: u8,
}

impl Stars {
    /// Rounded to the nearest half star, out of five
    pub fn from_rating(rating: f32) -> Stars {
        let halves = (clamp_rating(rating) * 2.0).round() as u8;
        let full = halves / 2;
        let half = halves % 2 == 1;
        Stars {
            full,
            half,
            empty: 5 - full - u8::from(half),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub category: ReviewCategory,
    pub label: &'static str,
    pub value: String,
    /// Bar width, 0..=100
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummaryView {
    pub average: String,
    pub stars: Stars,
    pub count_label: String,
    pub breakdown: Vec<BreakdownRow>,
    pub recommendation: String,
    /// `None` when there is nothing to highlight; the section is not drawn
    pub highlights: Option<Vec<String>>,
}

fn clamp_rating(r: f32) -> f32 {
    if r.is_finite() {
        r.clamp(0.0, 5.0)
    } else {
        0.0
    }
}

pub fn count_label(total: u32) -> String {
    let n = u64::from(total);
    format!("{total} {}", plural_sr(n, "recenzija", "recenzije", "recenzija"))
}

impl From<&ReviewSummary> for ReviewSummaryView {
    fn from(s: &ReviewSummary) -> Self {
        let average = clamp_rating(s.average_rating);
        let breakdown = ReviewCategory::ALL
            .iter()
            .map(|&category| {
                let v = clamp_rating(s.breakdown.get(category));
                BreakdownRow {
                    category,
                    label: category.label(),
                    value: format_decimal_1(f64::from(v)),
                    percent: (v / 5.0 * 100.0).round() as u8,
                }
            })
            .collect();

        let highlights: Vec<String> = s
            .highlights
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();

        ReviewSummaryView {
            average: format_decimal_1(f64::from(average)),
            stars: Stars::from_rating(average),
            count_label: count_label(s.total_reviews),
            breakdown,
            recommendation: format!(
                "{}% kupaca preporučuje ovog prodavca",
                s.recommendation_percentage.min(100)
            ),
            highlights: (!highlights.is_empty()).then_some(highlights),
        }
    }
}
