//! Product filter selection and the filter panel visibility flag.
//!
//! The selection is synchronized with the page URL through
//! [`FilterSelection::to_query_string`] / [`FilterSelection::from_query`].
//! An empty constraint set and a missing key are the same state: the
//! sets below simply have no "present but empty" representation.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{Product, Size};
use crate::util_text::{format_price, format_price_range};

pub const KEY_SIZES: &str = "sizes";
pub const KEY_BRANDS: &str = "brands";
pub const KEY_MIN_PRICE: &str = "minPrice";
pub const KEY_MAX_PRICE: &str = "maxPrice";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterKey {
    Sizes,
    Brands,
    MinPrice,
    MaxPrice,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    sizes: BTreeSet<Size>,
    /// Brand ids (or lowercased names when the backend sent no id)
    brands: BTreeSet<String>,
    min_price: Option<u64>,
    max_price: Option<u64>,
}

/// One removable label per active constraint value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterChip {
    Size { size: Size, label: String },
    Brand { brand: String, label: String },
    MinPrice { label: String },
    MaxPrice { label: String },
}

impl FilterChip {
    pub fn label(&self) -> &str {
        match self {
            FilterChip::Size { label, .. }
            | FilterChip::Brand { label, .. }
            | FilterChip::MinPrice { label }
            | FilterChip::MaxPrice { label } => label,
        }
    }
}

impl FilterSelection {
    pub fn sizes(&self) -> impl Iterator<Item = Size> + '_ {
        self.sizes.iter().copied()
    }

    pub fn brands(&self) -> impl Iterator<Item = &str> + '_ {
        self.brands.iter().map(String::as_str)
    }

    pub fn min_price(&self) -> Option<u64> {
        self.min_price
    }

    pub fn max_price(&self) -> Option<u64> {
        self.max_price
    }

    pub fn has_size(&self, size: Size) -> bool {
        self.sizes.contains(&size)
    }

    pub fn has_brand(&self, brand: &str) -> bool {
        self.brands.contains(&brand_key(brand))
    }

    pub fn add_size(&mut self, size: Size) {
        self.sizes.insert(size);
    }

    pub fn remove_size(&mut self, size: Size) {
        self.sizes.remove(&size);
    }

    pub fn toggle_size(&mut self, size: Size) {
        if !self.sizes.remove(&size) {
            self.sizes.insert(size);
        }
    }

    pub fn add_brand(&mut self, brand: &str) {
        let key = brand_key(brand);
        if !key.is_empty() {
            self.brands.insert(key);
        }
    }

    pub fn remove_brand(&mut self, brand: &str) {
        self.brands.remove(&brand_key(brand));
    }

    pub fn toggle_brand(&mut self, brand: &str) {
        let key = brand_key(brand);
        if !self.brands.remove(&key) && !key.is_empty() {
            self.brands.insert(key);
        }
    }

    pub fn set_min_price(&mut self, price: Option<u64>) {
        self.min_price = price;
    }

    pub fn set_max_price(&mut self, price: Option<u64>) {
        self.max_price = price;
    }

    /// Back to "unconstrained" for one key only
    pub fn clear_key(&mut self, key: FilterKey) {
        match key {
            FilterKey::Sizes => self.sizes.clear(),
            FilterKey::Brands => self.brands.clear(),
            FilterKey::MinPrice => self.min_price = None,
            FilterKey::MaxPrice => self.max_price = None,
        }
    }

    pub fn clear(&mut self) {
        *self = FilterSelection::default();
    }

    pub fn is_set(&self, key: FilterKey) -> bool {
        match key {
            FilterKey::Sizes => !self.sizes.is_empty(),
            FilterKey::Brands => !self.brands.is_empty(),
            FilterKey::MinPrice => self.min_price.is_some(),
            FilterKey::MaxPrice => self.max_price.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
            && self.brands.is_empty()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    pub fn active_count(&self) -> usize {
        self.sizes.len()
            + self.brands.len()
            + usize::from(self.min_price.is_some())
            + usize::from(self.max_price.is_some())
    }

    /// Chips in display order. `brand_label` maps a stored brand key to a
    /// display name (falls back to the key itself).
    pub fn chips<'a>(&self, brand_label: impl Fn(&str) -> Option<&'a str>) -> Vec<FilterChip> {
        let mut chips: Vec<FilterChip> = self
            .sizes
            .iter()
            .map(|&size| FilterChip::Size {
                size,
                label: format!("Veličina: {}", size.label()),
            })
            .collect();
        chips.extend(self.brands.iter().map(|b| FilterChip::Brand {
            brand: b.clone(),
            label: brand_label(b)
                .map(str::to_string)
                .unwrap_or_else(|| b.clone()),
        }));
        if let Some(min) = self.min_price {
            chips.push(FilterChip::MinPrice {
                label: format!("Od {}", format_price(min)),
            });
        }
        if let Some(max) = self.max_price {
            chips.push(FilterChip::MaxPrice {
                label: format!("Do {}", format_price(max)),
            });
        }
        chips
    }

    /// Remove exactly the constraint a chip stands for
    pub fn remove_chip(&mut self, chip: &FilterChip) {
        match chip {
            FilterChip::Size { size, .. } => self.remove_size(*size),
            FilterChip::Brand { brand, .. } => self.remove_brand(brand),
            FilterChip::MinPrice { .. } => self.clear_key(FilterKey::MinPrice),
            FilterChip::MaxPrice { .. } => self.clear_key(FilterKey::MaxPrice),
        }
    }

    pub fn price_label(&self) -> Option<String> {
        format_price_range(self.min_price, self.max_price)
    }

    pub fn matches(&self, product: &Product) -> bool {
        if !self.sizes.is_empty() && !self.sizes.contains(&product.size) {
            return false;
        }
        if !self.brands.is_empty() {
            let hit = product.brand.as_ref().is_some_and(|b| {
                self.brands.contains(&brand_key(&b.id)) || self.brands.contains(&brand_key(&b.name))
            });
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Query-string pairs, only for keys that are set, in a stable order.
    /// Sizes share one comma-joined value; each brand gets its own pair since
    /// brand names may contain commas.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.sizes.is_empty() {
            let v: Vec<&str> = self.sizes.iter().map(|s| s.as_str()).collect();
            pairs.push((KEY_SIZES, v.join(",")));
        }
        pairs.extend(self.brands.iter().map(|b| (KEY_BRANDS, b.clone())));
        if let Some(min) = self.min_price {
            pairs.push((KEY_MIN_PRICE, min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push((KEY_MAX_PRICE, max.to_string()));
        }
        pairs
    }

    /// `sizes=M,L&brands=nike&brands=zara&minPrice=100` (empty when unconstrained)
    pub fn to_query_string(&self) -> String {
        self.to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse a query string (leading `?` allowed, `+` is a space). Unknown
    /// keys and values that don't parse are ignored; a repeated key adds to
    /// the set.
    pub fn from_query(qs: &str) -> Self {
        let mut f = FilterSelection::default();
        for kv in qs.trim_start_matches('?').split('&') {
            let mut it = kv.splitn(2, '=');
            let k = it.next().unwrap_or_default().trim();
            let v = it.next().unwrap_or_default().replace('+', " ");
            let v = urlencoding::decode(&v)
                .map(|c| c.into_owned())
                .unwrap_or(v);
            match k {
                KEY_SIZES | "size" => {
                    for s in v.split(',') {
                        if let Ok(size) = s.parse::<Size>() {
                            f.add_size(size);
                        }
                    }
                }
                KEY_BRANDS | "brand" => f.add_brand(&v),
                KEY_MIN_PRICE => f.min_price = v.trim().parse().ok(),
                KEY_MAX_PRICE => f.max_price = v.trim().parse().ok(),
                _ => {}
            }
        }
        f
    }
}

fn brand_key(brand: &str) -> String {
    brand.trim().to_lowercase()
}

/// Visibility of the modal filter panel; deliberately separate from the
/// selection itself.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterPanel {
    pub open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    Toggle,
    Open,
    Close,
}

impl FilterPanel {
    pub fn reduce(self, action: PanelAction) -> FilterPanel {
        let open = match action {
            PanelAction::Toggle => !self.open,
            PanelAction::Open => true,
            PanelAction::Close => false,
        };
        FilterPanel { open }
    }

    pub fn dispatch(&mut self, action: PanelAction) {
        *self = self.reduce(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, Brand, Condition, User};
    use chrono::Utc;
    use proptest::prelude::*;

    fn product(size: Size, brand: Option<(&str, &str)>, price: u64) -> Product {
        Product {
            id: "p".into(),
            title: "t".into(),
            description: None,
            price,
            images: vec!["i.jpg".into()],
            condition: Condition::Good,
            size,
            brand: brand.map(|(id, name)| Brand {
                id: id.into(),
                name: name.into(),
            }),
            category: "c".into(),
            location: "BG".into(),
            seller: User {
                id: "s".into(),
                email: "s@x.rs".into(),
                first_name: None,
                last_name: None,
                avatar: None,
                rating: None,
                review_count: 0,
                items_sold: 0,
                response_time: None,
                member_since: None,
            },
            created_at: Utc::now(),
            availability: Availability::Available,
        }
    }

    fn sample() -> FilterSelection {
        let mut f = FilterSelection::default();
        f.add_size(Size::M);
        f.add_size(Size::L);
        f.add_brand("Nike");
        f.set_min_price(Some(1000));
        f.set_max_price(Some(5000));
        f
    }

    #[test]
    fn sets_have_no_duplicates() {
        let mut f = FilterSelection::default();
        f.add_size(Size::M);
        f.add_size(Size::M);
        f.add_brand("nike");
        f.add_brand(" NIKE ");
        assert_eq!(f.active_count(), 2);
    }

    #[test]
    fn removing_last_value_means_unconstrained() {
        let mut f = FilterSelection::default();
        f.add_size(Size::S);
        f.remove_size(Size::S);
        assert!(!f.is_set(FilterKey::Sizes));
        assert!(f.is_empty());
        assert_eq!(f, FilterSelection::default());
        assert_eq!(f.to_query_string(), "");
    }

    #[test]
    fn chip_removal_touches_only_its_value() {
        let mut f = sample();
        let chips = f.chips(|_| None);
        assert_eq!(chips.len(), 5);

        let min_chip = chips
            .iter()
            .find(|c| matches!(c, FilterChip::MinPrice { .. }))
            .unwrap();
        f.remove_chip(min_chip);
        assert_eq!(f.min_price(), None);
        assert_eq!(f.max_price(), Some(5000));
        assert!(f.has_size(Size::M) && f.has_size(Size::L));
        assert!(f.has_brand("nike"));

        let size_chip = FilterChip::Size {
            size: Size::M,
            label: String::new(),
        };
        f.remove_chip(&size_chip);
        assert!(!f.has_size(Size::M));
        assert!(f.has_size(Size::L));
        assert_eq!(f.active_count(), 3);
    }

    #[test]
    fn chip_labels() {
        let f = sample();
        let labels: Vec<String> = f
            .chips(|b| (b == "nike").then_some("Nike"))
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Veličina: M",
                "Veličina: L",
                "Nike",
                "Od 1.000 RSD",
                "Do 5.000 RSD"
            ]
        );
    }

    #[test]
    fn query_string_shape() {
        assert_eq!(
            sample().to_query_string(),
            "sizes=M%2CL&brands=nike&minPrice=1000&maxPrice=5000"
        );

        let mut f = FilterSelection::default();
        f.add_brand("Zara");
        f.add_brand("Dolce, Gabbana");
        assert_eq!(f.to_query_string(), "brands=dolce%2C%20gabbana&brands=zara");
    }

    #[test]
    fn brand_names_survive_the_url() {
        let mut f = FilterSelection::default();
        f.add_brand("Dolce, Gabbana");
        f.add_brand("A&B=C");
        let back = FilterSelection::from_query(&f.to_query_string());
        assert_eq!(back, f);
        assert!(back.has_brand("dolce, gabbana"));

        // browser form encoding
        let f = FilterSelection::from_query("brands=new+balance&brands=nike");
        assert_eq!(f.brands().collect::<Vec<_>>(), vec!["new balance", "nike"]);
        assert!(FilterSelection::from_query("brands=c%2B%2B").has_brand("c++"));
    }

    #[test]
    fn parse_ignores_garbage() {
        let f = FilterSelection::from_query("?sizes=M,huge,&brands=&minPrice=abc&foo=bar&maxPrice=300");
        assert!(f.has_size(Size::M));
        assert_eq!(f.sizes().count(), 1);
        assert!(!f.is_set(FilterKey::Brands));
        assert_eq!(f.min_price(), None);
        assert_eq!(f.max_price(), Some(300));
    }

    #[test]
    fn matching_applies_every_constraint() {
        let f = sample();
        assert!(f.matches(&product(Size::M, Some(("b1", "Nike")), 2000)));
        assert!(f.matches(&product(Size::L, Some(("nike", "Nike Inc")), 1000)));
        assert!(!f.matches(&product(Size::S, Some(("b1", "Nike")), 2000)));
        assert!(!f.matches(&product(Size::M, Some(("b2", "Zara")), 2000)));
        assert!(!f.matches(&product(Size::M, None, 2000)));
        assert!(!f.matches(&product(Size::M, Some(("b1", "Nike")), 999)));
        assert!(!f.matches(&product(Size::M, Some(("b1", "Nike")), 5001)));
        assert!(FilterSelection::default().matches(&product(Size::Xs, None, 0)));
    }

    #[test]
    fn panel_reducer() {
        let p = FilterPanel::default();
        assert!(!p.open);
        let p = p.reduce(PanelAction::Toggle);
        assert!(p.open);
        assert!(p.reduce(PanelAction::Open).open);
        assert!(!p.reduce(PanelAction::Toggle).open);
        let mut p = p;
        p.dispatch(PanelAction::Close);
        assert!(!p.open);
    }

    proptest! {
        #[test]
        fn clearing_one_key_leaves_others(min in 0u64..10_000, max in 0u64..10_000, drop_min in any::<bool>()) {
            let mut f = sample();
            f.set_min_price(Some(min));
            f.set_max_price(Some(max));
            let before = f.clone();
            let key = if drop_min { FilterKey::MinPrice } else { FilterKey::MaxPrice };
            f.clear_key(key);
            prop_assert!(!f.is_set(key));
            prop_assert_eq!(f.sizes().collect::<Vec<_>>(), before.sizes().collect::<Vec<_>>());
            prop_assert_eq!(f.brands().collect::<Vec<_>>(), before.brands().collect::<Vec<_>>());
            if drop_min {
                prop_assert_eq!(f.max_price(), Some(max));
            } else {
                prop_assert_eq!(f.min_price(), Some(min));
            }
        }

        #[test]
        fn query_string_restores_selection(
            sizes in proptest::collection::vec(0usize..7, 0..4),
            brands in proptest::collection::vec("[a-zA-Zčš ,+&=%]{1,8}", 0..4),
            min in proptest::option::of(0u64..100_000),
            max in proptest::option::of(0u64..100_000),
        ) {
            let mut f = FilterSelection::default();
            for i in sizes { f.add_size(Size::ALL[i]); }
            for b in &brands { f.add_brand(b); }
            f.set_min_price(min);
            f.set_max_price(max);
            prop_assert_eq!(FilterSelection::from_query(&f.to_query_string()), f);
        }
    }
}
