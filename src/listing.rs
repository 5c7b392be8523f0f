//! Home page listing: fetched products + the shopper's filter selection +
//! grid settings, composed into what the page draws.
//!
//! Fetches are sequenced: every fetch takes a [`Ticket`] and only the most
//! recently issued ticket may replace the product set, so a slow response
//! to an old filter can't overwrite a newer one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::{ApiError, ProductQuery};
use crate::avatar::{display_name, get_user_avatar_data, AvatarData, AvatarInput};
use crate::filter::{FilterChip, FilterKey, FilterPanel, FilterSelection, PanelAction};
use crate::models::{Availability, Brand, Product, Size};
use crate::normalize;
use crate::types::{Page, RawProduct};
use crate::util_text::{format_price, format_relative_time};

pub const DEFAULT_COLUMNS: u8 = 4;
pub const MIN_COLUMNS: u8 = 2;
pub const MAX_COLUMNS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Hands out increasing tickets; shareable between tasks
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn next(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewMode {
    Grid { columns: u8 },
    List,
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::Grid {
            columns: DEFAULT_COLUMNS,
        }
    }
}

impl ViewMode {
    pub fn grid(columns: u8) -> ViewMode {
        ViewMode::Grid {
            columns: columns.clamp(MIN_COLUMNS, MAX_COLUMNS),
        }
    }
}

/// Everything a shopper can do to the home listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeAction {
    ToggleSize(Size),
    ToggleBrand(String),
    SetMinPrice(Option<u64>),
    SetMaxPrice(Option<u64>),
    ClearKey(FilterKey),
    ClearFilters,
    RemoveChip(FilterChip),
    Panel(PanelAction),
    SetView(ViewMode),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    pub id: String,
    pub href: String,
    pub title: String,
    pub price_label: String,
    pub image: Option<String>,
    pub condition: &'static str,
    pub size: &'static str,
    pub brand: Option<String>,
    pub location: String,
    pub seller_id: String,
    pub seller_name: String,
    pub seller_avatar: AvatarData,
    pub posted: String,
    pub badge: Option<&'static str>,
}

impl ProductCard {
    pub fn from_product(p: &Product, now: DateTime<Utc>) -> ProductCard {
        ProductCard {
            id: p.id.clone(),
            href: format!("/product/{}", urlencoding::encode(&p.id)),
            title: p.title.clone(),
            price_label: format_price(p.price),
            image: p.cover_image().map(str::to_string),
            condition: p.condition.label(),
            size: p.size.label(),
            brand: p.brand.as_ref().map(|b| b.name.clone()),
            location: p.location.clone(),
            seller_id: p.seller.id.clone(),
            seller_name: display_name(&p.seller),
            seller_avatar: get_user_avatar_data(&AvatarInput::from(&p.seller)),
            posted: format_relative_time(p.created_at, now),
            badge: p.availability.badge(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub cards: Vec<ProductCard>,
    pub chips: Vec<FilterChip>,
    pub active_filters: usize,
    /// Price constraint summary for the filter panel ("od 1.000 RSD")
    pub price_range: Option<String>,
    pub query_string: String,
    pub shown: usize,
    pub fetched: usize,
    pub total: Option<u64>,
    pub view: ViewMode,
    pub panel_open: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub empty_message: Option<&'static str>,
}

#[derive(Debug, Default)]
pub struct HomeContent {
    products: Vec<Product>,
    total: Option<u64>,
    filters: FilterSelection,
    panel: FilterPanel,
    view: ViewMode,
    brand_names: HashMap<String, String>,
    sequencer: RequestSequencer,
    loading: bool,
    error: Option<String>,
}

impl HomeContent {
    pub fn new(filters: FilterSelection) -> Self {
        HomeContent {
            filters,
            ..HomeContent::default()
        }
    }

    /// Seed with the page the server fetched before first render
    pub fn prime(mut self, page: Page<RawProduct>) -> Self {
        self.set_page(page);
        self
    }

    pub fn filters(&self) -> &FilterSelection {
        &self.filters
    }

    pub fn panel(&self) -> FilterPanel {
        self.panel
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn set_brands(&mut self, brands: &[Brand]) {
        self.brand_names = brands
            .iter()
            .map(|b| (b.id.to_lowercase(), b.name.clone()))
            .collect();
    }

    /// Apply a shopper action. Returns true when the product query changed
    /// and a refetch is due.
    pub fn dispatch(&mut self, action: HomeAction) -> bool {
        let before = self.filters.clone();
        match action {
            HomeAction::ToggleSize(size) => self.filters.toggle_size(size),
            HomeAction::ToggleBrand(brand) => self.filters.toggle_brand(&brand),
            HomeAction::SetMinPrice(p) => self.filters.set_min_price(p),
            HomeAction::SetMaxPrice(p) => self.filters.set_max_price(p),
            HomeAction::ClearKey(key) => self.filters.clear_key(key),
            HomeAction::ClearFilters => self.filters.clear(),
            HomeAction::RemoveChip(chip) => self.filters.remove_chip(&chip),
            HomeAction::Panel(a) => self.panel.dispatch(a),
            HomeAction::SetView(ViewMode::Grid { columns }) => self.view = ViewMode::grid(columns),
            HomeAction::SetView(ViewMode::List) => self.view = ViewMode::List,
        }
        self.filters != before
    }

    /// Backend query for the current selection
    pub fn query(&self, base: &ProductQuery) -> ProductQuery {
        ProductQuery {
            filters: self.filters.clone(),
            ..base.clone()
        }
    }

    pub fn begin_fetch(&mut self) -> Ticket {
        self.loading = true;
        self.sequencer.next()
    }

    /// Apply a fetched page if it answers the latest fetch. Returns false
    /// (and changes nothing) for superseded responses.
    pub fn apply_page(&mut self, ticket: Ticket, page: Page<RawProduct>) -> bool {
        if !self.sequencer.is_current(ticket) {
            log::debug!("[listing] dropping stale page for ticket {}", ticket.0);
            return false;
        }
        self.set_page(page);
        true
    }

    pub fn apply_error(&mut self, ticket: Ticket, err: &ApiError) -> bool {
        if !self.sequencer.is_current(ticket) {
            return false;
        }
        self.loading = false;
        self.error = Some(err.user_message());
        true
    }

    fn set_page(&mut self, page: Page<RawProduct>) {
        self.products = page.items.iter().map(normalize::product).collect();
        self.total = page.total;
        self.loading = false;
        self.error = None;
    }

    pub fn compose(&self, now: DateTime<Utc>) -> ListingView {
        let cards: Vec<ProductCard> = self
            .products
            .iter()
            .filter(|p| p.availability != Availability::Sold)
            .filter(|p| self.filters.matches(p))
            .map(|p| ProductCard::from_product(p, now))
            .collect();

        let empty_message = if !cards.is_empty() || self.loading {
            None
        } else if self.filters.is_empty() {
            Some("Trenutno nema oglasa.")
        } else {
            Some("Nema oglasa koji odgovaraju izabranim filterima.")
        };

        ListingView {
            shown: cards.len(),
            fetched: self.products.len(),
            chips: self
                .filters
                .chips(|key| self.brand_names.get(key).map(String::as_str)),
            active_filters: self.filters.active_count(),
            price_range: self.filters.price_label(),
            query_string: self.filters.to_query_string(),
            total: self.total,
            view: self.view,
            panel_open: self.panel.open,
            loading: self.loading,
            error: self.error.clone(),
            empty_message,
            cards,
        }
    }
}
