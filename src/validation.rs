//! Client-side form rules. A failing form is never sent to the backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{LoginRequest, RegisterRequest};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_NAME_LEN: usize = 50;
pub const TITLE_LEN: std::ops::RangeInclusive<usize> = 3..=80;
pub const PRICE_RANGE: std::ops::RangeInclusive<u64> = 1..=10_000_000;
pub const MAX_IMAGES: usize = 10;

/// Field name -> message shown under that field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("form has {} invalid field(s)", .fields.len())]
pub struct ValidationErrors {
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    fn add(&mut self, field: &'static str, msg: impl Into<String>) {
        // First failing rule per field wins
        self.fields.entry(field).or_insert_with(|| msg.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Deliberately loose: one `@`, something before it, a dot after it
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !email.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

fn check_email(errs: &mut ValidationErrors, email: &str) {
    if email.trim().is_empty() {
        errs.add("email", "Email je obavezan");
    } else if !is_valid_email(email) {
        errs.add("email", "Unesite ispravnu email adresu");
    }
}

pub fn validate_login(req: &LoginRequest) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();
    check_email(&mut errs, &req.email);
    if req.password.is_empty() {
        errs.add("password", "Lozinka je obavezna");
    }
    errs.into_result()
}

pub fn validate_register(req: &RegisterRequest, confirm: &str) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();
    check_email(&mut errs, &req.email);
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errs.add(
            "password",
            format!("Lozinka mora imati najmanje {MIN_PASSWORD_LEN} karaktera"),
        );
    }
    if req.password != confirm {
        errs.add("confirmPassword", "Lozinke se ne poklapaju");
    }
    for (field, value) in [("firstName", &req.first_name), ("lastName", &req.last_name)] {
        if value.as_deref().is_some_and(|v| v.chars().count() > MAX_NAME_LEN) {
            errs.add(field, format!("Najviše {MAX_NAME_LEN} karaktera"));
        }
    }
    errs.into_result()
}

/// A listing as the seller is filling it in
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingDraft {
    pub title: String,
    pub price: Option<u64>,
    pub images: Vec<String>,
}

pub fn validate_listing(draft: &ListingDraft) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();
    let title_len = draft.title.trim().chars().count();
    if !TITLE_LEN.contains(&title_len) {
        errs.add(
            "title",
            format!(
                "Naziv mora imati od {} do {} karaktera",
                TITLE_LEN.start(),
                TITLE_LEN.end()
            ),
        );
    }
    match draft.price {
        None => errs.add("price", "Cena je obavezna"),
        Some(p) if !PRICE_RANGE.contains(&p) => errs.add("price", "Cena nije u dozvoljenom opsegu"),
        Some(_) => {}
    }
    if draft.images.is_empty() {
        errs.add("images", "Dodajte bar jednu fotografiju");
    } else if draft.images.len() > MAX_IMAGES {
        errs.add("images", format!("Najviše {MAX_IMAGES} fotografija"));
    }
    errs.into_result()
}
