//! Vitrina - second-hand fashion marketplace frontend core
//!
//! This library holds the view-model side of the marketplace: everything
//! between the backend API and what a page draws.
//!
//! ## Architecture
//!
//! Data flows API -> normalization -> filters + listing composition -> view
//! model. The auth session is orthogonal and gates guarded actions.
//!
//! - **Leaves**: formatting (`util_text`), avatars (`avatar`), form rules (`validation`)
//! - **Data**: raw backend records (`types`), display entities (`models`), `normalize`
//! - **State**: filter selection (`filter`), home listing (`listing`), auth session (`auth`)
//! - **I/O**: HTTP client (`api`), read-model cache (`query`)
//! - **Server** (feature `server`): axum app serving page view models as JSON
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin vitrina-server -- --api-url http://localhost:4000/api
//! ```

// Formatting and pure helpers
pub mod avatar;
pub mod combobox;
pub mod util_text;
pub mod validation;

// Data model
pub mod models;
pub mod normalize;
pub mod types;

// State containers
pub mod auth;
pub mod filter;
pub mod listing;
pub mod reviews;

// Backend access
pub mod api;
pub mod query;

// Routing and configuration
pub mod config;
pub mod router;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, ProductQuery};
pub use auth::{AuthSession, AuthState};
pub use config::Config;
pub use filter::FilterSelection;
pub use listing::HomeContent;
pub use models::{Product, User};
