//! Marketplace frontend server
//!
//! ## Usage
//! ```bash
//! cargo run --bin vitrina-server -- --port 3000 --api-url http://localhost:4000/api
//! ```

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables win
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {e}");
        }
    }

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = vitrina::config::load()?;

    log::info!("🛍️  Vitrina v{}", env!("CARGO_PKG_VERSION"));
    config.print_summary();

    vitrina::server::serve(config).await
}
