//! # Low-level SQLite queries
//!
//! One submodule per storage area, each a set of plain functions over a `&mut SqliteConnection`.
//! Callers hand in a pooled connection or an open transaction; the functions themselves never begin
//! or commit anything, so composing them into one atomic unit is the caller's choice.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod addresses;
pub mod audit;
pub mod carts;
pub mod drivers;
pub mod legs;
pub mod orders;
pub mod products;
pub mod rates;
pub mod returns;
pub mod vendors;

const SQLITE_DB_URL: &str = "sqlite://data/mvd_store.db";

pub fn db_url() -> String {
    let url = env::var("MVD_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ MVD_DATABASE_URL is not set, falling back to {SQLITE_DB_URL}");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Connecting to database at {url}");
    url
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    SqlitePoolOptions::new().max_connections(max_connections).connect(url).await
}
