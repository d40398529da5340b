//! SQLite implementation of the fulfillment database traits.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
