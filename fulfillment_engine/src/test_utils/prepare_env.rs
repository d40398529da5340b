use std::path::Path;

use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Drops, recreates and migrates the database at `url`, leaving an empty store behind. Tests call
/// this once per case, usually with a throwaway path from [`random_db_path`].
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    run_migrations(url).await;
    debug!("🚀️ Test database ready at {url}");
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/mvd_test_{}.db", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error connecting to the test database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running migrations");
    db.close().await;
}

/// The `data/` directory is not checked in, so it is created on first use.
pub async fn create_database(url: &str) {
    if let Some(dir) = url.strip_prefix("sqlite://").map(Path::new).and_then(Path::parent) {
        let _ = std::fs::create_dir_all(dir);
    }
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("🚀️ Could not drop {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating the test database");
    info!("🚀️ Created fresh database at {url}");
}
