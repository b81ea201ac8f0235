use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use utils::assets::asset_dir;

pub use sea_orm::{ConnectionTrait, DbErr, TransactionTrait};

pub mod entities;
pub mod models;
pub mod types;

pub type DbPool = DatabaseConnection;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

/// `DATABASE_URL` when set, otherwise the named file inside the asset dir.
pub fn database_url(database_file: &str) -> String {
    match std::env::var(DATABASE_URL_ENV) {
        Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => format!(
            "sqlite://{}?mode=rwc",
            asset_dir().join(database_file).to_string_lossy()
        ),
    }
}

impl DBService {
    pub async fn new(database_file: &str) -> Result<DBService, DbErr> {
        Self::connect(&database_url(database_file)).await
    }

    /// Opens the pool and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .connect_timeout(Duration::from_secs(30))
            .sqlx_logging(false);
        let pool = Database::connect(options).await?;

        if !database_url.contains(":memory:") {
            pool.execute_unprepared("PRAGMA journal_mode = WAL;").await?;
            pool.execute_unprepared("PRAGMA synchronous = NORMAL;")
                .await?;
            pool.execute_unprepared("PRAGMA busy_timeout = 30000;")
                .await?;
        }

        db_migration::Migrator::up(&pool, None).await?;
        tracing::debug!("Database ready at {}", database_url);
        Ok(DBService { pool })
    }
}
