//! Database module with SQLite storage and SQLx.

use std::str::FromStr;
use std::time::Duration;

use log::debug;
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqliteJournalMode;

use crate::repository::error::DatabaseError;
use crate::repository::table::ArticleTable;
use crate::repository::table::FollowTable;
use crate::repository::table::TableBase;
use crate::repository::table::UserTable;

pub mod error;
pub mod table;

/// Main database struct containing all table handlers.
pub struct Repository {
    pool: SqlitePool,
    pub user: UserTable,
    pub article: ArticleTable,
    pub follow: FollowTable,
}

impl Repository {
    /// Creates a new database connection and initializes table handlers.
    pub async fn new(db_url: &str, db_path: &str) -> anyhow::Result<Self> {
        let path = std::path::Path::new(db_path);
        if !path.exists() {
            debug!("Database path {db_path} does not exist. Creating...");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
            info!("Created {db_path}");
        }

        debug!("Connecting to db...");
        let opts = SqliteConnectOptions::from_str(db_url)?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePool::connect_with(opts).await?;
        info!("Connected to db.");

        Ok(Self {
            user: UserTable::new(pool.clone()),
            article: ArticleTable::new(pool.clone()),
            follow: FollowTable::new(pool.clone()),
            pool,
        })
    }

    /// Runs database migrations from the migrations directory.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Deletes all data from all tables. Use with caution!
    pub async fn delete_all_tables(&self) -> Result<(), DatabaseError> {
        self.follow.delete_all().await?;
        self.article.delete_all().await?;
        self.user.delete_all().await?;
        Ok(())
    }
}
