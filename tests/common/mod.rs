#![allow(dead_code)]

use raccoon_db::config::DatabaseConfig;
use raccoon_db::db::{AppGroupDao, DatabaseManager};
use sqlx::{Connection, SqliteConnection};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A throwaway SQLite file, removed on drop.
pub struct TestDb {
    pub path: PathBuf,
    pub manager: DatabaseManager,
}

impl TestDb {
    pub async fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let seq = COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut path = std::env::temp_dir();
        path.push(format!(
            "raccoon-db-test-{}-{}-{}.sqlite",
            std::process::id(),
            nanos,
            seq
        ));

        let manager = DatabaseManager::open(&config_for(&path))
            .await
            .expect("failed to open test database");
        Self { path, manager }
    }

    pub fn config(&self) -> DatabaseConfig {
        config_for(&self.path)
    }

    /// A connection outside the pool holding the database write lock until
    /// `COMMIT` is executed on it.
    pub async fn write_lock(&self) -> SqliteConnection {
        let mut conn = SqliteConnection::connect(&self.config().url)
            .await
            .expect("failed to open locking connection");
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut conn)
            .await
            .expect("failed to take write lock");
        conn
    }

    /// Pool connections currently checked out.
    pub fn connections_in_use(&self) -> u32 {
        let pool = self.manager.pool();
        pool.size() - pool.num_idle() as u32
    }

    /// Test database with the apps table the junction table points at.
    pub async fn with_apps() -> Self {
        let db = Self::new().await;
        sqlx::query("CREATE TABLE androidapps (aid INTEGER PRIMARY KEY, packagename TEXT NOT NULL)")
            .execute(db.manager.pool())
            .await
            .expect("failed to create androidapps");
        db
    }

    /// Fully migrated DAO on a fresh database.
    pub async fn dao() -> (Self, AppGroupDao) {
        let db = Self::with_apps().await;
        db.manager
            .upgrade::<AppGroupDao>()
            .await
            .expect("upgrade failed");
        let dao = AppGroupDao::new(db.manager.clone());
        (db, dao)
    }

    pub async fn add_app(&self, aid: i64, package: &str) {
        sqlx::query("INSERT INTO androidapps (aid, packagename) VALUES (?, ?)")
            .bind(aid)
            .bind(package)
            .execute(self.manager.pool())
            .await
            .expect("failed to insert app");
    }

    pub async fn junction_rows(&self) -> i64 {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM androidapps_appgroups")
            .fetch_one(self.manager.pool())
            .await
            .expect("failed to count junction rows");
        rec.0
    }
}

fn config_for(path: &Path) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite:{}", path.display()),
        ..DatabaseConfig::default()
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
