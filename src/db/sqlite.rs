use crate::config::DatabaseConfig;
use crate::db::dao::DataAccessObject;
use crate::db::schema::VERSIONS_INIT;
use crate::error::RaccoonError;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Connection, Pool, Sqlite, SqliteConnection};
use std::str::FromStr;
use tracing::{debug, info, trace};

pub type SqlitePool = Pool<Sqlite>;

/// Connection manager shared by all DAOs: owns the pool and the
/// per-DAO schema version registry.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(cfg: &DatabaseConfig) -> Result<Self, RaccoonError> {
        let connect_opts = SqliteConnectOptions::from_str(&cfg.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(cfg.busy_timeout());

        // Every connection to `:memory:` is its own database; pin a single one.
        let in_memory = cfg.url.contains(":memory:");
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(cfg.max_connections)
        };
        let pool = pool_opts.connect_with(connect_opts).await?;

        info!(
            url = %cfg.url,
            max_connections = pool.options().get_max_connections(),
            "database opened"
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire one pooled connection. Dropping the guard hands it back to the
    /// pool, on success and error paths alike.
    pub async fn connect(&self) -> Result<PoolConnection<Sqlite>, RaccoonError> {
        let conn = self.pool.acquire().await?;
        trace!(
            idle = self.pool.num_idle(),
            size = self.pool.size(),
            "connection acquired"
        );
        Ok(conn)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Stored schema version of a DAO; 0 when it was never upgraded.
    pub async fn version_of(&self, dao: &str) -> Result<i64, RaccoonError> {
        let mut conn = self.connect().await?;
        sqlx::query(VERSIONS_INIT).execute(&mut *conn).await?;
        stored_version(&mut conn, dao).await
    }

    pub async fn has_table(&self, table: &str) -> Result<bool, RaccoonError> {
        let mut conn = self.connect().await?;
        table_exists(&mut conn, table).await
    }

    /// Bring the tables of `D` up to `D::version()`, applying each pending
    /// migration in its own transaction. Returns the resulting version.
    pub async fn upgrade<D: DataAccessObject>(&self) -> Result<i64, RaccoonError> {
        let mut conn = self.connect().await?;
        sqlx::query(VERSIONS_INIT).execute(&mut *conn).await?;

        let stored = stored_version(&mut conn, D::NAME).await?;
        let latest = D::version();
        if stored > latest {
            return Err(RaccoonError::SchemaTooNew {
                dao: D::NAME,
                stored,
                supported: latest,
            });
        }
        if stored == latest {
            debug!(dao = D::NAME, version = stored, "schema up to date");
            return Ok(stored);
        }

        for &table in D::REQUIRES {
            if !table_exists(&mut conn, table).await? {
                return Err(RaccoonError::MissingTable {
                    dao: D::NAME,
                    table,
                });
            }
        }

        let mut current = stored;
        for migration in D::pending(stored) {
            // Take the write lock before re-reading: a concurrent upgrade may
            // have applied this step since the version was read above.
            let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;
            let applied = stored_version(&mut tx, D::NAME).await?;
            if applied >= migration.version {
                tx.rollback().await?;
                debug!(
                    dao = D::NAME,
                    version = migration.version,
                    "schema migration already applied"
                );
                current = applied;
                continue;
            }

            for &stmt in migration.statements {
                sqlx::query(stmt).execute(&mut *tx).await?;
            }
            sqlx::query(
                r#"INSERT INTO versions (dao, version) VALUES (?, ?)
                   ON CONFLICT(dao) DO UPDATE SET version = excluded.version"#,
            )
            .bind(D::NAME)
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            info!(
                dao = D::NAME,
                from = current,
                version = migration.version,
                "schema migration applied"
            );
            current = migration.version;
        }
        Ok(current)
    }
}

async fn stored_version(conn: &mut SqliteConnection, dao: &str) -> Result<i64, RaccoonError> {
    let rec: Option<(i64,)> = sqlx::query_as("SELECT version FROM versions WHERE dao = ?")
        .bind(dao)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(rec.map(|r| r.0).unwrap_or(0))
}

async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool, RaccoonError> {
    let rec: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(&mut *conn)
            .await?;
    Ok(rec.0 > 0)
}
