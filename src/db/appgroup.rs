use crate::db::dao::{DataAccessObject, Migration};
use crate::db::models::{AppGroup, AppId, GroupId};
use crate::db::schema::APPGROUPS_MIGRATIONS;
use crate::db::sqlite::DatabaseManager;
use crate::error::RaccoonError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Persists `AppGroup`s and their app memberships.
///
/// Clones share the update guard, so they count as one instance.
#[derive(Clone)]
pub struct AppGroupDao {
    manager: DatabaseManager,
    update_lock: Arc<Mutex<()>>,
}

impl DataAccessObject for AppGroupDao {
    const NAME: &'static str = "appgroups";
    const REQUIRES: &'static [&'static str] = &["androidapps"];

    fn migrations() -> &'static [Migration] {
        APPGROUPS_MIGRATIONS
    }
}

impl AppGroupDao {
    pub fn new(manager: DatabaseManager) -> Self {
        Self {
            manager,
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Insert a new group and store the generated id in `group.gid`.
    /// A duplicate name surfaces as a database error
    /// (see `RaccoonError::is_unique_violation`).
    pub async fn insert(&self, group: &mut AppGroup) -> Result<GroupId, RaccoonError> {
        let mut conn = self.manager.connect().await?;
        let done = sqlx::query("INSERT INTO appgroups (name) VALUES (?)")
            .bind(&group.name)
            .execute(&mut *conn)
            .await?;
        group.gid = done.last_insert_rowid();
        debug!(gid = group.gid, name = %group.name, "app group inserted");
        Ok(group.gid)
    }

    /// Rename the group with `group.gid`. Unknown ids are ignored.
    /// At most one update per instance runs at a time.
    pub async fn update(&self, group: &AppGroup) -> Result<(), RaccoonError> {
        let _guard = self.update_lock.lock().await;
        let mut conn = self.manager.connect().await?;
        let done = sqlx::query("UPDATE appgroups SET name = ? WHERE gid = ?")
            .bind(&group.name)
            .bind(group.gid)
            .execute(&mut *conn)
            .await?;
        if done.rows_affected() == 0 {
            warn!(gid = group.gid, "update matched no app group");
        } else {
            debug!(gid = group.gid, name = %group.name, "app group renamed");
        }
        Ok(())
    }

    /// Delete the group; memberships go with it through the cascade.
    pub async fn delete(&self, group: &AppGroup) -> Result<(), RaccoonError> {
        let mut conn = self.manager.connect().await?;
        let done = sqlx::query("DELETE FROM appgroups WHERE gid = ?")
            .bind(group.gid)
            .execute(&mut *conn)
            .await?;
        if done.rows_affected() == 0 {
            warn!(gid = group.gid, "delete matched no app group");
        } else {
            debug!(gid = group.gid, "app group deleted");
        }
        Ok(())
    }

    /// All groups, ordered by name.
    pub async fn list(&self) -> Result<Vec<AppGroup>, RaccoonError> {
        let mut conn = self.manager.connect().await?;
        let groups: Vec<AppGroup> =
            sqlx::query_as("SELECT gid, name FROM appgroups ORDER BY name ASC")
                .fetch_all(&mut *conn)
                .await?;
        debug!(count = groups.len(), "app groups listed");
        Ok(groups)
    }

    /// Add app `aid` to the group. Adding an existing member is a no-op.
    pub async fn link(&self, group: &AppGroup, aid: AppId) -> Result<(), RaccoonError> {
        let mut conn = self.manager.connect().await?;
        let done =
            sqlx::query("INSERT OR IGNORE INTO androidapps_appgroups (aid, gid) VALUES (?, ?)")
                .bind(aid)
                .bind(group.gid)
                .execute(&mut *conn)
                .await?;
        debug!(
            gid = group.gid,
            aid,
            added = done.rows_affected(),
            "app linked to group"
        );
        Ok(())
    }

    pub async fn unlink(&self, group: &AppGroup, aid: AppId) -> Result<(), RaccoonError> {
        let mut conn = self.manager.connect().await?;
        let done = sqlx::query("DELETE FROM androidapps_appgroups WHERE aid = ? AND gid = ?")
            .bind(aid)
            .bind(group.gid)
            .execute(&mut *conn)
            .await?;
        debug!(
            gid = group.gid,
            aid,
            removed = done.rows_affected(),
            "app unlinked from group"
        );
        Ok(())
    }

    /// Ids of the apps in the group, ascending.
    pub async fn members(&self, group: &AppGroup) -> Result<Vec<AppId>, RaccoonError> {
        let mut conn = self.manager.connect().await?;
        let rows: Vec<(AppId,)> =
            sqlx::query_as("SELECT aid FROM androidapps_appgroups WHERE gid = ? ORDER BY aid ASC")
                .bind(group.gid)
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Groups containing app `aid`, ordered by name.
    pub async fn groups_of(&self, aid: AppId) -> Result<Vec<AppGroup>, RaccoonError> {
        let mut conn = self.manager.connect().await?;
        let groups: Vec<AppGroup> = sqlx::query_as(
            r#"SELECT g.gid, g.name
               FROM appgroups g
               JOIN androidapps_appgroups j ON j.gid = g.gid
               WHERE j.aid = ?
               ORDER BY g.name ASC"#,
        )
        .bind(aid)
        .fetch_all(&mut *conn)
        .await?;
        Ok(groups)
    }
}
