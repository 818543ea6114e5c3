use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Database id of an application row in `androidapps`.
pub type AppId = i64;

/// Database id of a group; `0` until the group has been inserted.
pub type GroupId = i64;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct AppGroup {
    pub gid: GroupId,
    pub name: String,
}

impl AppGroup {
    /// A group that has not been persisted yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            gid: 0,
            name: name.into(),
        }
    }

    pub fn with_id(gid: GroupId, name: impl Into<String>) -> Self {
        Self {
            gid,
            name: name.into(),
        }
    }
}

impl fmt::Display for AppGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
