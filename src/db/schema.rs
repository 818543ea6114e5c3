//! SQL DDL for the app group tables and the schema version registry.
//! SQLite-first design; the statements avoid SQLite-only syntax where possible.

use crate::db::dao::Migration;

/// Per-DAO schema versions. One row per DAO, keyed by `DataAccessObject::NAME`.
pub const VERSIONS_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS versions (
    dao TEXT NOT NULL PRIMARY KEY,
    version INTEGER NOT NULL
)
"#;

/// Version 1:
/// - `gid` INTEGER PRIMARY KEY AUTOINCREMENT (64-bit, never reused)
/// - `name` UNIQUE; SQLite ignores the VARCHAR length so it is checked explicitly
/// - junction table cascades on both sides; `androidapps` must already exist
const APPGROUPS_V1: &[&str] = &[
    r#"
    CREATE TABLE appgroups (
        gid INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL UNIQUE CHECK (length(name) <= 255)
    )
    "#,
    r#"
    CREATE TABLE androidapps_appgroups (
        aid BIGINT REFERENCES androidapps ON DELETE CASCADE,
        gid BIGINT REFERENCES appgroups ON DELETE CASCADE
    )
    "#,
];

/// Version 2: one membership row per (app, group) pair, and lookups by group.
const APPGROUPS_V2: &[&str] = &[
    "CREATE UNIQUE INDEX idx_androidapps_appgroups_pair ON androidapps_appgroups(aid, gid)",
    "CREATE INDEX idx_androidapps_appgroups_gid ON androidapps_appgroups(gid)",
];

pub const APPGROUPS_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: APPGROUPS_V1,
    },
    Migration {
        version: 2,
        statements: APPGROUPS_V2,
    },
];
