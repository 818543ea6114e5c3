//! Database module: app group persistence on SQLite.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL, grouped into versioned migrations
//! - `dao.rs`: the versioned-schema contract implemented by every DAO
//! - `sqlite.rs`: connection manager and schema upgrades
//! - `appgroup.rs`: the app group DAO

pub mod appgroup;
pub mod dao;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use appgroup::AppGroupDao;
pub use dao::{DataAccessObject, Migration};
pub use models::{AppGroup, AppId, GroupId};
pub use sqlite::{DatabaseManager, SqlitePool};
