pub mod config;
pub mod db;
pub mod error;

pub use config::Config;
pub use db::{AppGroup, AppGroupDao, DatabaseManager};
pub use error::RaccoonError;
