pub mod error;
pub mod locks;
pub mod models;
pub mod repositories;
pub mod test_utils;

pub use error::StoreError;
pub use locks::KeyedLocks;

use sea_orm::{Database, DatabaseConnection, DbErr};
use std::path::Path;

/// Opens the database named by `path_or_url`.
///
/// A value that is already a DSN is used as-is; anything else is treated as a
/// SQLite file path whose parent directory is created on demand.
pub async fn connect(path_or_url: &str) -> Result<DatabaseConnection, DbErr> {
    let url = if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        path_or_url.to_string()
    } else {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(path_or_url).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbErr::Custom(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    tracing::debug!(url = %url, "connecting to database");
    Database::connect(&url).await
}
