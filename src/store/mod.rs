//! Persistence layer — libSQL-backed storage for tasks, activity, and projects.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::DatabaseError;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;

/// Open the configured database and bring its schema up to date.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Database>, DatabaseError> {
    let backend = match config {
        DatabaseConfig::Local(path) => LibSqlBackend::new_local(path).await?,
        DatabaseConfig::Remote { url, auth_token } => {
            LibSqlBackend::new_remote(url, auth_token).await?
        }
    };
    Ok(Arc::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("taskhub.db");
        let db = connect(&DatabaseConfig::Local(path.clone())).await.unwrap();
        assert!(db.list_tasks(None).await.unwrap().is_empty());
        assert!(path.exists());
    }
}
