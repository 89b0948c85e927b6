//! Project list imported from the roadmap spreadsheet.

pub mod model;
pub mod sheets;

use tracing::{info, warn};

use crate::error::{DatabaseError, SyncError};
use crate::store::Database;

pub use model::Project;
pub use sheets::{GoogleSheetsSource, SheetSource, StaticSheet};

/// Pull every row from `source` and upsert it by name. Returns the number of
/// projects written.
pub async fn sync_projects(source: &dyn SheetSource, db: &dyn Database) -> Result<usize, SyncError> {
    let rows = source.fetch_rows().await?;
    let count = db.upsert_projects(&rows).await?;
    info!(count, "Projects synced");
    Ok(count)
}

/// Project names for selection controls, alphabetical. Failures are logged
/// here and left to the caller to surface.
pub async fn project_names(db: &dyn Database) -> Result<Vec<String>, DatabaseError> {
    db.list_project_names().await.inspect_err(|e| {
        warn!(error = %e, "Failed to load project names");
    })
}
