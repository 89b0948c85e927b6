//! Project rows imported from the roadmap spreadsheet.

use serde::{Deserialize, Serialize};

/// Sheet header for each project field.
pub const COL_NAME: &str = "Interface Name";
pub const COL_STAGE: &str = "Stage";
pub const COL_TARGET_DATE: &str = "Target Date";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_CLIENT: &str = "Client";

/// One project. `name` is the upsert key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Lifecycle stage as written in the sheet.
    pub stage: String,
    /// Kept as the sheet's text; not parsed.
    pub target_date: String,
    pub description: String,
    pub client: String,
}
