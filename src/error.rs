//! Error types for TaskHub.
//!
//! One enum per concern. The binary folds them into `anyhow::Error`.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Login and authorization errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Restricted access. {domain} only.")]
    DomainRejected { domain: String },

    #[error("Not logged in")]
    MissingSession,

    #[error("Session not recognised")]
    UnknownSession,

    #[error("{identity} is not allowed to {action}")]
    Forbidden { identity: String, action: String },
}

/// Task operation errors.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Enter a description.")]
    EmptyDescription,

    #[error("Task {id} not found")]
    NotFound { id: i64 },

    #[error("Unknown task status: {0}")]
    UnknownStatus(String),

    #[error("Unknown priority: {0}")]
    UnknownPriority(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Spreadsheet sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Spreadsheet source is not configured")]
    NotConfigured,

    #[error("Spreadsheet request failed: {0}")]
    Request(String),

    #[error("Worksheet {worksheet} is missing column {column}")]
    MissingColumn { worksheet: String, column: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
