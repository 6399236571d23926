//! Error types for migration planning.

use std::path::PathBuf;

/// Errors that can occur while planning or emitting a migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The operation can only be satisfied by a table rebuild and was handed
    /// to the emitter directly.
    #[error("{operation} is not supported by SQLite; route it through the migration planner")]
    UnsupportedOperation {
        /// Description of the rejected operation.
        operation: String,
    },

    /// The target engine lacks the feature altogether.
    #[error("SQLite does not support {0}")]
    UnsupportedFeature(String),

    /// Internal inconsistency between the batch and the target model.
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    /// IO error (snapshot or operation files).
    #[error("IO error on '{path}': {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Inconsistencies detected while synthesizing rebuild scripts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanningError {
    /// A table was registered for rebuild but the target model does not define it.
    #[error("Table '{table}' was registered for rebuild but the target model does not define it")]
    MissingTableDefinition {
        /// The registered table.
        table: String,
    },

    /// A registered column rename points at a column the rebuilt table no longer has.
    #[error(
        "Column rename '{old_name}' -> '{new_name}' on table '{table}' does not match any column of the rebuilt table"
    )]
    StaleRename {
        /// The rebuilt table.
        table: String,
        /// Column name before the rename.
        old_name: String,
        /// Column name after the rename.
        new_name: String,
    },

    /// The shadow table name is already taken by a table in the target model.
    #[error("Cannot rebuild table '{table}': shadow table '{shadow}' already exists in the model")]
    ShadowTableCollision {
        /// The rebuilt table.
        table: String,
        /// The derived shadow table name.
        shadow: String,
    },
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
