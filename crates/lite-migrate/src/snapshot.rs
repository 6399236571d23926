//! Loading model snapshots and operation batches from JSON files.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;
use crate::schema::DatabaseSchema;

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| MigrateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Loads a target model snapshot.
pub fn load_schema(path: impl AsRef<Path>) -> Result<DatabaseSchema> {
    let path = path.as_ref();
    let schema: DatabaseSchema = load_json(path)?;
    debug!(path = %path.display(), tables = schema.tables.len(), "Loaded model snapshot");
    Ok(schema)
}

/// Loads a batch of migration operations.
pub fn load_operations(path: impl AsRef<Path>) -> Result<Vec<MigrationOperation>> {
    let path = path.as_ref();
    let operations: Vec<MigrationOperation> = load_json(path)?;
    debug!(path = %path.display(), operations = operations.len(), "Loaded operations");
    Ok(operations)
}

/// Writes a model snapshot as pretty-printed JSON.
pub fn save_schema(path: impl AsRef<Path>, schema: &DatabaseSchema) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(schema)?;
    fs::write(path, content).map_err(|source| MigrateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
