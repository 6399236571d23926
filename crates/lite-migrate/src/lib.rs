//! SQLite migration planning.
//!
//! `lite-migrate` turns abstract schema operations into SQL that SQLite can
//! actually run. SQLite's `ALTER TABLE` only renames tables and columns and
//! adds columns; anything else is carried out by rebuilding the table through
//! a shadow copy.
//!
//! # Architecture
//!
//! - **Schema** - The target model: tables, columns, keys, indexes
//! - **Operations** - Schema changes like `CreateTable`, `RenameColumn`, `DropIndex`
//! - **Autodetector** - Diffs models; also describes a table from scratch
//! - **Planner** - Classifies a batch and synthesizes table rebuilds
//! - **Dialect** - SQLite SQL generation
//!
//! # Example
//!
//! ```rust
//! use lite_migrate::prelude::*;
//!
//! let model = DatabaseSchema::new().table(
//!     TableSchema::new("Blog")
//!         .column(ColumnSchema::new("Id", SqlType::Integer).primary_key())
//!         .column(ColumnSchema::new("BlogUrl", SqlType::Text)),
//! );
//!
//! let mut planner = MigrationPlanner::with_dialect(SqliteDialect::new());
//! let statements = planner
//!     .generate(
//!         &[MigrationOperation::rename_column("Blog", "Url", "BlogUrl")],
//!         &model,
//!     )
//!     .unwrap();
//!
//! assert_eq!(statements[0].sql, "PRAGMA foreign_keys=OFF;");
//! assert!(statements[0].suppress_transaction);
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Plan a batch of operations against the target model
//! lite-migrate plan --operations ops.json --model model.json
//!
//! # Diff two model snapshots and print the SQL
//! lite-migrate diff --from old.json --to new.json --format json
//! ```

pub mod autodetector;
pub mod dialect;
pub mod error;
pub mod operations;
pub mod planner;
pub mod registry;
pub mod schema;
pub mod snapshot;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::autodetector::{Autodetector, ModelDiffer};
    pub use crate::dialect::{MigrationDialect, MigrationStatement, SqliteDialect};
    pub use crate::error::{MigrateError, PlanningError, Result};
    pub use crate::operations::{
        ColumnChanges, ForeignKeyBuilder, IndexBuilder, MigrationOperation,
    };
    pub use crate::planner::{MigrationPlanner, PlannerOptions};
    pub use crate::schema::{
        ColumnSchema, DatabaseSchema, DefaultValue, ForeignKeyAction, ForeignKeySchema,
        IndexSchema, PrimaryKeySchema, SqlType, TableSchema, UniqueConstraint,
    };
}
