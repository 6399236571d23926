//! Database dialect implementations.
//!
//! Each dialect knows how to turn a single migration operation into the
//! statements its database executes.

mod sqlite;

pub use sqlite::SqliteDialect;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::operations::MigrationOperation;
use crate::schema::{ColumnSchema, SqlType};

/// A statement produced by a dialect, ready to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatement {
    /// SQL text.
    pub sql: String,
    /// Whether the statement must run outside the migration transaction.
    pub suppress_transaction: bool,
}

impl MigrationStatement {
    /// A statement that may run inside the migration transaction.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            suppress_transaction: false,
        }
    }

    /// A statement that must run outside any transaction.
    #[must_use]
    pub fn outside_transaction(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            suppress_transaction: true,
        }
    }

    /// Returns the SQL text with exactly one trailing `;`.
    #[must_use]
    pub fn terminated(&self) -> String {
        let sql = self.sql.trim_end();
        if sql.ends_with(';') {
            sql.to_string()
        } else {
            format!("{};", sql)
        }
    }
}

/// Trait for database-specific SQL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the statements for a migration operation.
    ///
    /// Fails for operations the database cannot express directly.
    fn generate_sql(&self, operation: &MigrationOperation) -> Result<Vec<MigrationStatement>>;

    /// Returns the SQL type name for the given type.
    fn type_name(&self, sql_type: &SqlType) -> String;

    /// Returns the auto-increment keyword for this dialect.
    fn auto_increment_keyword(&self) -> &'static str;

    /// Generates column definition SQL.
    ///
    /// A column flagged as primary key carries the key clause (and its
    /// constraint name) inline.
    fn column_definition(&self, column: &ColumnSchema) -> String {
        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.type_name(&column.sql_type),
        ];

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        if column.primary_key {
            if let Some(ref name) = column.primary_key_name {
                parts.push(format!("CONSTRAINT {}", self.quote_identifier(name)));
            }
            parts.push("PRIMARY KEY".to_string());
            if column.is_auto_increment() {
                parts.push(self.auto_increment_keyword().to_string());
            }
        }

        if column.unique && !column.primary_key {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default_sql) = column.default.to_sql() {
            parts.push(format!("DEFAULT {}", default_sql));
        }

        if let Some(ref check) = column.check {
            parts.push(format!("CHECK ({})", check));
        }

        parts.join(" ")
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quotes and comma-joins a list of identifiers.
    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
