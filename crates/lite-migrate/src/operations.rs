//! Migration operations.
//!
//! The closed set of abstract schema changes a model diff can produce. The
//! planner consumes these, rewrites the ones SQLite cannot execute, and hands
//! the result to a [`MigrationDialect`](crate::dialect::MigrationDialect).

use serde::{Deserialize, Serialize};

use crate::schema::{
    index_name, ColumnSchema, DefaultValue, ForeignKeyAction, ForeignKeySchema, IndexSchema,
    PrimaryKeySchema, SqlType, UniqueConstraint,
};

/// Changes to apply to an existing column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnChanges {
    /// New data type (if changing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<SqlType>,
    /// New nullability (if changing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// New default value (if changing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// New unique constraint (if changing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
}

impl ColumnChanges {
    /// Creates empty column changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a new type.
    #[must_use]
    pub fn set_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// Sets nullability.
    #[must_use]
    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Returns true if no changes are specified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql_type.is_none()
            && self.nullable.is_none()
            && self.default.is_none()
            && self.unique.is_none()
    }
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationOperation {
    /// Create a new table.
    CreateTable {
        /// Table name.
        name: String,
        /// Column definitions.
        columns: Vec<ColumnSchema>,
        /// Table-level primary key.
        #[serde(default)]
        primary_key: Option<PrimaryKeySchema>,
        /// Foreign keys declared with the table.
        #[serde(default)]
        foreign_keys: Vec<ForeignKeySchema>,
        /// Unique constraints declared with the table.
        #[serde(default)]
        unique_constraints: Vec<UniqueConstraint>,
        /// Whether to use IF NOT EXISTS.
        #[serde(default)]
        if_not_exists: bool,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        name: String,
        /// Whether to use IF EXISTS.
        #[serde(default)]
        if_exists: bool,
    },

    /// Rename a table.
    RenameTable {
        /// Old table name.
        old_name: String,
        /// New table name.
        new_name: String,
    },

    /// Add a column to a table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnSchema,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column_name: String,
    },

    /// Rename a column.
    RenameColumn {
        /// Table name.
        table: String,
        /// Old column name.
        old_name: String,
        /// New column name.
        new_name: String,
    },

    /// Alter a column's properties.
    AlterColumn {
        /// Table name.
        table: String,
        /// Column name.
        column_name: String,
        /// Changes to apply.
        changes: ColumnChanges,
    },

    /// Add a foreign key constraint.
    AddForeignKey {
        /// Table name.
        table: String,
        /// Foreign key definition.
        foreign_key: ForeignKeySchema,
    },

    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Table name.
        table: String,
        /// Constraint name.
        constraint_name: String,
    },

    /// Add a primary key.
    AddPrimaryKey {
        /// Table name.
        table: String,
        /// Key definition.
        primary_key: PrimaryKeySchema,
    },

    /// Drop a primary key.
    DropPrimaryKey {
        /// Table name.
        table: String,
        /// Constraint name, if known.
        #[serde(default)]
        name: Option<String>,
    },

    /// Add a unique constraint.
    AddUniqueConstraint {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
        /// Columns that form the unique constraint.
        columns: Vec<String>,
    },

    /// Drop a unique constraint.
    DropUniqueConstraint {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// Create an index.
    CreateIndex {
        /// Index name.
        name: String,
        /// Table name.
        table: String,
        /// Columns to index.
        columns: Vec<String>,
        /// Whether this is a unique index.
        #[serde(default)]
        unique: bool,
        /// Partial index condition.
        #[serde(default)]
        condition: Option<String>,
        /// Whether to use IF NOT EXISTS.
        #[serde(default)]
        if_not_exists: bool,
    },

    /// Drop an index.
    DropIndex {
        /// Index name.
        name: String,
        /// Table name.
        #[serde(default)]
        table: Option<String>,
        /// Whether to use IF EXISTS.
        #[serde(default)]
        if_exists: bool,
    },

    /// Rename an index.
    RenameIndex {
        /// Table the index belongs to.
        table: String,
        /// Current index name.
        old_name: String,
        /// New index name.
        new_name: String,
    },

    /// Ensure a schema (namespace) exists.
    EnsureSchema {
        /// Schema name.
        name: String,
    },

    /// Drop a schema (namespace).
    DropSchema {
        /// Schema name.
        name: String,
    },

    /// Create a sequence.
    CreateSequence {
        /// Sequence name.
        name: String,
        /// First value.
        #[serde(default = "one")]
        start: i64,
        /// Step between values.
        #[serde(default = "one")]
        increment: i64,
    },

    /// Drop a sequence.
    DropSequence {
        /// Sequence name.
        name: String,
    },

    /// Rename a sequence.
    RenameSequence {
        /// Current sequence name.
        name: String,
        /// New sequence name.
        new_name: String,
    },

    /// Alter a sequence's step.
    AlterSequence {
        /// Sequence name.
        name: String,
        /// New step between values.
        increment: i64,
    },

    /// Run a raw SQL statement.
    RunSql {
        /// Statement text, emitted verbatim.
        sql: String,
        /// Whether the statement must run outside the migration transaction.
        #[serde(default)]
        suppress_transaction: bool,
    },
}

fn one() -> i64 {
    1
}

impl MigrationOperation {
    /// Creates a CreateTable operation.
    #[must_use]
    pub fn create_table(
        name: impl Into<String>,
        columns: Vec<ColumnSchema>,
        primary_key: Option<PrimaryKeySchema>,
    ) -> Self {
        Self::CreateTable {
            name: name.into(),
            columns,
            primary_key,
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
            if_not_exists: false,
        }
    }

    /// Creates a DropTable operation.
    #[must_use]
    pub fn drop_table(name: impl Into<String>) -> Self {
        Self::DropTable {
            name: name.into(),
            if_exists: false,
        }
    }

    /// Creates a RenameTable operation.
    #[must_use]
    pub fn rename_table(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::RenameTable {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Creates an AddColumn operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnSchema) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a DropColumn operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            column_name: column_name.into(),
        }
    }

    /// Creates a RenameColumn operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::RenameColumn {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Creates an AlterColumn operation.
    #[must_use]
    pub fn alter_column(
        table: impl Into<String>,
        column_name: impl Into<String>,
        changes: ColumnChanges,
    ) -> Self {
        Self::AlterColumn {
            table: table.into(),
            column_name: column_name.into(),
            changes,
        }
    }

    /// Creates an AddForeignKey operation.
    #[must_use]
    pub fn add_foreign_key(table: impl Into<String>, foreign_key: ForeignKeySchema) -> Self {
        Self::AddForeignKey {
            table: table.into(),
            foreign_key,
        }
    }

    /// Creates a DropForeignKey operation.
    #[must_use]
    pub fn drop_foreign_key(table: impl Into<String>, constraint_name: impl Into<String>) -> Self {
        Self::DropForeignKey {
            table: table.into(),
            constraint_name: constraint_name.into(),
        }
    }

    /// Creates an AddPrimaryKey operation.
    #[must_use]
    pub fn add_primary_key(table: impl Into<String>, primary_key: PrimaryKeySchema) -> Self {
        Self::AddPrimaryKey {
            table: table.into(),
            primary_key,
        }
    }

    /// Creates a DropPrimaryKey operation.
    #[must_use]
    pub fn drop_primary_key(table: impl Into<String>, name: Option<String>) -> Self {
        Self::DropPrimaryKey {
            table: table.into(),
            name,
        }
    }

    /// Creates an AddUniqueConstraint operation.
    #[must_use]
    pub fn add_unique_constraint(
        table: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self::AddUniqueConstraint {
            table: table.into(),
            name: name.into(),
            columns,
        }
    }

    /// Creates a DropUniqueConstraint operation.
    #[must_use]
    pub fn drop_unique_constraint(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropUniqueConstraint {
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates a CreateIndex operation from an index definition.
    #[must_use]
    pub fn create_index(table: impl Into<String>, index: &IndexSchema) -> Self {
        Self::CreateIndex {
            name: index.name.clone(),
            table: table.into(),
            columns: index.columns.clone(),
            unique: index.unique,
            condition: index.condition.clone(),
            if_not_exists: false,
        }
    }

    /// Creates a DropIndex operation.
    #[must_use]
    pub fn drop_index(name: impl Into<String>, table: Option<String>) -> Self {
        Self::DropIndex {
            name: name.into(),
            table,
            if_exists: false,
        }
    }

    /// Creates a RenameIndex operation.
    #[must_use]
    pub fn rename_index(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::RenameIndex {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Creates a RunSql operation that runs inside the migration transaction.
    #[must_use]
    pub fn run_sql(sql: impl Into<String>) -> Self {
        Self::RunSql {
            sql: sql.into(),
            suppress_transaction: false,
        }
    }

    /// Creates a RunSql operation that must run outside any transaction.
    #[must_use]
    pub fn run_sql_outside_transaction(sql: impl Into<String>) -> Self {
        Self::RunSql {
            sql: sql.into(),
            suppress_transaction: true,
        }
    }

    /// Returns the table this operation targets, if it targets one.
    ///
    /// For `RenameTable` this is the table's current name.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { name, .. } | Self::DropTable { name, .. } => Some(name),
            Self::RenameTable { old_name, .. } => Some(old_name),
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::DropPrimaryKey { table, .. }
            | Self::AddUniqueConstraint { table, .. }
            | Self::DropUniqueConstraint { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::RenameIndex { table, .. } => Some(table),
            Self::DropIndex { table, .. } => table.as_deref(),
            Self::EnsureSchema { .. }
            | Self::DropSchema { .. }
            | Self::CreateSequence { .. }
            | Self::DropSequence { .. }
            | Self::RenameSequence { .. }
            | Self::AlterSequence { .. }
            | Self::RunSql { .. } => None,
        }
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { name, .. } => format!("Create table '{}'", name),
            Self::DropTable { name, .. } => format!("Drop table '{}'", name),
            Self::RenameTable { old_name, new_name } => {
                format!("Rename table '{}' to '{}'", old_name, new_name)
            }
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{}'", column.name, table)
            }
            Self::DropColumn { table, column_name } => {
                format!("Drop column '{}' from table '{}'", column_name, table)
            }
            Self::RenameColumn {
                table,
                old_name,
                new_name,
            } => format!(
                "Rename column '{}' to '{}' in table '{}'",
                old_name, new_name, table
            ),
            Self::AlterColumn {
                table, column_name, ..
            } => format!("Alter column '{}' in table '{}'", column_name, table),
            Self::AddForeignKey { table, foreign_key } => format!(
                "Add foreign key '{}' to table '{}'",
                foreign_key.name, table
            ),
            Self::DropForeignKey {
                table,
                constraint_name,
            } => format!(
                "Drop foreign key '{}' from table '{}'",
                constraint_name, table
            ),
            Self::AddPrimaryKey { table, .. } => format!("Add primary key to table '{}'", table),
            Self::DropPrimaryKey { table, .. } => {
                format!("Drop primary key from table '{}'", table)
            }
            Self::AddUniqueConstraint { table, name, .. } => {
                format!("Add unique constraint '{}' to table '{}'", name, table)
            }
            Self::DropUniqueConstraint { table, name } => {
                format!("Drop unique constraint '{}' from table '{}'", name, table)
            }
            Self::CreateIndex { name, table, .. } => {
                format!("Create index '{}' on table '{}'", name, table)
            }
            Self::DropIndex { name, .. } => format!("Drop index '{}'", name),
            Self::RenameIndex {
                table,
                old_name,
                new_name,
            } => format!(
                "Rename index '{}' to '{}' on table '{}'",
                old_name, new_name, table
            ),
            Self::EnsureSchema { name } => format!("Ensure schema '{}'", name),
            Self::DropSchema { name } => format!("Drop schema '{}'", name),
            Self::CreateSequence { name, .. } => format!("Create sequence '{}'", name),
            Self::DropSequence { name } => format!("Drop sequence '{}'", name),
            Self::RenameSequence { name, new_name } => {
                format!("Rename sequence '{}' to '{}'", name, new_name)
            }
            Self::AlterSequence { name, .. } => format!("Alter sequence '{}'", name),
            Self::RunSql { .. } => "Run custom SQL".to_string(),
        }
    }
}

/// Builder for foreign key schema.
pub struct ForeignKeyBuilder {
    schema: ForeignKeySchema,
}

impl ForeignKeyBuilder {
    /// Creates a new foreign key builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: ForeignKeySchema {
                name: name.into(),
                columns: Vec::new(),
                references_table: String::new(),
                references_columns: Vec::new(),
                on_delete: ForeignKeyAction::NoAction,
                on_update: ForeignKeyAction::NoAction,
            },
        }
    }

    /// Sets the local columns.
    #[must_use]
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.schema.columns = columns;
        self
    }

    /// Sets the referenced table and columns.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, columns: Vec<String>) -> Self {
        self.schema.references_table = table.into();
        self.schema.references_columns = columns;
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.schema.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.schema.on_update = action;
        self
    }

    /// Builds the foreign key schema.
    #[must_use]
    pub fn build(self) -> ForeignKeySchema {
        self.schema
    }
}

/// Builder for index schema.
pub struct IndexBuilder {
    schema: IndexSchema,
}

impl IndexBuilder {
    /// Creates a new index builder with an explicit name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: IndexSchema {
                name: name.into(),
                columns: Vec::new(),
                unique: false,
                condition: None,
            },
        }
    }

    /// Creates an index builder named by convention (`IX_<table>_<columns>`).
    #[must_use]
    pub fn conventional(table: &str, columns: Vec<String>) -> Self {
        Self::new(index_name(table, &columns)).columns(columns)
    }

    /// Sets the columns to index.
    #[must_use]
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.schema.columns = columns;
        self
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.schema.unique = true;
        self
    }

    /// Sets a partial index condition.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.schema.condition = Some(condition.into());
        self
    }

    /// Builds the index schema.
    #[must_use]
    pub fn build(self) -> IndexSchema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_targets() {
        assert_eq!(
            MigrationOperation::rename_column("Blog", "Url", "BlogUrl").table(),
            Some("Blog")
        );
        assert_eq!(
            MigrationOperation::rename_table("Blog", "Blogs").table(),
            Some("Blog")
        );
        assert_eq!(MigrationOperation::drop_index("IX_Blog_Url", None).table(), None);
        assert_eq!(
            MigrationOperation::EnsureSchema {
                name: "main".to_string()
            }
            .table(),
            None
        );
    }

    #[test]
    fn test_run_sql_transaction_flag() {
        match MigrationOperation::run_sql_outside_transaction("PRAGMA foreign_keys=OFF;") {
            MigrationOperation::RunSql {
                suppress_transaction,
                ..
            } => assert!(suppress_transaction),
            other => panic!("Expected RunSql, got {:?}", other),
        }
        match MigrationOperation::run_sql("DELETE FROM Blog") {
            MigrationOperation::RunSql {
                suppress_transaction,
                ..
            } => assert!(!suppress_transaction),
            other => panic!("Expected RunSql, got {:?}", other),
        }
    }

    #[test]
    fn test_column_changes() {
        let changes = ColumnChanges::new()
            .set_type(SqlType::Text)
            .set_nullable(false);

        assert!(!changes.is_empty());
        assert_eq!(changes.sql_type, Some(SqlType::Text));
        assert_eq!(changes.nullable, Some(false));
        assert!(ColumnChanges::new().is_empty());
    }

    #[test]
    fn test_foreign_key_builder() {
        let fk = ForeignKeyBuilder::new("FK_Post_Blog_BlogId")
            .columns(vec!["BlogId".to_string()])
            .references("Blog", vec!["Id".to_string()])
            .on_delete(ForeignKeyAction::Cascade)
            .build();

        assert_eq!(fk.name, "FK_Post_Blog_BlogId");
        assert_eq!(fk.columns, vec!["BlogId"]);
        assert_eq!(fk.references_table, "Blog");
        assert_eq!(fk.on_delete, ForeignKeyAction::Cascade);
        assert_eq!(fk.on_update, ForeignKeyAction::NoAction);
    }

    #[test]
    fn test_conventional_index_builder() {
        let index = IndexBuilder::conventional("Post", vec!["BlogId".to_string()])
            .unique()
            .build();
        assert_eq!(index.name, "IX_Post_BlogId");
        assert!(index.unique);
    }

    #[test]
    fn test_operation_json_shape() {
        let json = r#"{"RenameColumn": {"table": "Blog", "old_name": "Url", "new_name": "BlogUrl"}}"#;
        let op: MigrationOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op, MigrationOperation::rename_column("Blog", "Url", "BlogUrl"));

        let seq: MigrationOperation =
            serde_json::from_str(r#"{"CreateSequence": {"name": "OrderNumbers"}}"#).unwrap();
        assert_eq!(
            seq,
            MigrationOperation::CreateSequence {
                name: "OrderNumbers".to_string(),
                start: 1,
                increment: 1,
            }
        );
    }
}
