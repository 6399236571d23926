//! SQLite dialect for migrations.
//!
//! SQLite can rename tables and columns and add columns, nothing more.
//! Operations that need more than that are rebuilt by the
//! [`MigrationPlanner`](crate::planner::MigrationPlanner); reaching this
//! dialect with one of them is a caller error.

use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;
use crate::schema::{
    ColumnSchema, ForeignKeyAction, ForeignKeySchema, PrimaryKeySchema, SqlType, UniqueConstraint,
};

use super::{MigrationDialect, MigrationStatement};

/// SQLite migration dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Moves a single-column primary key onto its column.
    ///
    /// `INTEGER PRIMARY KEY` only aliases the rowid (and only accepts
    /// `AUTOINCREMENT`) when declared in the column clause. Composite keys
    /// stay table-level and clear any stray column flags.
    #[must_use]
    pub fn inline_primary_key(
        columns: &[ColumnSchema],
        primary_key: Option<&PrimaryKeySchema>,
    ) -> (Vec<ColumnSchema>, Option<PrimaryKeySchema>) {
        let mut columns = columns.to_vec();
        let Some(pk) = primary_key else {
            return (columns, None);
        };

        let inline_target = match pk.columns.as_slice() {
            [single] if columns.iter().any(|c| &c.name == single) => Some(single.as_str()),
            _ => None,
        };

        for column in &mut columns {
            if Some(column.name.as_str()) == inline_target {
                column.primary_key = true;
                column.primary_key_name = pk.name.clone();
            } else {
                column.primary_key = false;
                column.primary_key_name = None;
            }
        }

        let table_level = match inline_target {
            Some(_) => None,
            None => Some(pk.clone()),
        };
        (columns, table_level)
    }

    /// Generates SQL for creating a table.
    fn create_table_sql(
        &self,
        name: &str,
        columns: &[ColumnSchema],
        primary_key: Option<&PrimaryKeySchema>,
        foreign_keys: &[ForeignKeySchema],
        unique_constraints: &[UniqueConstraint],
        if_not_exists: bool,
    ) -> String {
        let (columns, primary_key) = Self::inline_primary_key(columns, primary_key);

        let mut sql = String::from("CREATE TABLE ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_identifier(name));
        sql.push_str(" (\n");

        let mut defs: Vec<String> = columns.iter().map(|c| self.column_definition(c)).collect();

        if let Some(pk) = primary_key {
            defs.push(format!(
                "{}PRIMARY KEY ({})",
                self.constraint_prefix(pk.name.as_deref()),
                self.quote_list(&pk.columns)
            ));
        }

        for fk in foreign_keys {
            defs.push(self.foreign_key_sql(fk));
        }

        for uc in unique_constraints {
            defs.push(format!(
                "{}UNIQUE ({})",
                self.constraint_prefix(Some(&uc.name)),
                self.quote_list(&uc.columns)
            ));
        }

        sql.push_str("    ");
        sql.push_str(&defs.join(",\n    "));
        sql.push_str("\n)");
        sql
    }

    fn constraint_prefix(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("CONSTRAINT {} ", self.quote_identifier(name)),
            None => String::new(),
        }
    }

    /// Generates a table-level foreign key clause.
    fn foreign_key_sql(&self, fk: &ForeignKeySchema) -> String {
        let mut sql = format!(
            "{}FOREIGN KEY ({}) REFERENCES {} ({})",
            self.constraint_prefix(Some(&fk.name)),
            self.quote_list(&fk.columns),
            self.quote_identifier(&fk.references_table),
            self.quote_list(&fk.references_columns)
        );
        if fk.on_delete != ForeignKeyAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(fk.on_delete.to_sql());
        }
        if fk.on_update != ForeignKeyAction::NoAction {
            sql.push_str(" ON UPDATE ");
            sql.push_str(fk.on_update.to_sql());
        }
        sql
    }

    /// Generates SQL for dropping a table.
    fn drop_table_sql(&self, name: &str, if_exists: bool) -> String {
        let mut sql = String::from("DROP TABLE ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote_identifier(name));
        sql
    }

    /// Generates SQL for renaming a table.
    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates SQL for adding a column.
    fn add_column_sql(&self, table: &str, column: &ColumnSchema) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column)
        )
    }

    /// Generates SQL for renaming a column (SQLite 3.25.0+).
    fn rename_column_sql(&self, table: &str, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_identifier(table),
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates SQL for creating an index.
    fn create_index_sql(
        &self,
        name: &str,
        table: &str,
        columns: &[String],
        unique: bool,
        condition: Option<&str>,
        if_not_exists: bool,
    ) -> String {
        let mut sql = String::from("CREATE ");
        if unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_identifier(name));
        sql.push_str(" ON ");
        sql.push_str(&self.quote_identifier(table));
        sql.push_str(" (");
        sql.push_str(&self.quote_list(columns));
        sql.push(')');

        if let Some(cond) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(cond);
        }

        sql
    }

    /// Generates SQL for dropping an index.
    fn drop_index_sql(&self, name: &str, if_exists: bool) -> String {
        let mut sql = String::from("DROP INDEX ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        // SQLite index names are global, not per-table
        sql.push_str(&self.quote_identifier(name));
        sql
    }
}

impl MigrationDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn generate_sql(&self, operation: &MigrationOperation) -> Result<Vec<MigrationStatement>> {
        let sql = match operation {
            MigrationOperation::CreateTable {
                name,
                columns,
                primary_key,
                foreign_keys,
                unique_constraints,
                if_not_exists,
            } => self.create_table_sql(
                name,
                columns,
                primary_key.as_ref(),
                foreign_keys,
                unique_constraints,
                *if_not_exists,
            ),

            MigrationOperation::DropTable { name, if_exists } => {
                self.drop_table_sql(name, *if_exists)
            }

            MigrationOperation::RenameTable { old_name, new_name } => {
                self.rename_table_sql(old_name, new_name)
            }

            MigrationOperation::AddColumn { table, column } => self.add_column_sql(table, column),

            MigrationOperation::RenameColumn {
                table,
                old_name,
                new_name,
            } => self.rename_column_sql(table, old_name, new_name),

            MigrationOperation::CreateIndex {
                name,
                table,
                columns,
                unique,
                condition,
                if_not_exists,
            } => self.create_index_sql(
                name,
                table,
                columns,
                *unique,
                condition.as_deref(),
                *if_not_exists,
            ),

            MigrationOperation::DropIndex {
                name, if_exists, ..
            } => self.drop_index_sql(name, *if_exists),

            MigrationOperation::RunSql {
                sql,
                suppress_transaction,
            } => {
                return Ok(vec![MigrationStatement {
                    sql: sql.clone(),
                    suppress_transaction: *suppress_transaction,
                }]);
            }

            MigrationOperation::EnsureSchema { name } | MigrationOperation::DropSchema { name } => {
                debug!(schema = %name, "SQLite has no schemas, nothing to emit");
                return Ok(Vec::new());
            }

            MigrationOperation::CreateSequence { .. }
            | MigrationOperation::DropSequence { .. }
            | MigrationOperation::RenameSequence { .. }
            | MigrationOperation::AlterSequence { .. } => {
                return Err(MigrateError::UnsupportedFeature("sequences".to_string()));
            }

            MigrationOperation::DropColumn { .. }
            | MigrationOperation::AlterColumn { .. }
            | MigrationOperation::AddForeignKey { .. }
            | MigrationOperation::DropForeignKey { .. }
            | MigrationOperation::AddPrimaryKey { .. }
            | MigrationOperation::DropPrimaryKey { .. }
            | MigrationOperation::AddUniqueConstraint { .. }
            | MigrationOperation::DropUniqueConstraint { .. }
            | MigrationOperation::RenameIndex { .. } => {
                return Err(MigrateError::UnsupportedOperation {
                    operation: operation.description(),
                });
            }
        };

        Ok(vec![MigrationStatement::new(sql)])
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        sql_type.sqlite_name().to_string()
    }

    fn auto_increment_keyword(&self) -> &'static str {
        "AUTOINCREMENT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{ColumnChanges, ForeignKeyBuilder};
    use crate::schema::{DefaultValue, LEGACY_AUTOINCREMENT_ANNOTATION};

    fn dialect() -> SqliteDialect {
        SqliteDialect::new()
    }

    fn single_sql(op: &MigrationOperation) -> String {
        let statements = dialect().generate_sql(op).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(!statements[0].suppress_transaction);
        statements[0].sql.clone()
    }

    #[test]
    fn test_single_column_primary_key_is_inlined() {
        let op = MigrationOperation::create_table(
            "Blog",
            vec![
                ColumnSchema::new("Id", SqlType::Integer)
                    .not_null()
                    .auto_increment(),
                ColumnSchema::new("Url", SqlType::Text),
            ],
            Some(PrimaryKeySchema::named("PK_Blog", vec!["Id".to_string()])),
        );

        assert_eq!(
            single_sql(&op),
            "CREATE TABLE \"Blog\" (\n    \
             \"Id\" INTEGER NOT NULL CONSTRAINT \"PK_Blog\" PRIMARY KEY AUTOINCREMENT,\n    \
             \"Url\" TEXT\n)"
        );
    }

    #[test]
    fn test_unnamed_inline_primary_key_without_autoincrement() {
        let op = MigrationOperation::create_table(
            "Tag",
            vec![ColumnSchema::new("Id", SqlType::Integer).not_null()],
            Some(PrimaryKeySchema::new(vec!["Id".to_string()])),
        );

        let sql = single_sql(&op);
        assert!(sql.contains("\"Id\" INTEGER NOT NULL PRIMARY KEY\n"));
        assert!(!sql.contains("AUTOINCREMENT"));
        assert!(!sql.contains("CONSTRAINT"));
    }

    #[test]
    fn test_legacy_autoincrement_annotation() {
        let op = MigrationOperation::create_table(
            "Blog",
            vec![ColumnSchema::new("Id", SqlType::Integer)
                .not_null()
                .annotation(LEGACY_AUTOINCREMENT_ANNOTATION, serde_json::Value::Bool(true))],
            Some(PrimaryKeySchema::new(vec!["Id".to_string()])),
        );

        assert!(single_sql(&op).contains("PRIMARY KEY AUTOINCREMENT"));
    }

    #[test]
    fn test_composite_primary_key_stays_table_level() {
        let op = MigrationOperation::create_table(
            "PostTag",
            vec![
                ColumnSchema::new("PostId", SqlType::Integer).not_null(),
                ColumnSchema::new("TagId", SqlType::Integer).not_null(),
            ],
            Some(PrimaryKeySchema::named(
                "PK_PostTag",
                vec!["PostId".to_string(), "TagId".to_string()],
            )),
        );

        let sql = single_sql(&op);
        assert!(sql.contains("CONSTRAINT \"PK_PostTag\" PRIMARY KEY (\"PostId\", \"TagId\")"));
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
    }

    #[test]
    fn test_create_table_with_constraints() {
        let op = MigrationOperation::CreateTable {
            name: "Post".to_string(),
            columns: vec![
                ColumnSchema::new("Id", SqlType::Integer).not_null(),
                ColumnSchema::new("BlogId", SqlType::Integer).not_null(),
                ColumnSchema::new("Slug", SqlType::Varchar(64))
                    .not_null()
                    .default(DefaultValue::String("draft".to_string())),
            ],
            primary_key: Some(PrimaryKeySchema::new(vec!["Id".to_string()])),
            foreign_keys: vec![ForeignKeyBuilder::new("FK_Post_Blog_BlogId")
                .columns(vec!["BlogId".to_string()])
                .references("Blog", vec!["Id".to_string()])
                .on_delete(ForeignKeyAction::Cascade)
                .build()],
            unique_constraints: vec![UniqueConstraint {
                name: "AK_Post_Slug".to_string(),
                columns: vec!["Slug".to_string()],
            }],
            if_not_exists: true,
        };

        let sql = single_sql(&op);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"Post\" ("));
        assert!(sql.contains("\"Slug\" TEXT NOT NULL DEFAULT 'draft'"));
        assert!(sql.contains(
            "CONSTRAINT \"FK_Post_Blog_BlogId\" FOREIGN KEY (\"BlogId\") \
             REFERENCES \"Blog\" (\"Id\") ON DELETE CASCADE"
        ));
        assert!(sql.contains("CONSTRAINT \"AK_Post_Slug\" UNIQUE (\"Slug\")"));
    }

    #[test]
    fn test_directly_supported_alterations() {
        assert_eq!(
            single_sql(&MigrationOperation::rename_table("Blog", "Blogs")),
            "ALTER TABLE \"Blog\" RENAME TO \"Blogs\""
        );
        assert_eq!(
            single_sql(&MigrationOperation::rename_column("Blog", "Url", "BlogUrl")),
            "ALTER TABLE \"Blog\" RENAME COLUMN \"Url\" TO \"BlogUrl\""
        );
        assert_eq!(
            single_sql(&MigrationOperation::add_column(
                "Blog",
                ColumnSchema::new("Rating", SqlType::Integer)
                    .not_null()
                    .default(DefaultValue::Integer(0)),
            )),
            "ALTER TABLE \"Blog\" ADD COLUMN \"Rating\" INTEGER NOT NULL DEFAULT 0"
        );
        assert_eq!(
            single_sql(&MigrationOperation::DropTable {
                name: "Blog".to_string(),
                if_exists: true,
            }),
            "DROP TABLE IF EXISTS \"Blog\""
        );
    }

    #[test]
    fn test_indexes() {
        let op = MigrationOperation::CreateIndex {
            name: "IX_Blog_Url".to_string(),
            table: "Blog".to_string(),
            columns: vec!["Url".to_string()],
            unique: true,
            condition: Some("\"Url\" IS NOT NULL".to_string()),
            if_not_exists: false,
        };
        assert_eq!(
            single_sql(&op),
            "CREATE UNIQUE INDEX \"IX_Blog_Url\" ON \"Blog\" (\"Url\") WHERE \"Url\" IS NOT NULL"
        );
        assert_eq!(
            single_sql(&MigrationOperation::drop_index("IX_Blog_Url", None)),
            "DROP INDEX \"IX_Blog_Url\""
        );
    }

    #[test]
    fn test_run_sql_keeps_transaction_flag() {
        let statements = dialect()
            .generate_sql(&MigrationOperation::run_sql_outside_transaction(
                "PRAGMA foreign_keys=ON;",
            ))
            .unwrap();
        assert_eq!(
            statements,
            vec![MigrationStatement::outside_transaction("PRAGMA foreign_keys=ON;")]
        );
    }

    #[test]
    fn test_rebuild_only_operations_are_rejected() {
        let rejected = vec![
            MigrationOperation::drop_column("Blog", "Url"),
            MigrationOperation::alter_column(
                "Blog",
                "Url",
                ColumnChanges::new().set_nullable(false),
            ),
            MigrationOperation::add_foreign_key(
                "Post",
                ForeignKeyBuilder::new("FK_Post_Blog_BlogId").build(),
            ),
            MigrationOperation::drop_foreign_key("Post", "FK_Post_Blog_BlogId"),
            MigrationOperation::add_primary_key(
                "Blog",
                PrimaryKeySchema::new(vec!["Id".to_string()]),
            ),
            MigrationOperation::drop_primary_key("Blog", None),
            MigrationOperation::add_unique_constraint("Blog", "AK_Blog_Url", vec!["Url".to_string()]),
            MigrationOperation::drop_unique_constraint("Blog", "AK_Blog_Url"),
            MigrationOperation::rename_index("Blog", "IX_Blog_Url", "IX_Blog_BlogUrl"),
        ];

        for op in rejected {
            let result = dialect().generate_sql(&op);
            assert!(
                matches!(result, Err(MigrateError::UnsupportedOperation { .. })),
                "{} should be rejected, got {:?}",
                op.description(),
                result
            );
        }
    }

    #[test]
    fn test_sequences_are_unsupported() {
        let sequences = vec![
            MigrationOperation::CreateSequence {
                name: "OrderNumbers".to_string(),
                start: 1,
                increment: 1,
            },
            MigrationOperation::DropSequence {
                name: "OrderNumbers".to_string(),
            },
            MigrationOperation::RenameSequence {
                name: "OrderNumbers".to_string(),
                new_name: "InvoiceNumbers".to_string(),
            },
            MigrationOperation::AlterSequence {
                name: "OrderNumbers".to_string(),
                increment: 10,
            },
        ];

        for op in sequences {
            assert!(matches!(
                dialect().generate_sql(&op),
                Err(MigrateError::UnsupportedFeature(_))
            ));
        }
    }

    #[test]
    fn test_schema_operations_emit_nothing() {
        let ensure = MigrationOperation::EnsureSchema {
            name: "blogging".to_string(),
        };
        let drop = MigrationOperation::DropSchema {
            name: "blogging".to_string(),
        };
        assert!(dialect().generate_sql(&ensure).unwrap().is_empty());
        assert!(dialect().generate_sql(&drop).unwrap().is_empty());
    }
}
