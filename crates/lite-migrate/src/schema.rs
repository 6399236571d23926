//! Schema representation types.
//!
//! These types describe the target model a migration batch is planned
//! against. The model differ reads them to describe tables from scratch,
//! and the planner consults them when it has to rebuild a table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Annotation marking a column as `AUTOINCREMENT`.
pub const AUTOINCREMENT_ANNOTATION: &str = "Sqlite:Autoincrement";

/// Annotation name used for autoincrement by older model snapshots.
pub const LEGACY_AUTOINCREMENT_ANNOTATION: &str = "Autoincrement";

/// SQL data types supported by the migration system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Small integer (16-bit).
    SmallInt,
    /// Unbounded text.
    Text,
    /// Variable-length character string.
    Varchar(usize),
    /// Fixed-length character string.
    Char(usize),
    /// Boolean.
    Boolean,
    /// Date and time.
    DateTime,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Timestamp.
    Timestamp,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Decimal with precision and scale.
    Decimal(u8, u8),
    /// Binary large object.
    Blob,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
}

impl SqlType {
    /// Returns the storage class SQLite uses for this type.
    #[must_use]
    pub fn sqlite_name(&self) -> &'static str {
        match self {
            Self::Integer | Self::BigInt | Self::SmallInt | Self::Boolean => "INTEGER",
            Self::Text | Self::Varchar(_) | Self::Char(_) | Self::Json | Self::Uuid => "TEXT",
            Self::DateTime | Self::Date | Self::Time | Self::Timestamp => "TEXT",
            Self::Real | Self::Double => "REAL",
            Self::Decimal(_, _) => "NUMERIC",
            Self::Blob => "BLOB",
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DefaultValue {
    /// No default value.
    #[default]
    None,
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// SQL expression (e.g., "CURRENT_TIMESTAMP").
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Null => Some("NULL".to_string()),
            Self::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
            // SQLite only accepts non-literal defaults in parentheses.
            Self::Expression(expr) => Some(format!("({expr})")),
        }
    }
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ForeignKeyAction {
    /// No action (error if referenced row is deleted/updated).
    #[default]
    NoAction,
    /// Restrict (same as NoAction but checked immediately).
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// SQL data type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    /// Default value.
    #[serde(default)]
    pub default: DefaultValue,
    /// Whether the primary key is declared on this column rather than on the table.
    #[serde(default)]
    pub primary_key: bool,
    /// Constraint name carried by an inlined primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_name: Option<String>,
    /// Whether this column has a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Check constraint expression (if any).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    /// Provider annotations (autoincrement and friends).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

fn nullable_by_default() -> bool {
    true
}

impl ColumnSchema {
    /// Creates a new column schema.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            default: DefaultValue::None,
            primary_key: false,
            primary_key_name: None,
            unique: false,
            check: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = value;
        self
    }

    /// Sets the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as `AUTOINCREMENT`.
    #[must_use]
    pub fn auto_increment(self) -> Self {
        self.annotation(AUTOINCREMENT_ANNOTATION, serde_json::Value::Bool(true))
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets a check constraint.
    #[must_use]
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Attaches an annotation.
    #[must_use]
    pub fn annotation(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.annotations.insert(name.into(), value);
        self
    }

    /// Returns true if the column is flagged as autoincrement under either
    /// the current or the legacy annotation name.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        [AUTOINCREMENT_ANNOTATION, LEGACY_AUTOINCREMENT_ANNOTATION]
            .iter()
            .filter_map(|key| self.annotations.get(*key))
            .any(|value| value.as_bool().unwrap_or(false))
    }
}

/// Schema definition for a primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimaryKeySchema {
    /// Constraint name, if the model names it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Key column(s), in key order.
    pub columns: Vec<String>,
}

impl PrimaryKeySchema {
    /// Creates an unnamed primary key.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            name: None,
            columns,
        }
    }

    /// Creates a named primary key.
    #[must_use]
    pub fn named(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: Some(name.into()),
            columns,
        }
    }
}

/// Schema definition for a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Constraint name.
    pub name: String,
    /// Column(s) in the referencing table.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub references_table: String,
    /// Referenced column(s).
    pub references_columns: Vec<String>,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

/// Schema definition for an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Columns included in the index.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
    /// Partial index condition (WHERE clause).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Returns the name prefix shared by every conventionally named index on `table`.
#[must_use]
pub fn index_prefix(table: &str) -> String {
    format!("IX_{table}_")
}

/// Returns the conventional index name for `columns` on `table`.
#[must_use]
pub fn index_name(table: &str, columns: &[String]) -> String {
    format!("{}{}", index_prefix(table), columns.join("_"))
}

/// Schema definition for a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Columns that form the unique constraint.
    pub columns: Vec<String>,
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<ColumnSchema>,
    /// Primary key, if any.
    #[serde(default)]
    pub primary_key: Option<PrimaryKeySchema>,
    /// Index definitions.
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
    /// Foreign key definitions.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySchema>,
    /// Unique constraint definitions.
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl TableSchema {
    /// Creates a new table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    /// Adds a column to the table.
    ///
    /// A column built with [`ColumnSchema::primary_key`] joins the table's
    /// primary key; the column flag itself is left to the dialect to decide.
    #[must_use]
    pub fn column(mut self, mut column: ColumnSchema) -> Self {
        if column.primary_key {
            column.primary_key = false;
            let pk = self
                .primary_key
                .get_or_insert_with(|| PrimaryKeySchema::new(Vec::new()));
            if !pk.columns.contains(&column.name) {
                pk.columns.push(column.name.clone());
            }
        }
        self.columns.push(column);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, primary_key: PrimaryKeySchema) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeySchema) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique_constraint(mut self, constraint: UniqueConstraint) -> Self {
        self.unique_constraints.push(constraint);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// The complete database schema (all tables).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// All tables in the database.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    /// Creates a new empty database schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table to the schema.
    #[must_use]
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_column_joins_table_key() {
        let table = TableSchema::new("Blog")
            .column(ColumnSchema::new("Id", SqlType::Integer).primary_key())
            .column(ColumnSchema::new("Url", SqlType::Text).not_null());

        let pk = table.primary_key.as_ref().unwrap();
        assert_eq!(pk.columns, vec!["Id"]);
        assert!(pk.name.is_none());
        // The table owns the key; inlining is the dialect's call.
        assert!(!table.get_column("Id").unwrap().primary_key);
        assert!(!table.get_column("Id").unwrap().nullable);
    }

    #[test]
    fn test_auto_increment_reads_both_annotation_names() {
        let current = ColumnSchema::new("Id", SqlType::Integer).auto_increment();
        assert!(current.is_auto_increment());

        let legacy = ColumnSchema::new("Id", SqlType::Integer)
            .annotation(LEGACY_AUTOINCREMENT_ANNOTATION, serde_json::Value::Bool(true));
        assert!(legacy.is_auto_increment());

        let disabled = ColumnSchema::new("Id", SqlType::Integer)
            .annotation(AUTOINCREMENT_ANNOTATION, serde_json::Value::Bool(false));
        assert!(!disabled.is_auto_increment());

        assert!(!ColumnSchema::new("Id", SqlType::Integer).is_auto_increment());
    }

    #[test]
    fn test_default_value_to_sql() {
        assert_eq!(DefaultValue::None.to_sql(), None);
        assert_eq!(DefaultValue::Null.to_sql(), Some("NULL".to_string()));
        assert_eq!(DefaultValue::Bool(true).to_sql(), Some("1".to_string()));
        assert_eq!(DefaultValue::Integer(42).to_sql(), Some("42".to_string()));
        assert_eq!(
            DefaultValue::String("it's".to_string()).to_sql(),
            Some("'it''s'".to_string())
        );
        assert_eq!(
            DefaultValue::Expression("CURRENT_TIMESTAMP".to_string()).to_sql(),
            Some("(CURRENT_TIMESTAMP)".to_string())
        );
    }

    #[test]
    fn test_index_naming_convention() {
        let name = index_name("Post", &["BlogId".to_string(), "Title".to_string()]);
        assert_eq!(name, "IX_Post_BlogId_Title");
        assert!(name.starts_with(&index_prefix("Post")));
    }

    #[test]
    fn test_column_deserializes_with_defaults() {
        let column: ColumnSchema =
            serde_json::from_str(r#"{"name": "Rating", "sql_type": "Integer"}"#).unwrap();
        assert!(column.nullable);
        assert_eq!(column.default, DefaultValue::None);
        assert!(column.annotations.is_empty());
    }

    #[test]
    fn test_sqlite_type_names() {
        assert_eq!(SqlType::BigInt.sqlite_name(), "INTEGER");
        assert_eq!(SqlType::Varchar(255).sqlite_name(), "TEXT");
        assert_eq!(SqlType::Boolean.sqlite_name(), "INTEGER");
        assert_eq!(SqlType::Decimal(10, 2).sqlite_name(), "NUMERIC");
        assert_eq!(SqlType::Blob.sqlite_name(), "BLOB");
    }
}
