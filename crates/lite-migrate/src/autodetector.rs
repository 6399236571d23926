//! Autodetector for generating migrations from schema changes.
//!
//! This module compares two database schemas and generates the migration
//! operations needed to transform one into the other. The planner also
//! uses it as a description oracle: diffing the empty model against the
//! target yields the from-scratch definition of every table.

use crate::operations::{ColumnChanges, MigrationOperation};
use crate::schema::{
    ColumnSchema, DatabaseSchema, ForeignKeySchema, IndexSchema, TableSchema, UniqueConstraint,
};

/// Computes the operations that turn one model into another.
pub trait ModelDiffer {
    /// Returns the operations needed to transform `from` into `to`.
    ///
    /// `None` stands for the empty model.
    fn diff(&self, from: Option<&DatabaseSchema>, to: &DatabaseSchema) -> Vec<MigrationOperation>;
}

/// Detects schema changes and generates migration operations.
///
/// Output order follows model declaration order, so the same pair of models
/// always yields the same operation list.
#[derive(Debug, Default, Clone, Copy)]
pub struct Autodetector;

impl Autodetector {
    /// Creates a new autodetector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Operations that create `table` from nothing.
    fn create_table(table: &TableSchema) -> Vec<MigrationOperation> {
        let mut operations = vec![MigrationOperation::CreateTable {
            name: table.name.clone(),
            columns: table.columns.clone(),
            primary_key: table.primary_key.clone(),
            foreign_keys: table.foreign_keys.clone(),
            unique_constraints: table.unique_constraints.clone(),
            if_not_exists: false,
        }];
        operations.extend(
            table
                .indexes
                .iter()
                .map(|idx| MigrationOperation::create_index(&table.name, idx)),
        );
        operations
    }

    /// Compares two tables and returns the operations needed.
    fn diff_table(&self, from: &TableSchema, to: &TableSchema) -> Vec<MigrationOperation> {
        let mut operations = Vec::new();
        let table_name = &to.name;

        for col in &to.columns {
            match from.get_column(&col.name) {
                None => operations.push(MigrationOperation::add_column(table_name, col.clone())),
                Some(from_col) => {
                    if let Some(changes) = self.diff_column(from_col, col) {
                        operations.push(MigrationOperation::alter_column(
                            table_name,
                            &col.name,
                            changes,
                        ));
                    }
                }
            }
        }

        for col in &from.columns {
            if to.get_column(&col.name).is_none() {
                operations.push(MigrationOperation::drop_column(table_name, &col.name));
            }
        }

        if from.primary_key != to.primary_key {
            if let Some(pk) = &from.primary_key {
                operations.push(MigrationOperation::drop_primary_key(
                    table_name,
                    pk.name.clone(),
                ));
            }
            if let Some(pk) = &to.primary_key {
                operations.push(MigrationOperation::add_primary_key(table_name, pk.clone()));
            }
        }

        operations.extend(self.diff_indexes(table_name, &from.indexes, &to.indexes));
        operations.extend(self.diff_foreign_keys(table_name, &from.foreign_keys, &to.foreign_keys));
        operations.extend(self.diff_unique_constraints(
            table_name,
            &from.unique_constraints,
            &to.unique_constraints,
        ));

        operations
    }

    /// Compares two columns and returns changes if any.
    fn diff_column(&self, from: &ColumnSchema, to: &ColumnSchema) -> Option<ColumnChanges> {
        let mut changes = ColumnChanges::new();

        if from.sql_type != to.sql_type {
            changes.sql_type = Some(to.sql_type.clone());
        }

        if from.nullable != to.nullable {
            changes.nullable = Some(to.nullable);
        }

        if from.default != to.default {
            changes.default = Some(to.default.clone());
        }

        if from.unique != to.unique {
            changes.unique = Some(to.unique);
        }

        if changes.is_empty() {
            None
        } else {
            Some(changes)
        }
    }

    /// Compares indexes and returns operations.
    fn diff_indexes(
        &self,
        table: &str,
        from: &[IndexSchema],
        to: &[IndexSchema],
    ) -> Vec<MigrationOperation> {
        let mut operations = Vec::new();

        for idx in from {
            match to.iter().find(|i| i.name == idx.name) {
                Some(to_idx) if to_idx == idx => {}
                _ => operations.push(MigrationOperation::drop_index(
                    &idx.name,
                    Some(table.to_string()),
                )),
            }
        }

        // Modified indexes were dropped above and are recreated here.
        for idx in to {
            match from.iter().find(|i| i.name == idx.name) {
                Some(from_idx) if from_idx == idx => {}
                _ => operations.push(MigrationOperation::create_index(table, idx)),
            }
        }

        operations
    }

    /// Compares foreign keys and returns operations.
    fn diff_foreign_keys(
        &self,
        table: &str,
        from: &[ForeignKeySchema],
        to: &[ForeignKeySchema],
    ) -> Vec<MigrationOperation> {
        let mut operations = Vec::new();

        for fk in from {
            match to.iter().find(|f| f.name == fk.name) {
                Some(to_fk) if to_fk == fk => {}
                _ => operations.push(MigrationOperation::drop_foreign_key(table, &fk.name)),
            }
        }

        for fk in to {
            match from.iter().find(|f| f.name == fk.name) {
                Some(from_fk) if from_fk == fk => {}
                _ => operations.push(MigrationOperation::add_foreign_key(table, fk.clone())),
            }
        }

        operations
    }

    /// Compares unique constraints and returns operations.
    fn diff_unique_constraints(
        &self,
        table: &str,
        from: &[UniqueConstraint],
        to: &[UniqueConstraint],
    ) -> Vec<MigrationOperation> {
        let mut operations = Vec::new();

        for uc in from {
            match to.iter().find(|u| u.name == uc.name) {
                Some(to_uc) if to_uc == uc => {}
                _ => operations.push(MigrationOperation::drop_unique_constraint(table, &uc.name)),
            }
        }

        for uc in to {
            match from.iter().find(|u| u.name == uc.name) {
                Some(from_uc) if from_uc == uc => {}
                _ => operations.push(MigrationOperation::add_unique_constraint(
                    table,
                    &uc.name,
                    uc.columns.clone(),
                )),
            }
        }

        operations
    }
}

impl ModelDiffer for Autodetector {
    fn diff(&self, from: Option<&DatabaseSchema>, to: &DatabaseSchema) -> Vec<MigrationOperation> {
        let empty = DatabaseSchema::new();
        let from = from.unwrap_or(&empty);
        let mut operations = Vec::new();

        for table in &to.tables {
            if from.get_table(&table.name).is_none() {
                operations.extend(Self::create_table(table));
            }
        }

        for table in &from.tables {
            if to.get_table(&table.name).is_none() {
                operations.push(MigrationOperation::drop_table(&table.name));
            }
        }

        for to_table in &to.tables {
            if let Some(from_table) = from.get_table(&to_table.name) {
                operations.extend(self.diff_table(from_table, to_table));
            }
        }

        operations
    }
}
