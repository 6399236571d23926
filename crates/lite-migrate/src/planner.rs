//! Migration planning for SQLite.
//!
//! SQLite's `ALTER TABLE` can rename a table or column and add a column.
//! Everything else (dropping columns, changing column definitions, adding
//! or removing keys and constraints) is done by rebuilding the table:
//!
//! 1. `PRAGMA foreign_keys=OFF;` (outside the transaction)
//! 2. create `<table>_new` with the table's final shape
//! 3. copy every row across, reading renamed columns by their old name
//! 4. drop the original table
//! 5. rename `<table>_new` to `<table>`
//! 6. recreate the table's indexes
//! 7. `PRAGMA foreign_keys=ON;` (outside the transaction)
//!
//! [`MigrationPlanner::plan`] classifies a batch of operations, passes
//! through what SQLite can run, and appends one such script per table
//! that needs rebuilding.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::autodetector::{Autodetector, ModelDiffer};
use crate::dialect::{MigrationDialect, MigrationStatement};
use crate::error::{PlanningError, Result};
use crate::operations::MigrationOperation;
use crate::registry::{RebuildEntry, RebuildRegistry};
use crate::schema::DatabaseSchema;

/// Disables foreign key enforcement for the connection.
pub const FOREIGN_KEYS_OFF: &str = "PRAGMA foreign_keys=OFF;";

/// Re-enables foreign key enforcement for the connection.
pub const FOREIGN_KEYS_ON: &str = "PRAGMA foreign_keys=ON;";

/// Suffix appended to a table name to name its shadow table.
pub const SHADOW_TABLE_SUFFIX: &str = "_new";

/// Returns the shadow table name used while rebuilding `table`.
#[must_use]
pub fn shadow_table_name(table: &str) -> String {
    format!("{table}{SHADOW_TABLE_SUFFIX}")
}

/// Options for the migration planner.
#[derive(Debug, Clone)]
pub struct PlannerOptions {
    /// Fail when the target model already has a table named like a shadow table.
    pub check_shadow_collisions: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            check_shadow_collisions: true,
        }
    }
}

impl PlannerOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaves shadow-name collisions to the caller.
    #[must_use]
    pub fn without_collision_check(mut self) -> Self {
        self.check_shadow_collisions = false;
        self
    }
}

/// Plans SQLite-executable migrations.
///
/// A planner keeps per-run state; use one instance per migration at a time.
#[derive(Debug)]
pub struct MigrationPlanner<D: MigrationDialect, M: ModelDiffer = Autodetector> {
    dialect: D,
    differ: M,
    options: PlannerOptions,
    registry: RebuildRegistry,
}

impl<D: MigrationDialect> MigrationPlanner<D, Autodetector> {
    /// Creates a planner backed by the built-in [`Autodetector`].
    pub fn with_dialect(dialect: D) -> Self {
        Self::new(dialect, Autodetector::new())
    }
}

impl<D: MigrationDialect, M: ModelDiffer> MigrationPlanner<D, M> {
    /// Creates a new planner with default options.
    pub fn new(dialect: D, differ: M) -> Self {
        Self::with_options(dialect, differ, PlannerOptions::default())
    }

    /// Creates a new planner with custom options.
    pub fn with_options(dialect: D, differ: M, options: PlannerOptions) -> Self {
        Self {
            dialect,
            differ,
            options,
            registry: RebuildRegistry::new(),
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Returns the tables registered by the last [`classify`](Self::classify).
    #[must_use]
    pub fn registry(&self) -> &RebuildRegistry {
        &self.registry
    }

    /// Splits a batch into pass-through operations and rebuild registrations.
    ///
    /// A foreign key added to a table created earlier in the batch is folded
    /// into that `CreateTable`. The registry is reset first.
    pub fn classify(&mut self, operations: &[MigrationOperation]) -> Vec<MigrationOperation> {
        self.registry.clear();

        let mut planned: Vec<MigrationOperation> = Vec::with_capacity(operations.len());
        // Tables created in this batch -> position of their CreateTable in `planned`.
        let mut created: HashMap<&str, usize> = HashMap::new();

        for operation in operations {
            match operation {
                MigrationOperation::CreateTable { name, .. } => {
                    created.insert(name.as_str(), planned.len());
                    planned.push(operation.clone());
                }

                MigrationOperation::DropTable { name, .. } => {
                    created.remove(name.as_str());
                    planned.push(operation.clone());
                }

                MigrationOperation::RenameTable { old_name, new_name } => {
                    if let Some(idx) = created.remove(old_name.as_str()) {
                        created.insert(new_name.as_str(), idx);
                    }
                    planned.push(operation.clone());
                }

                MigrationOperation::AddForeignKey { table, foreign_key } => {
                    let create = match created.get(table.as_str()) {
                        Some(&idx) => planned.get_mut(idx),
                        None => None,
                    };
                    match create {
                        Some(MigrationOperation::CreateTable { foreign_keys, .. }) => {
                            debug!(
                                table = %table,
                                foreign_key = %foreign_key.name,
                                "Folding foreign key into CreateTable"
                            );
                            foreign_keys.push(foreign_key.clone());
                        }
                        _ => self.register(table, operation),
                    }
                }

                MigrationOperation::RenameColumn {
                    table,
                    old_name,
                    new_name,
                } => {
                    self.register(table, operation);
                    self.registry.record_rename(table, old_name, new_name);
                }

                MigrationOperation::AddPrimaryKey { table, .. }
                | MigrationOperation::AddUniqueConstraint { table, .. }
                | MigrationOperation::DropColumn { table, .. }
                | MigrationOperation::DropForeignKey { table, .. }
                | MigrationOperation::DropPrimaryKey { table, .. }
                | MigrationOperation::DropUniqueConstraint { table, .. }
                | MigrationOperation::RenameIndex { table, .. }
                | MigrationOperation::AlterColumn { table, .. } => {
                    self.register(table, operation);
                }

                MigrationOperation::AddColumn { .. }
                | MigrationOperation::CreateIndex { .. }
                | MigrationOperation::DropIndex { .. }
                | MigrationOperation::EnsureSchema { .. }
                | MigrationOperation::DropSchema { .. }
                | MigrationOperation::CreateSequence { .. }
                | MigrationOperation::DropSequence { .. }
                | MigrationOperation::RenameSequence { .. }
                | MigrationOperation::AlterSequence { .. }
                | MigrationOperation::RunSql { .. } => planned.push(operation.clone()),
            }
        }

        planned
    }

    fn register(&mut self, table: &str, operation: &MigrationOperation) {
        debug!(
            table = %table,
            operation = %operation.description(),
            "Table registered for rebuild"
        );
        self.registry.register(table);
    }

    /// Plans a batch against the target model.
    ///
    /// Returns the pass-through operations followed by one rebuild script
    /// per registered table, in first-registration order. Nothing is
    /// returned unless every script could be built.
    pub fn plan(
        &mut self,
        operations: &[MigrationOperation],
        model: &DatabaseSchema,
    ) -> Result<Vec<MigrationOperation>> {
        let mut planned = self.classify(operations);
        if self.registry.is_empty() {
            return Ok(planned);
        }

        let entries: Vec<RebuildEntry> = self.registry.drain().collect();
        let definitions = self.differ.diff(None, model);

        for entry in &entries {
            planned.extend(self.rebuild_script(entry, &definitions, model)?);
        }

        info!(
            operations = operations.len(),
            rebuilt_tables = entries.len(),
            "Planned migration"
        );
        Ok(planned)
    }

    /// Plans a batch and emits the statements for it.
    pub fn generate(
        &mut self,
        operations: &[MigrationOperation],
        model: &DatabaseSchema,
    ) -> Result<Vec<MigrationStatement>> {
        let planned = self.plan(operations, model)?;

        let mut statements = Vec::new();
        for operation in &planned {
            statements.extend(self.dialect.generate_sql(operation)?);
        }

        debug!(
            dialect = self.dialect.name(),
            statements = statements.len(),
            "Generated migration SQL"
        );
        Ok(statements)
    }

    /// Builds the seven-step rebuild script for one table.
    fn rebuild_script(
        &self,
        entry: &RebuildEntry,
        definitions: &[MigrationOperation],
        model: &DatabaseSchema,
    ) -> Result<Vec<MigrationOperation>> {
        let table = entry.table.as_str();
        let shadow = shadow_table_name(table);

        if self.options.check_shadow_collisions && model.get_table(&shadow).is_some() {
            warn!(table = %table, shadow = %shadow, "Shadow table name is taken");
            return Err(PlanningError::ShadowTableCollision {
                table: table.to_string(),
                shadow,
            }
            .into());
        }

        let (shadow_create, columns) = shadow_definition(definitions, table, &shadow)
            .ok_or_else(|| {
                warn!(table = %table, "Table registered for rebuild is missing from the model");
                PlanningError::MissingTableDefinition {
                    table: table.to_string(),
                }
            })?;

        check_renames(entry, &columns)?;

        let sources: Vec<String> = columns
            .iter()
            .map(|c| entry.source_column(c).to_string())
            .collect();
        let copy = format!(
            "INSERT INTO {} ({}) SELECT {} FROM {};",
            self.dialect.quote_identifier(&shadow),
            self.dialect.quote_list(&columns),
            self.dialect.quote_list(&sources),
            self.dialect.quote_identifier(table)
        );

        let indexes: Vec<MigrationOperation> = definitions
            .iter()
            .filter(|op| matches!(op, MigrationOperation::CreateIndex { table: t, .. } if t == table))
            .cloned()
            .collect();

        info!(
            table = %table,
            columns = columns.len(),
            renames = entry.renames.len(),
            indexes = indexes.len(),
            "Rebuilding table"
        );

        let mut script = Vec::with_capacity(6 + indexes.len());
        script.push(MigrationOperation::run_sql_outside_transaction(FOREIGN_KEYS_OFF));
        script.push(shadow_create);
        script.push(MigrationOperation::run_sql(copy));
        script.push(MigrationOperation::drop_table(table));
        script.push(MigrationOperation::rename_table(&shadow, table));
        script.extend(indexes);
        script.push(MigrationOperation::run_sql_outside_transaction(FOREIGN_KEYS_ON));
        Ok(script)
    }
}

/// Finds the from-scratch definition of `table` and renames it to `shadow`.
///
/// Also returns the final column names in definition order.
fn shadow_definition(
    definitions: &[MigrationOperation],
    table: &str,
    shadow: &str,
) -> Option<(MigrationOperation, Vec<String>)> {
    definitions.iter().find_map(|op| match op {
        MigrationOperation::CreateTable {
            name,
            columns,
            primary_key,
            foreign_keys,
            unique_constraints,
            ..
        } if name == table => Some((
            MigrationOperation::CreateTable {
                name: shadow.to_string(),
                columns: columns.clone(),
                primary_key: primary_key.clone(),
                foreign_keys: foreign_keys.clone(),
                unique_constraints: unique_constraints.clone(),
                if_not_exists: false,
            },
            columns.iter().map(|c| c.name.clone()).collect(),
        )),
        _ => None,
    })
}

/// Every rename must land on a final column or feed a later rename.
fn check_renames(entry: &RebuildEntry, columns: &[String]) -> Result<()> {
    let finals: HashSet<&str> = columns.iter().map(String::as_str).collect();

    for (i, rename) in entry.renames.iter().enumerate() {
        let reaches_final = finals.contains(rename.new_name.as_str());
        let renamed_again = entry.renames[i + 1..]
            .iter()
            .any(|later| later.old_name == rename.new_name);

        if !reaches_final && !renamed_again {
            warn!(
                table = %entry.table,
                old_name = %rename.old_name,
                new_name = %rename.new_name,
                "Column rename does not match the rebuilt table"
            );
            return Err(PlanningError::StaleRename {
                table: entry.table.clone(),
                old_name: rename.old_name.clone(),
                new_name: rename.new_name.clone(),
            }
            .into());
        }
    }

    Ok(())
}
