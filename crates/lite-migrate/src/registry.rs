//! Tables awaiting a rebuild.

/// A column rename absorbed into a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRename {
    /// Column name before the rename.
    pub old_name: String,
    /// Column name after the rename.
    pub new_name: String,
}

/// A table registered for rebuild, with the renames recorded against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildEntry {
    /// Table name.
    pub table: String,
    /// Renames in the order they were received.
    pub renames: Vec<ColumnRename>,
}

impl RebuildEntry {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            renames: Vec::new(),
        }
    }

    /// Returns the name a final column had in the table being rebuilt.
    ///
    /// Chained renames (`a -> b`, then `b -> c`) resolve back to `a`.
    #[must_use]
    pub fn source_column<'a>(&'a self, final_name: &'a str) -> &'a str {
        let mut current = final_name;
        for rename in self.renames.iter().rev() {
            if rename.new_name == current {
                current = &rename.old_name;
            }
        }
        current
    }
}

/// Tables registered for rebuild during one planning run.
///
/// Iteration follows first-registration order.
#[derive(Debug, Clone, Default)]
pub struct RebuildRegistry {
    entries: Vec<RebuildEntry>,
}

impl RebuildRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `table` for rebuild. Registering twice is a no-op.
    pub fn register(&mut self, table: &str) -> &mut RebuildEntry {
        let idx = match self.entries.iter().position(|e| e.table == table) {
            Some(idx) => idx,
            None => {
                self.entries.push(RebuildEntry::new(table));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    /// Registers `table` and appends a column rename to it.
    pub fn record_rename(&mut self, table: &str, old_name: &str, new_name: &str) {
        self.register(table).renames.push(ColumnRename {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
    }

    /// Returns the entry for `table`, if registered.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&RebuildEntry> {
        self.entries.iter().find(|e| e.table == table)
    }

    /// Returns the number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no table is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RebuildEntry> {
        self.entries.iter()
    }

    /// Forgets every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns every entry in registration order.
    pub fn drain(&mut self) -> impl Iterator<Item = RebuildEntry> + '_ {
        self.entries.drain(..)
    }
}
