use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{instrument, warn};
use crate::dialect::Dialect;
use crate::models::{ForeignKey, HasTables, Schema, Table, TableRef, TableType, TriggerType};
use crate::Result;

mod ddl;
mod naming;
mod exporter;

pub use ddl::DdlQueryBuilder;
pub use naming::*;
pub use exporter::*;

/// Kinds of objects the generator can script.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ObjectType {
    Table,
    PrimaryKey,
    Index,
    ForeignKey,
    Trigger,
    ColumnTrigger,
    Sequence,
}

impl ObjectType {
    pub const ALL: [ObjectType; 7] = [
        ObjectType::Table,
        ObjectType::PrimaryKey,
        ObjectType::Index,
        ObjectType::ForeignKey,
        ObjectType::Trigger,
        ObjectType::ColumnTrigger,
        ObjectType::Sequence,
    ];
}

/// When deferred foreign keys get another chance to be emitted.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum GroupScriptsBy {
    /// After every table.
    #[default]
    Table,
    /// Once every table has been created.
    MetaData,
}

#[derive(Debug, Clone)]
pub struct ScriptGeneratorOptions {
    pub object_types: HashSet<ObjectType>,
    pub group_scripts_by: GroupScriptsBy,
    /// Tables of other types are skipped.
    pub table_types: HashSet<TableType>,
}

impl Default for ScriptGeneratorOptions {
    fn default() -> Self {
        Self {
            object_types: ObjectType::ALL.into_iter().collect(),
            group_scripts_by: GroupScriptsBy::Table,
            table_types: HashSet::from([TableType::Table]),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingForeignKey {
    name: String,
    foreign_key: ForeignKey,
}

/// State of one generator invocation: the tables created so far and the foreign keys
/// waiting for the table they reference.
#[derive(Debug, Default)]
pub struct ScriptContext {
    emitted: Vec<TableRef>,
    pending: BTreeMap<TableRef, Vec<PendingForeignKey>>,
}

impl ScriptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_emitted(&self, table: &TableRef) -> bool {
        self.emitted.iter().any(|t| t.matches(table))
    }

    /// Foreign keys still waiting for their referenced table.
    pub fn pending_foreign_keys(&self) -> usize {
        self.pending.values().map(|v| v.len()).sum()
    }

    fn mark_emitted(&mut self, table: TableRef) {
        self.emitted.push(table);
    }

    fn defer(&mut self, name: String, foreign_key: ForeignKey) {
        self.pending
            .entry(foreign_key.primary_table.clone())
            .or_default()
            .push(PendingForeignKey { name, foreign_key });
    }

    fn take_ready(&mut self) -> Vec<PendingForeignKey> {
        let ready = self.pending.keys().filter(|k| self.is_emitted(k)).cloned().collect::<Vec<_>>();
        ready.into_iter().flat_map(|k| self.pending.remove(&k).unwrap_or_default()).collect()
    }

    fn take_all(&mut self) -> Vec<PendingForeignKey> {
        std::mem::take(&mut self.pending).into_values().flatten().collect()
    }
}

/// Produces ordered create and drop scripts for the tables of a database.
///
/// A foreign key is emitted once the table it references has been created. Keys that are
/// still waiting at the end, because their tables reference each other, are emitted
/// anyway so none of them is lost.
pub struct ScriptGenerator {
    dialect: Arc<dyn Dialect>,
    naming: NamingStrategy,
    options: ScriptGeneratorOptions,
}

impl ScriptGenerator {
    pub fn new(dialect: Arc<dyn Dialect>, options: ScriptGeneratorOptions) -> Self {
        Self {
            dialect,
            naming: NamingStrategy,
            options,
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn includes(&self, object_type: ObjectType) -> bool {
        self.options.object_types.contains(&object_type)
    }

    fn tables<'a>(&self, container: &'a impl HasTables) -> Vec<&'a Table> {
        container
            .tables()
            .into_iter()
            .filter(|t| self.options.table_types.contains(&t.table_type))
            .collect()
    }

    fn scripts_sequences(&self) -> bool {
        self.includes(ObjectType::Sequence) && self.dialect.supports_sequence()
    }

    #[instrument(skip_all)]
    pub fn create_scripts(&self, container: &impl HasTables) -> Result<Vec<String>> {
        let mut context = ScriptContext::new();
        let mut scripts = Vec::new();

        if self.scripts_sequences() {
            for schema in container.schemas() {
                self.create_sequence_scripts(schema, &mut scripts);
            }
        }

        for table in self.tables(container) {
            self.create_table_scripts(table, &mut context, &mut scripts)?;
            if self.options.group_scripts_by == GroupScriptsBy::Table {
                self.flush_ready(&mut context, &mut scripts);
            }
        }

        self.flush_ready(&mut context, &mut scripts);
        self.force_pending(&mut context, &mut scripts);

        Ok(scripts)
    }

    #[instrument(skip_all)]
    pub fn drop_scripts(&self, container: &impl HasTables) -> Result<Vec<String>> {
        let mut scripts = Vec::new();
        let tables = self.tables(container);

        self.drop_constraint_scripts(&tables, &mut scripts);

        if self.includes(ObjectType::Table) {
            for table in tables.iter().rev() {
                scripts.push(ddl::drop_table(self.dialect(), &table.table_ref()));
            }
        }

        if self.scripts_sequences() {
            for schema in container.schemas() {
                self.drop_sequence_scripts(schema, &mut scripts);
            }
        }

        Ok(scripts)
    }

    /// Drops and recreates everything. Grouped by metadata, this is the drop script
    /// followed by the create script. Grouped by table, every table is dropped right
    /// before it is recreated, once the constraints between tables are gone.
    #[instrument(skip_all)]
    pub fn drop_create_scripts(&self, container: &impl HasTables) -> Result<Vec<String>> {
        if self.options.group_scripts_by == GroupScriptsBy::MetaData {
            let mut scripts = self.drop_scripts(container)?;
            scripts.extend(self.create_scripts(container)?);
            return Ok(scripts);
        }

        let mut context = ScriptContext::new();
        let mut scripts = Vec::new();
        let tables = self.tables(container);

        self.drop_constraint_scripts(&tables, &mut scripts);

        if self.scripts_sequences() {
            for schema in container.schemas() {
                self.drop_sequence_scripts(schema, &mut scripts);
                self.create_sequence_scripts(schema, &mut scripts);
            }
        }

        for table in tables {
            if self.includes(ObjectType::Table) {
                scripts.push(ddl::drop_table(self.dialect(), &table.table_ref()));
            }
            self.create_table_scripts(table, &mut context, &mut scripts)?;
            self.flush_ready(&mut context, &mut scripts);
        }

        self.force_pending(&mut context, &mut scripts);

        Ok(scripts)
    }

    fn create_sequence_scripts(&self, schema: &Schema, scripts: &mut Vec<String>) {
        for (name, sequence) in self.sequence_names(schema) {
            scripts.push(ddl::create_sequence(self.dialect(), schema.catalog.as_ref(), schema.name.as_ref(), &name, sequence));
        }
    }

    fn drop_sequence_scripts(&self, schema: &Schema, scripts: &mut Vec<String>) {
        for (name, _) in self.sequence_names(schema) {
            scripts.push(ddl::drop_sequence(self.dialect(), schema.catalog.as_ref(), schema.name.as_ref(), &name));
        }
    }

    fn sequence_names<'a>(&self, schema: &'a Schema) -> Vec<(String, &'a crate::models::Sequence)> {
        let candidates = schema.sequences.iter().filter(|s| s.name.is_none()).count();
        let mut position = 0;

        schema
            .sequences
            .iter()
            .map(|sequence| {
                let name = self.naming.sequence_name(sequence, schema.name.as_ref(), position, candidates);
                if sequence.name.is_none() {
                    position += 1;
                }
                (name, sequence)
            })
            .collect()
    }

    fn create_table_scripts(&self, table: &Table, context: &mut ScriptContext, scripts: &mut Vec<String>) -> Result {
        let dialect = self.dialect();
        let table_ref = table.table_ref();
        let index_names = self.index_names(table);

        if self.includes(ObjectType::Table) {
            let mut builder = DdlQueryBuilder::new(dialect);
            let mut table_builder = builder.create_table(&table_ref);

            let mut columns = table.columns.iter().collect::<Vec<_>>();
            columns.sort_by_key(|c| c.position);

            for column in columns {
                let type_name = dialect.type_name(column)?;
                let mut column_builder = table_builder.column(column.name.value(), &type_name);

                if !column.is_nullable {
                    column_builder.not_null();
                }
                match (column.auto_increment, dialect.identity_clause(), &column.default_value) {
                    (true, Some(identity), _) => {
                        column_builder.identity(identity);
                    }
                    (false, _, Some(default_value)) => {
                        column_builder.default_value(default_value);
                    }
                    _ => {}
                }
                if let Some(check) = &column.check {
                    column_builder.check(check);
                }
            }

            if let (true, Some(pk)) = (self.includes(ObjectType::PrimaryKey), &table.primary_key) {
                table_builder.primary_key(pk.name.as_ref().map(|n| n.value()), pk.columns.iter().map(|c| c.value()));
            }

            if self.includes(ObjectType::Index) && dialect.supports_index_in_create_table() {
                for (name, index) in &index_names {
                    table_builder.index(name, index);
                }
            }

            scripts.push(builder.build());
        }

        if self.includes(ObjectType::Index) && !dialect.supports_index_in_create_table() {
            for (name, index) in &index_names {
                scripts.push(ddl::create_index(dialect, &table_ref, name, index));
            }
        }

        context.mark_emitted(table_ref);

        if self.includes(ObjectType::ForeignKey) {
            let by_table = self.options.group_scripts_by == GroupScriptsBy::Table;
            for (name, foreign_key) in self.foreign_key_names(table) {
                if by_table && context.is_emitted(&foreign_key.primary_table) {
                    scripts.push(ddl::add_foreign_key(dialect, &name, foreign_key));
                } else {
                    context.defer(name, foreign_key.clone());
                }
            }
        }

        for (name, trigger) in self.trigger_names(table) {
            scripts.push(ddl::create_trigger(dialect, &name, trigger));
        }

        Ok(())
    }

    fn drop_constraint_scripts(&self, tables: &[&Table], scripts: &mut Vec<String>) {
        if !self.dialect.supports_drop_constraints() {
            return;
        }

        for table in tables {
            let table_ref = table.table_ref();
            if self.includes(ObjectType::ForeignKey) {
                for (name, _) in self.foreign_key_names(table) {
                    scripts.push(self.dialect.drop_foreign_key_sql(&table_ref, &name));
                }
            }
            for (name, _) in self.trigger_names(table) {
                scripts.push(self.dialect.drop_trigger_sql(&table_ref, &name));
            }
        }
    }

    fn flush_ready(&self, context: &mut ScriptContext, scripts: &mut Vec<String>) {
        for pending in context.take_ready() {
            scripts.push(ddl::add_foreign_key(self.dialect(), &pending.name, &pending.foreign_key));
        }
    }

    fn force_pending(&self, context: &mut ScriptContext, scripts: &mut Vec<String>) {
        for pending in context.take_all() {
            warn!(
                "Emitting foreign key {} before its referenced table {} was created",
                pending.name, pending.foreign_key.primary_table
            );
            scripts.push(ddl::add_foreign_key(self.dialect(), &pending.name, &pending.foreign_key));
        }
    }

    fn index_names<'a>(&self, table: &'a Table) -> Vec<(String, &'a crate::models::Index)> {
        let indexes = table.indexes.iter().filter(|i| !i.primary).collect::<Vec<_>>();
        let candidates = indexes.iter().filter(|i| i.name.is_none()).count();
        let mut position = 0;

        indexes
            .into_iter()
            .map(|index| {
                let name = self.naming.index_name(table, index, position, candidates);
                if index.name.is_none() {
                    position += 1;
                }
                (name, index)
            })
            .collect()
    }

    fn foreign_key_names<'a>(&self, table: &'a Table) -> Vec<(String, &'a ForeignKey)> {
        let candidates = table.foreign_keys.iter().filter(|f| f.name.is_none()).count();
        let mut position = 0;

        table
            .foreign_keys
            .iter()
            .map(|foreign_key| {
                let name = self.naming.foreign_key_name(foreign_key, position, candidates);
                if foreign_key.name.is_none() {
                    position += 1;
                }
                (name, foreign_key)
            })
            .collect()
    }

    /// Triggers of the selected kinds, with their names.
    fn trigger_names<'a>(&self, table: &'a Table) -> Vec<(String, &'a crate::models::Trigger)> {
        let triggers = table
            .triggers
            .iter()
            .filter(|t| match t.trigger_type {
                TriggerType::Trigger => self.includes(ObjectType::Trigger),
                TriggerType::ColumnTrigger => self.includes(ObjectType::ColumnTrigger),
            })
            .collect::<Vec<_>>();
        let candidates = triggers.iter().filter(|t| t.name.is_none()).count();
        let mut position = 0;

        triggers
            .into_iter()
            .map(|trigger| {
                let name = self.naming.trigger_name(trigger, position, candidates);
                if trigger.name.is_none() {
                    position += 1;
                }
                (name, trigger)
            })
            .collect()
    }
}
