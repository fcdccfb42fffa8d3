use std::sync::Arc;
use time::UtcOffset;
use tracing::{debug, info, instrument};
use crate::catalog::{Catalog, CatalogEntry, CatalogReader};
use crate::codec::{CodecOptions, CodecRegistry, ParameterRow};
use crate::connection::{Connection, ConnectionProvider, InsertQuery};
use crate::dialect::Dialect;
use crate::helpers::RunningFlag;
use crate::models::{Database, Table};
use crate::{MigrantToolsError, Result};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Time zone the dumped timestamps were taken in.
    pub time_zone: Option<UtcOffset>,
    /// Rows sent to the target per insert batch.
    pub batch_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            time_zone: None,
            batch_size: 1000,
        }
    }
}

/// Replays a catalog into a target database, one entry after the other, on a single
/// connection and transaction.
pub struct LoadJob<P: ConnectionProvider> {
    provider: P,
    dialect: Arc<dyn Dialect>,
    registry: CodecRegistry,
    options: LoadOptions,
    running: RunningFlag,
}

impl<P: ConnectionProvider> LoadJob<P> {
    pub fn new(provider: P, dialect: Arc<dyn Dialect>, options: LoadOptions) -> Self {
        let registry = CodecRegistry::with_default_codecs().with_dialect(dialect.clone());
        Self {
            provider,
            dialect,
            registry,
            options,
            running: RunningFlag::new(),
        }
    }

    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn running_flag(&self) -> RunningFlag {
        self.running.clone()
    }

    /// Loads every entry of the catalog into the matching tables of `target`, then commits
    /// once. Any failure aborts the load, rolling back is left to the caller.
    #[instrument(skip_all)]
    pub async fn load(&self, catalog: &Catalog, target: &Database) -> Result<u64> {
        let reader = catalog.open_reader().await?;
        let mut connection = self.provider.open_connection().await?;

        connection.begin().await?;
        let codec_options = self.prepare_session(&mut connection).await?;

        let mut total = 0;
        for entry in reader.entries() {
            total += self.load_entry(&reader, entry, target, &mut connection, codec_options).await?;
        }

        connection.commit().await?;
        info!("Loaded {} rows from {} entries", total, reader.entries().len());

        Ok(total)
    }

    /// Uses the session time zone when the target has one, otherwise the codecs shift the
    /// timestamps themselves.
    async fn prepare_session(&self, connection: &mut P::Connection) -> Result<CodecOptions> {
        let Some(time_zone) = self.options.time_zone else {
            return Ok(CodecOptions::default());
        };

        if self.dialect.supports_session_time_zone() {
            if let Some(sql) = self.dialect.session_time_zone_sql(time_zone) {
                debug!("Setting session time zone: {}", sql);
                connection.execute(&sql).await?;
                return Ok(CodecOptions::default());
            }
        }

        Ok(CodecOptions::with_time_zone(time_zone))
    }

    #[instrument(skip_all, fields(entry = %entry.name))]
    async fn load_entry(&self, reader: &CatalogReader, entry: &CatalogEntry, target: &Database, connection: &mut P::Connection, codec_options: CodecOptions) -> Result<u64> {
        if entry.columns.is_empty() {
            debug!("Skipping {}, it has no columns", entry.name);
            return Ok(0);
        }

        let table = map_columns(entry, target)?;
        let insert = InsertQuery {
            table: table.table_ref(),
            columns: entry
                .columns
                .iter()
                .filter_map(|c| table.column(&c.name).map(|column| column.name.clone()))
                .collect(),
        };

        let models = entry
            .columns
            .iter()
            .enumerate()
            .map(|(slot, c)| {
                let descriptor = table.column(&c.name).map(|column| &column.data_type).unwrap_or(&c.descriptor);
                self.registry.create_model(&c.name, descriptor, slot, codec_options)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Loading {} with: {}", entry.name, insert.to_sql(self.dialect.as_ref()));

        let mut data = reader.open_entry(entry).await?;
        let mut parameters = ParameterRow::new(models.len());
        let batch_size = self.options.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        let mut loaded = 0;

        while let Some(row) = data.next_row().await? {
            if !self.running.is_running() {
                return Err(MigrantToolsError::Cancelled);
            }

            for (model, value) in models.iter().zip(&row) {
                model.write(value, &mut parameters)?;
            }
            batch.push(parameters.take());

            if batch.len() >= batch_size {
                loaded += connection.insert_rows(&insert, &batch).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            loaded += connection.insert_rows(&insert, &batch).await?;
        }

        info!("Loaded {} rows into {}", loaded, insert.table);
        Ok(loaded)
    }
}

/// Finds the destination table of an entry and gives the destination columns the types
/// they were dumped with.
fn map_columns(entry: &CatalogEntry, target: &Database) -> Result<Table> {
    let table = match entry.row_set.table() {
        Some(table_ref) => target.find_table_ref(table_ref),
        None => target.find_table(&entry.name),
    }
    .ok_or_else(|| MigrantToolsError::TableNotFound(entry.name.clone()))?;

    let mut table = table.clone();
    let table_name = table.table_ref().to_string();

    for encoded in &entry.columns {
        let column = table.column_mut(&encoded.name).ok_or_else(|| MigrantToolsError::ColumnNotFound {
            table: table_name.clone(),
            column: encoded.name.clone(),
        })?;

        column.data_type = encoded.descriptor.clone();
        if let Some(precision) = encoded.precision {
            column.precision = precision;
        }
        if let Some(scale) = encoded.scale {
            column.scale = scale;
        }
    }

    Ok(table)
}
