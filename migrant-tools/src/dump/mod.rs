use std::num::NonZeroUsize;
use std::sync::Arc;
use futures::TryStreamExt;
use time::UtcOffset;
use tracing::{debug, info, instrument};
use crate::catalog::{Catalog, CatalogManifest, CatalogWriter, DataFormat, EncodedColumn, EntryWriter, RowSet};
use crate::codec::{CodecOptions, CodecRegistry};
use crate::connection::{Connection, ConnectionProvider, Query, RowCountMode, SelectQuery};
use crate::dialect::Dialect;
use crate::helpers::RunningFlag;
use crate::models::{DatabaseInfo, Identifier, Table, TypeCode};
use crate::parallel_runner::ParallelRunner;
use crate::split::{QueryLimit, QuerySplit, QuerySplitter};
use crate::{MigrantToolsError, Result};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// How many splits are extracted at the same time.
    pub max_parallelism: NonZeroUsize,
    pub data_format: DataFormat,
    /// Splits tables into pages of this many rows. Tables are dumped in one go when unset.
    pub query_limit: Option<QueryLimit>,
    pub row_count_mode: RowCountMode,
    pub time_zone: Option<UtcOffset>,
    /// Rows encoded by a split before they are appended to the data file.
    pub rows_per_chunk: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            max_parallelism: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            data_format: DataFormat::default(),
            query_limit: None,
            row_count_mode: RowCountMode::Exact,
            time_zone: None,
            rows_per_chunk: 1000,
        }
    }
}

/// A table scan to dump.
#[derive(Debug, Clone)]
pub struct TableQueryInfo {
    pub table: Table,
    /// Empty dumps every column.
    pub columns: Vec<Identifier>,
    pub filter: Option<String>,
    /// Overrides [`DumpOptions::query_limit`] for this table.
    pub limit: Option<QueryLimit>,
}

impl TableQueryInfo {
    /// Columns identifying a row: the primary key, else a unique index over non null
    /// columns. Pages ordered on anything else can overlap or skip rows.
    fn unique_key(&self) -> Option<Vec<Identifier>> {
        if let Some(pk) = self.table.primary_key.as_ref().filter(|pk| !pk.columns.is_empty()) {
            return Some(pk.columns.clone());
        }

        self.table
            .indexes
            .iter()
            .filter(|index| index.unique && index.predicate.is_none() && !index.columns.is_empty())
            .find(|index| {
                index
                    .columns
                    .iter()
                    .all(|c| self.table.column(c.name.value()).is_some_and(|column| !column.is_nullable))
            })
            .map(|index| index.columns.iter().map(|c| c.name.clone()).collect())
    }

    fn select_query(&self) -> SelectQuery {
        let mut select = SelectQuery::new(self.table.table_ref());
        select.columns = self.columns.clone();
        select.filter = self.filter.clone();
        select
    }
}

/// One unit of extraction.
#[derive(Debug, Clone)]
pub enum QueryInfo {
    Table(TableQueryInfo),
    Query {
        name: String,
        sql: String,
    },
}

impl QueryInfo {
    pub fn row_set(&self) -> RowSet {
        match self {
            QueryInfo::Table(info) => RowSet::Table {
                table: info.table.table_ref(),
            },
            QueryInfo::Query { name, sql } => RowSet::Query {
                name: name.clone(),
                query: sql.clone(),
            },
        }
    }
}

/// Extracts tables and queries from a database into a catalog.
pub struct DumpWriter<P: ConnectionProvider> {
    provider: Arc<P>,
    dialect: Arc<dyn Dialect>,
    registry: Arc<CodecRegistry>,
    catalog: Catalog,
    options: DumpOptions,
    query_infos: Vec<QueryInfo>,
    running: RunningFlag,
    source: Option<DatabaseInfo>,
}

impl<P: ConnectionProvider> DumpWriter<P> {
    pub fn new(provider: P, dialect: Arc<dyn Dialect>, catalog: Catalog, options: DumpOptions) -> Self {
        let registry = CodecRegistry::with_default_codecs().with_dialect(dialect.clone());
        Self {
            provider: Arc::new(provider),
            dialect,
            registry: Arc::new(registry),
            catalog,
            options,
            query_infos: Vec::new(),
            running: RunningFlag::new(),
            source: None,
        }
    }

    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Recorded in the manifest.
    pub fn with_source(mut self, source: DatabaseInfo) -> Self {
        self.source = Some(source);
        self
    }

    /// Stopping the flag ends the dump after the running splits have finished.
    pub fn running_flag(&self) -> RunningFlag {
        self.running.clone()
    }

    pub fn query_infos(&self) -> &[QueryInfo] {
        &self.query_infos
    }

    pub fn add_table(&mut self, table: &Table, columns: &[&str], filter: Option<&str>, limit: Option<QueryLimit>) -> Result {
        let columns = columns
            .iter()
            .map(|name| {
                table
                    .column(name)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| MigrantToolsError::ColumnNotFound {
                        table: table.table_ref().to_string(),
                        column: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        self.query_infos.push(QueryInfo::Table(TableQueryInfo {
            table: table.clone(),
            columns,
            filter: filter.map(|f| f.to_string()),
            limit,
        }));

        Ok(())
    }

    pub fn add_query(&mut self, name: &str, sql: &str) {
        self.query_infos.push(QueryInfo::Query {
            name: name.to_string(),
            sql: sql.to_string(),
        });
    }

    fn create_splitter(&self, info: &QueryInfo) -> QuerySplitter {
        match info {
            QueryInfo::Query { sql, .. } => QuerySplitter::no_limit(Query::Native(sql.clone())),
            QueryInfo::Table(table) => {
                let mut select = table.select_query();
                match (table.limit.or(self.options.query_limit), table.unique_key()) {
                    (Some(limit), Some(key)) if self.dialect.supports_limit_offset() => {
                        select.order_by = key;
                        let handler = self.dialect.create_row_count_handler(&select.table, select.filter.as_deref(), self.options.row_count_mode);
                        QuerySplitter::limit(select, limit, Arc::new(handler))
                    }
                    _ => QuerySplitter::no_limit(Query::Select(select)),
                }
            }
        }
    }

    /// Runs the dump. Every split is given a chance to finish before an error is reported,
    /// and the manifest is only written when all of them succeeded.
    #[instrument(skip_all)]
    pub async fn write(self) -> Result<CatalogManifest> {
        info!("Dumping {} queries to {}", self.query_infos.len(), self.catalog.dir().display());

        let mut writer = self.catalog.open_writer().await?;
        let mut runner = ParallelRunner::new(self.options.max_parallelism);

        let planned = self.start_splits(&mut writer, &mut runner).await;
        if planned.is_err() {
            runner.shutdown();
        }

        let results = runner.drain(&self.running).await;
        planned?;
        let results = results?;

        if !self.running.is_running() {
            return Err(MigrantToolsError::Cancelled);
        }

        let rows: u64 = results.iter().map(|(_, count)| count).sum();
        let manifest = writer.finish(self.source.clone()).await?;
        info!("Dumped {} rows in {} splits", rows, results.len());

        Ok(manifest)
    }

    async fn start_splits(&self, writer: &mut CatalogWriter, runner: &mut ParallelRunner<u64>) -> Result {
        let mut connection = self.provider.open_connection().await?;
        let codec_options = CodecOptions {
            time_zone: self.options.time_zone,
        };

        for info in &self.query_infos {
            let entry = writer.add_row_set(info.row_set()).await?;
            let mut splitter = self.create_splitter(info);
            let table = match info {
                QueryInfo::Table(t) => Some(Arc::new(t.table.clone())),
                QueryInfo::Query { .. } => None,
            };

            while splitter.has_next_split(&mut connection).await? {
                if !self.running.is_running() || !runner.is_accepting() {
                    debug!("Not starting more splits");
                    return Ok(());
                }

                let split = splitter.next_split(&mut connection, |_| {}).await?;
                let task = SplitTask {
                    provider: self.provider.clone(),
                    registry: self.registry.clone(),
                    entry: entry.clone(),
                    table: table.clone(),
                    split,
                    codec_options,
                    rows_per_chunk: self.options.rows_per_chunk.max(1),
                    running: self.running.clone(),
                };

                match runner.enqueue(task.run()).await {
                    Ok(_) => {}
                    Err(MigrantToolsError::Cancelled) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(())
    }
}

/// Everything one worker needs to extract a split, owned so it can move to the worker.
struct SplitTask<P: ConnectionProvider> {
    provider: Arc<P>,
    registry: Arc<CodecRegistry>,
    entry: Arc<EntryWriter>,
    table: Option<Arc<Table>>,
    split: QuerySplit,
    codec_options: CodecOptions,
    rows_per_chunk: usize,
    running: RunningFlag,
}

impl<P: ConnectionProvider> SplitTask<P> {
    #[instrument(skip_all, fields(entry = self.entry.name(), split = self.split.index))]
    async fn run(self) -> Result<u64> {
        let mut connection = self.provider.open_connection().await?;
        let result = connection.query(&self.split.query).await?;

        let columns = result
            .columns
            .iter()
            .map(|c| {
                let mut encoded = EncodedColumn::new(c.name.clone(), c.descriptor.clone());
                if matches!(c.descriptor.code, TypeCode::Numeric | TypeCode::Decimal) {
                    if let Some(column) = self.table.as_ref().and_then(|t| t.column(&c.name)) {
                        encoded.precision = Some(column.precision);
                        encoded.scale = Some(column.scale);
                    }
                }
                encoded
            })
            .collect::<Vec<_>>();

        let models = result
            .columns
            .iter()
            .enumerate()
            .map(|(slot, c)| self.registry.create_model(&c.name, &c.descriptor, slot, self.codec_options))
            .collect::<Result<Vec<_>>>()?;

        let format = self.entry.format();
        let mut rows = result.rows;
        let mut buffer = String::new();
        let mut values = Vec::with_capacity(models.len());
        let mut buffered = 0;
        let mut written = 0;

        while let Some(row) = rows.try_next().await? {
            if !self.running.is_running() {
                return Err(MigrantToolsError::Cancelled);
            }

            values.clear();
            for model in &models {
                values.push(model.read(&row)?);
            }
            format.encode_row(&values, &mut buffer)?;
            buffered += 1;

            if buffered >= self.rows_per_chunk {
                self.entry.append(&columns, &buffer, buffered as u64).await?;
                written += buffered as u64;
                buffer.clear();
                buffered = 0;
            }
        }

        self.entry.append(&columns, &buffer, buffered as u64).await?;
        written += buffered as u64;

        debug!("Split {} of {} wrote {} rows", self.split.index, self.entry.name(), written);
        Ok(written)
    }
}
