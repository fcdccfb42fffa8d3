use std::num::NonZeroUsize;
use std::sync::Arc;
use clap::Parser;
use migrant_tools::{
    Catalog, ConnectionProvider, ConnectionScriptExporter, Database, Dialect, DumpOptions, DumpWriter, HasTables,
    LoadJob, LoadOptions, PostgresClientWrapper, PostgresConnectionProvider, PostgresDialect, QueryLimit, Result,
    RunningFlag, SchemaReader, ScriptExporter, ScriptGenerator, ScriptGeneratorOptions, TableType,
    WriterScriptExporter,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;
use crate::cli::{CatalogArgs, Commands, CopyArgs, DumpArgs, ScriptArgs, ScriptMode, SourceDbArgs, TargetDbArgs};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    run(cli).await?;

    Ok(())
}

#[instrument(skip_all)]
async fn run(cli: cli::Cli) -> Result<()> {
    match cli.command {
        Commands::Schema { source, scripts, output } => {
            do_schema(source, scripts, output).await?;
        }
        Commands::Dump { source, catalog, dump } => {
            do_dump(source, catalog, dump, cli.max_parallelism).await?;
        }
        Commands::Load { target, catalog, batch_size } => {
            do_load(target, catalog, batch_size).await?;
        }
        Commands::Copy(copy_args) => {
            do_copy(copy_args, cli.max_parallelism).await?;
        }
    }

    Ok(())
}

async fn introspect(connection_string: &str) -> Result<Database> {
    let connection = PostgresClientWrapper::new(connection_string).await?;
    SchemaReader::new(&connection).introspect_database().await
}

fn dialect_of(db: &Database) -> Arc<dyn Dialect> {
    db.dialect.clone().unwrap_or_else(|| Arc::new(PostgresDialect::new()))
}

fn generate(generator: &ScriptGenerator, mode: ScriptMode, db: &Database) -> Result<Vec<String>> {
    match mode {
        ScriptMode::Create => generator.create_scripts(db),
        ScriptMode::Drop => generator.drop_scripts(db),
        ScriptMode::DropCreate => generator.drop_create_scripts(db),
    }
}

/// Stops the job at the next row boundary when the process is interrupted.
fn stop_on_ctrl_c(flag: RunningFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            flag.stop();
        }
    });
}

#[instrument(skip_all)]
async fn do_schema(source: SourceDbArgs, scripts: ScriptArgs, output: Option<std::path::PathBuf>) -> Result<()> {
    let db = introspect(&source.get_connection_string()).await?;
    let generator = ScriptGenerator::new(dialect_of(&db), scripts.generator_options());
    let sql = generate(&generator, scripts.mode, &db)?;

    match output {
        Some(path) => {
            let mut exporter = WriterScriptExporter::create_file(&path).await?;
            exporter.export_scripts(&sql).await?;
            exporter.finish().await?;
            info!("Wrote {} scripts to {}", sql.len(), path.display());
        }
        None => {
            let mut exporter = WriterScriptExporter::new(tokio::io::stdout());
            exporter.export_scripts(&sql).await?;
            exporter.finish().await?;
        }
    }

    Ok(())
}

#[instrument(skip_all)]
async fn do_dump(source: SourceDbArgs, catalog: CatalogArgs, dump: DumpArgs, max_parallelism: NonZeroUsize) -> Result<()> {
    let connection_string = source.get_connection_string();
    let db = introspect(&connection_string).await?;

    let dialect = Arc::new(PostgresDialect::new());
    let provider = PostgresConnectionProvider::new(connection_string, dialect.clone());
    let data_format = catalog.data_format()?;
    let options = DumpOptions {
        max_parallelism,
        data_format,
        query_limit: dump.rows_per_split.map(QueryLimit::new),
        row_count_mode: dump.row_count_mode(),
        time_zone: catalog.time_zone,
        ..Default::default()
    };

    let mut writer = DumpWriter::new(provider, dialect, Catalog::new(&catalog.catalog_dir, data_format), options)
        .with_source(db.info.clone());

    for table in db.tables() {
        let table_ref = table.table_ref();
        if table.table_type != TableType::Table || !dump.includes(&table_ref) {
            continue;
        }
        writer.add_table(table, &dump.columns_for(&table_ref), dump.filter_for(&table_ref), None)?;
    }

    for query in &dump.queries {
        writer.add_query(&query.name, &query.value);
    }

    stop_on_ctrl_c(writer.running_flag());
    let manifest = writer.write().await?;

    let rows: u64 = manifest.entries.iter().map(|e| e.row_count).sum();
    info!("Dumped {} rows from {} row sets into {}", rows, manifest.entries.len(), catalog.catalog_dir.display());

    Ok(())
}

#[instrument(skip_all)]
async fn do_load(target: TargetDbArgs, catalog: CatalogArgs, batch_size: usize) -> Result<()> {
    let connection_string = target.get_connection_string();
    let db = introspect(&connection_string).await?;

    let dialect = Arc::new(PostgresDialect::new());
    let job = LoadJob::new(
        PostgresConnectionProvider::new(connection_string, dialect.clone()),
        dialect,
        LoadOptions {
            batch_size,
            time_zone: catalog.time_zone,
        },
    );

    stop_on_ctrl_c(job.running_flag());
    let rows = job.load(&Catalog::new(&catalog.catalog_dir, catalog.data_format()?), &db).await?;
    info!("Loaded {} rows into {}", rows, target.target_db_name);

    Ok(())
}

#[instrument(skip_all)]
async fn do_copy(copy_args: CopyArgs, max_parallelism: NonZeroUsize) -> Result<()> {
    let source = introspect(&copy_args.source.get_connection_string()).await?;

    let target_connection_string = copy_args.target.get_connection_string();
    let target_dialect = Arc::new(PostgresDialect::new());
    let generator = ScriptGenerator::new(target_dialect.clone(), ScriptGeneratorOptions::default());
    let scripts = generator.create_scripts(&source)?;

    let provider = PostgresConnectionProvider::new(target_connection_string, target_dialect);
    let mut exporter = ConnectionScriptExporter::new(provider.open_connection().await?);
    exporter.export_scripts(&scripts).await?;
    exporter.finish().await?;
    info!("Created {} objects in {}", exporter.executed(), copy_args.target.target_db_name);

    do_dump(copy_args.source, copy_args.catalog.clone(), copy_args.dump, max_parallelism).await?;
    do_load(copy_args.target, copy_args.catalog, 1000).await?;

    Ok(())
}
