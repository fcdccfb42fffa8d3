use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use clap::{Args, Parser, Subcommand, ValueEnum};
use migrant_tools::{DataFormat, GroupScriptsBy, ObjectType, RowCountMode, ScriptGeneratorOptions, TableRef};
use time::macros::format_description;
use time::UtcOffset;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about)]
#[command(propagate_version = true)]
/// Moves a relational database between engines.
///
/// Schema scripts are generated from the source metadata, rows are dumped in parallel into a
/// catalog directory and loaded back into a target database.
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// How many splits to extract at the same time. Defaults to the number of estimated cores
    /// on the machine. If the available parallelism cannot be determined, it defaults to 1.
    #[arg(long, env = "MIGRANT_MAX_PARALLELISM", default_value_t = get_default_max_parallelism())]
    pub max_parallelism: NonZeroUsize,
}

fn get_default_max_parallelism() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate schema scripts for the source database
    Schema {
        #[command(flatten)]
        source: SourceDbArgs,

        #[command(flatten)]
        scripts: ScriptArgs,

        /// File to write the scripts to. Scripts are printed when not set.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Dump the rows of the source database into a catalog directory
    Dump {
        #[command(flatten)]
        source: SourceDbArgs,

        #[command(flatten)]
        catalog: CatalogArgs,

        #[command(flatten)]
        dump: DumpArgs,
    },
    /// Load a catalog directory made by the dump command into the target database
    Load {
        #[command(flatten)]
        target: TargetDbArgs,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Rows sent to the target per insert batch
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// Create the source schema in the target database, then copy the rows through a catalog
    Copy(CopyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceDbArgs {
    /// The host of the source database
    #[arg(long, env = "MIGRANT_SOURCE_HOST")]
    pub source_db_host: String,

    /// The port of the source database
    #[arg(long, env = "MIGRANT_SOURCE_PORT", default_value_t = 5432)]
    pub source_db_port: u16,

    /// The username to use when connecting to the source database
    #[arg(long, env = "MIGRANT_SOURCE_USER")]
    pub source_db_user: String,

    /// The password to use when connecting to the source database
    #[arg(long, env = "MIGRANT_SOURCE_PASSWORD")]
    pub source_db_password: String,

    /// The name of the source database
    #[arg(long, env = "MIGRANT_SOURCE_DB")]
    pub source_db_name: String,
}

impl SourceDbArgs {
    pub(crate) fn get_connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.source_db_host, self.source_db_port, self.source_db_user, self.source_db_password, self.source_db_name
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct TargetDbArgs {
    /// The host of the target database
    #[arg(long, env = "MIGRANT_TARGET_HOST")]
    pub target_db_host: String,

    /// The port of the target database
    #[arg(long, env = "MIGRANT_TARGET_PORT", default_value_t = 5432)]
    pub target_db_port: u16,

    /// The username to use when connecting to the target database
    #[arg(long, env = "MIGRANT_TARGET_USER")]
    pub target_db_user: String,

    /// The password to use when connecting to the target database
    #[arg(long, env = "MIGRANT_TARGET_PASSWORD")]
    pub target_db_password: String,

    /// The name of the target database
    #[arg(long, env = "MIGRANT_TARGET_DB")]
    pub target_db_name: String,
}

impl TargetDbArgs {
    pub(crate) fn get_connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.target_db_host, self.target_db_port, self.target_db_user, self.target_db_password, self.target_db_name
        )
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScriptMode {
    Create,
    Drop,
    DropCreate,
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScriptGrouping {
    /// Foreign keys are emitted as soon as the tables they reference exist
    Table,
    /// Foreign keys are emitted after every table
    Metadata,
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ScriptObject {
    Table,
    PrimaryKey,
    Index,
    ForeignKey,
    Trigger,
    ColumnTrigger,
    Sequence,
}

impl From<ScriptObject> for ObjectType {
    fn from(value: ScriptObject) -> Self {
        match value {
            ScriptObject::Table => ObjectType::Table,
            ScriptObject::PrimaryKey => ObjectType::PrimaryKey,
            ScriptObject::Index => ObjectType::Index,
            ScriptObject::ForeignKey => ObjectType::ForeignKey,
            ScriptObject::Trigger => ObjectType::Trigger,
            ScriptObject::ColumnTrigger => ObjectType::ColumnTrigger,
            ScriptObject::Sequence => ObjectType::Sequence,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScriptArgs {
    #[arg(long, value_enum, default_value_t = ScriptMode::Create)]
    pub mode: ScriptMode,

    #[arg(long, value_enum, default_value_t = ScriptGrouping::Table)]
    pub group_by: ScriptGrouping,

    /// Object kinds to script, separated by commas. Everything is scripted when not set.
    #[arg(long, value_enum, value_delimiter = ',')]
    pub objects: Vec<ScriptObject>,
}

impl ScriptArgs {
    pub(crate) fn generator_options(&self) -> ScriptGeneratorOptions {
        let mut options = ScriptGeneratorOptions {
            group_scripts_by: match self.group_by {
                ScriptGrouping::Table => GroupScriptsBy::Table,
                ScriptGrouping::Metadata => GroupScriptsBy::MetaData,
            },
            ..Default::default()
        };

        if !self.objects.is_empty() {
            options.object_types = self.objects.iter().map(|o| ObjectType::from(*o)).collect::<HashSet<_>>();
        }

        options
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum CatalogFormat {
    /// Delimited text, one row per line
    Text,
    /// One json array per line
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Directory holding the manifest and the data files
    #[arg(long, env = "MIGRANT_CATALOG_DIR")]
    pub catalog_dir: PathBuf,

    /// Format of new data files. Existing catalogs are read in the format they were written in.
    #[arg(long, value_enum, default_value_t = CatalogFormat::Text)]
    pub format: CatalogFormat,

    /// Value delimiter of the text format, a single character or `tab`. Defaults to tab.
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<char>,

    /// Time zone timestamps without a zone are taken in, such as `+02:00` or `UTC`.
    #[arg(long, env = "MIGRANT_TIME_ZONE", value_parser = parse_time_zone)]
    pub time_zone: Option<UtcOffset>,
}

impl CatalogArgs {
    pub(crate) fn data_format(&self) -> migrant_tools::Result<DataFormat> {
        match self.format {
            CatalogFormat::Text => DataFormat::text(self.delimiter.unwrap_or('\t')),
            CatalogFormat::Json => Ok(DataFormat::Json),
        }
    }
}

fn parse_delimiter(value: &str) -> Result<char, String> {
    if value == "tab" || value == "\\t" {
        return Ok('\t');
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("`{}` is not a single character", value)),
    }
}

fn parse_time_zone(value: &str) -> Result<UtcOffset, String> {
    match value {
        "UTC" | "utc" | "Z" => Ok(UtcOffset::UTC),
        _ => UtcOffset::parse(value, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
            .map_err(|e| format!("`{}` is not a time zone offset: {}", value, e)),
    }
}

/// A `name=value` argument.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NamedArg {
    pub name: String,
    pub value: String,
}

fn parse_named(value: &str) -> Result<NamedArg, String> {
    match value.split_once('=') {
        Some((name, rest)) if !name.trim().is_empty() && !rest.trim().is_empty() => Ok(NamedArg {
            name: name.trim().to_string(),
            value: rest.trim().to_string(),
        }),
        _ => Err(format!("expected `name=value`, got `{}`", value)),
    }
}

#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    /// Split every table into pages of this many rows
    #[arg(long)]
    pub rows_per_split: Option<u64>,

    /// Plan splits from the server's row estimates instead of counting
    #[arg(long)]
    pub approximate_row_count: bool,

    /// Only dump these tables, given as `table` or `schema.table`. May be repeated.
    #[arg(long = "table")]
    pub tables: Vec<String>,

    /// Row filter for one table, as `table=condition`. May be repeated.
    #[arg(long = "filter", value_parser = parse_named)]
    pub filters: Vec<NamedArg>,

    /// Columns to dump for one table, as `table=column,column`. May be repeated.
    #[arg(long = "columns", value_parser = parse_named)]
    pub columns: Vec<NamedArg>,

    /// Also dump the rows of a query, as `name=select ...`. May be repeated.
    #[arg(long = "query", value_parser = parse_named)]
    pub queries: Vec<NamedArg>,
}

fn find_for<'a>(args: &'a [NamedArg], table: &TableRef) -> Option<&'a NamedArg> {
    args.iter().find(|arg| TableRef::parse(&arg.name).matches(table))
}

impl DumpArgs {
    pub(crate) fn includes(&self, table: &TableRef) -> bool {
        self.tables.is_empty() || self.tables.iter().any(|t| TableRef::parse(t).matches(table))
    }

    pub(crate) fn filter_for(&self, table: &TableRef) -> Option<&str> {
        find_for(&self.filters, table).map(|f| f.value.as_str())
    }

    pub(crate) fn columns_for(&self, table: &TableRef) -> Vec<&str> {
        find_for(&self.columns, table)
            .map(|c| c.value.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn row_count_mode(&self) -> RowCountMode {
        if self.approximate_row_count {
            RowCountMode::Approximate
        } else {
            RowCountMode::Exact
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CopyArgs {
    #[command(flatten)]
    pub source: SourceDbArgs,
    #[command(flatten)]
    pub target: TargetDbArgs,
    #[command(flatten)]
    pub catalog: CatalogArgs,
    #[command(flatten)]
    pub dump: DumpArgs,
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert()
}

#[test]
fn parses_script_arguments() {
    let cli = Cli::parse_from([
        "migrant-sync",
        "schema",
        "--source-db-host", "localhost",
        "--source-db-user", "postgres",
        "--source-db-password", "secret",
        "--source-db-name", "shop",
        "--mode", "drop-create",
        "--group-by", "metadata",
        "--objects", "table,foreign-key",
    ]);

    let Commands::Schema { source, scripts, output } = cli.command else {
        panic!("expected the schema command");
    };

    assert_eq!(source.get_connection_string(), "host=localhost port=5432 user=postgres password=secret dbname=shop");
    assert_eq!(scripts.mode, ScriptMode::DropCreate);
    assert_eq!(output, None);

    let options = scripts.generator_options();
    assert_eq!(options.group_scripts_by, GroupScriptsBy::MetaData);
    assert_eq!(options.object_types, HashSet::from([ObjectType::Table, ObjectType::ForeignKey]));
}

#[test]
fn parses_dump_arguments() {
    let cli = Cli::parse_from([
        "migrant-sync",
        "dump",
        "--source-db-host", "localhost",
        "--source-db-user", "postgres",
        "--source-db-password", "secret",
        "--source-db-name", "shop",
        "--catalog-dir", "/tmp/shop",
        "--delimiter", ";",
        "--time-zone", "+02:00",
        "--table", "public.orders",
        "--filter", "public.orders=total > 100",
        "--columns", "orders=id, total",
        "--query", "recent=select id from orders where created_at > now() - interval '1 day'",
    ]);

    let Commands::Dump { catalog, dump, .. } = cli.command else {
        panic!("expected the dump command");
    };

    assert_eq!(catalog.data_format().unwrap(), DataFormat::Text { delimiter: ';' });
    assert_eq!(catalog.time_zone, Some(UtcOffset::from_hms(2, 0, 0).unwrap()));

    let orders = TableRef::in_schema("public", "orders");
    let customers = TableRef::in_schema("public", "customers");
    assert!(dump.includes(&orders));
    assert!(!dump.includes(&customers));
    assert_eq!(dump.filter_for(&orders), Some("total > 100"));
    assert_eq!(dump.filter_for(&customers), None);
    assert_eq!(dump.columns_for(&orders), vec!["id", "total"]);
    assert_eq!(
        dump.queries,
        vec![NamedArg {
            name: "recent".to_string(),
            value: "select id from orders where created_at > now() - interval '1 day'".to_string(),
        }]
    );
}

#[test]
fn rejects_bad_catalog_arguments() {
    let base = ["migrant-sync", "load", "--target-db-host", "h", "--target-db-user", "u", "--target-db-password", "p", "--target-db-name", "d", "--catalog-dir", "c"];

    assert!(Cli::try_parse_from(base.iter().copied().chain(["--time-zone", "Europe/Paris"])).is_err());
    assert!(Cli::try_parse_from(base.iter().copied().chain(["--delimiter", "ab"])).is_err());
    assert!(Cli::try_parse_from(base.iter().copied().chain(["--filter", "orders"])).is_err());

    let cli = Cli::try_parse_from(base.iter().copied().chain(["--delimiter", "n"])).unwrap();
    let Commands::Load { catalog, .. } = cli.command else {
        panic!("expected the load command");
    };
    assert!(catalog.data_format().is_err());

    let cli = Cli::try_parse_from(base.iter().copied().chain(["--delimiter", "tab", "--time-zone", "UTC"])).unwrap();
    let Commands::Load { catalog, .. } = cli.command else {
        panic!("expected the load command");
    };
    assert_eq!(catalog.data_format().unwrap(), DataFormat::default());
    assert_eq!(catalog.time_zone, Some(UtcOffset::UTC));
}
