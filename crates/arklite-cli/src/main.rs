//! arklite CLI - copy a MySQL table into a SQLite file.

mod version;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use arklite::{
    Config, Copier, CopyError, LogFormat, MysqlReader, QueryBuilder, RowSource, Schema,
    SqliteTarget,
};
use clap::{Parser, ValueEnum};
use dialoguer::Password;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::version::{BUILD_INFO, VERSION};

#[derive(Parser, Debug)]
#[command(name = "arklite")]
#[command(about = "Copy a single MySQL table into a SQLite file")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Optional YAML file supplying any of the settings below (flags win)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MySQL host (default: localhost)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// MySQL port (default: 3306)
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// MySQL user
    #[arg(short, long)]
    user: Option<String>,

    /// MySQL password
    #[arg(short, long, env = "MYSQL_PWD", hide_env_values = true)]
    password: Option<String>,

    /// Prompt for the MySQL password when none was given
    #[arg(long)]
    ask_password: bool,

    /// MySQL database
    #[arg(short, long)]
    database: Option<String>,

    /// Table to copy
    #[arg(short, long)]
    table: Option<String>,

    /// SQLite file to create
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    force: bool,

    /// Integer column used to page through the table (default: id)
    #[arg(long)]
    id_column: Option<String>,

    /// Copy only this MySQL partition
    #[arg(long)]
    partition: Option<String>,

    /// Extra MySQL predicate; repeat to AND several together
    #[arg(long = "where", value_name = "PREDICATE")]
    filters: Vec<String>,

    /// Comma-separated columns to copy (must include the id column)
    #[arg(long, value_delimiter = ',', conflicts_with = "exclude_columns")]
    only_columns: Vec<String>,

    /// Comma-separated columns to skip
    #[arg(long, value_delimiter = ',')]
    exclude_columns: Vec<String>,

    /// Rows per SQLite transaction (default: 10000)
    #[arg(long)]
    write_batch: Option<usize>,

    /// Rows per MySQL select (default: 100000)
    #[arg(long)]
    read_batch: Option<usize>,

    /// Print the generated statements and exit without copying
    #[arg(long)]
    preview: bool,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,

    /// Print build information and exit
    #[arg(short = 'v', long)]
    version: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with 1 like every other failure
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CopyError> {
    if cli.version {
        println!("{}", BUILD_INFO);
        return Ok(());
    }

    let mut config = build_config(&cli)?;
    setup_logging(config.logging.verbose, config.logging.format);
    info!("arklite {}", VERSION);
    if let Some(ref path) = cli.config {
        info!("Loaded configuration from {:?}", path);
    }
    config.validate()?;

    let output = config
        .copy
        .output
        .clone()
        .ok_or_else(|| CopyError::Config("copy.output is required".into()))?;
    if !cli.preview && output.exists() && !config.copy.force {
        return Err(CopyError::Config(format!(
            "output file '{}' already exists (use --force to overwrite)",
            output.display()
        )));
    }

    if cli.ask_password && config.source.password.is_none() {
        config.source.password = Some(prompt_password(&config)?);
    }

    let reader = Arc::new(MysqlReader::connect(&config.source).await?);
    let result = copy_table(reader.clone(), &config, output, cli.preview).await;
    reader.close().await;
    result
}

async fn copy_table(
    reader: Arc<MysqlReader>,
    config: &Config,
    output: PathBuf,
    preview: bool,
) -> Result<(), CopyError> {
    let schema = Schema::read(reader.as_ref(), &config.copy.schema_options()).await?;

    if preview {
        let builder = QueryBuilder::new(&schema);
        println!(
            "{}",
            builder.preview(config.copy.read_batch, config.copy.write_batch)
        );
        return Ok(());
    }

    let target = SqliteTarget::create(&output, config.copy.force)?;
    let mut copier = Copier::new(reader, schema, target, config.copy.copy_options())?;
    let summary = copier.run().await?;

    println!("\nCopy completed!");
    println!("  Table: {}", config.copy.table);
    println!("  Output: {}", output.display());
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Rows: {}", summary.rows_written);
    println!("  Transactions: {}", summary.write_batches);
    println!("  Throughput: {:.0} rows/sec", summary.rows_per_sec());

    Ok(())
}

/// Load the config file, if any, and apply flag overrides.
fn build_config(cli: &Cli) -> Result<Config, CopyError> {
    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };

    let source = &mut config.source;
    if let Some(ref host) = cli.host {
        source.host = host.clone();
    }
    if let Some(port) = cli.port {
        source.port = port;
    }
    if let Some(ref user) = cli.user {
        source.user = user.clone();
    }
    if let Some(ref password) = cli.password {
        source.password = Some(password.clone());
    }
    if let Some(ref database) = cli.database {
        source.database = database.clone();
    }

    let copy = &mut config.copy;
    if let Some(ref table) = cli.table {
        copy.table = table.clone();
    }
    if let Some(ref output) = cli.output {
        copy.output = Some(output.clone());
    }
    if cli.force {
        copy.force = true;
    }
    if let Some(ref id_column) = cli.id_column {
        copy.id_column = id_column.clone();
    }
    if let Some(ref partition) = cli.partition {
        copy.partition = Some(partition.clone());
    }
    if !cli.filters.is_empty() {
        copy.filters = cli.filters.clone();
    }
    // A column list on the command line replaces the file's selection entirely
    if !cli.only_columns.is_empty() {
        copy.only_columns = cli.only_columns.clone();
        copy.exclude_columns.clear();
    }
    if !cli.exclude_columns.is_empty() {
        copy.exclude_columns = cli.exclude_columns.clone();
        copy.only_columns.clear();
    }
    if let Some(n) = cli.read_batch {
        copy.read_batch = n;
    }
    if let Some(n) = cli.write_batch {
        copy.write_batch = n;
    }

    if cli.verbose {
        config.logging.verbose = true;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }

    Ok(config)
}

fn prompt_password(config: &Config) -> Result<String, CopyError> {
    Password::new()
        .with_prompt(format!(
            "Password for {}@{}",
            config.source.user, config.source.host
        ))
        .allow_empty_password(true)
        .interact()
        .map_err(|e| CopyError::Config(format!("reading password: {}", e)))
}

fn setup_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    // RUST_LOG wins; sqlx logs every statement at debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", level)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}
