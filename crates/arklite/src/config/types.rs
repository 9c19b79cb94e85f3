//! Configuration type definitions.
//!
//! Every field has a default so a config file may supply any subset of the
//! settings; the CLI fills in the rest from flags before validating.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::schema::SchemaOptions;
use crate::transfer::{CopyOptions, DEFAULT_READ_BATCH_SIZE, DEFAULT_WRITE_BATCH_SIZE};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source database (MySQL) connection.
    pub source: SourceConfig,

    /// What to copy and where to put it.
    pub copy: CopyConfig,

    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Source database (MySQL) configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Absent means connect without one or prompt for it.
    pub password: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mysql_port(),
            database: String::new(),
            user: String::new(),
            password: None,
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Copy job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Source table, also the destination table name.
    pub table: String,

    /// Destination SQLite file.
    pub output: Option<PathBuf>,

    /// Overwrite an existing output file.
    pub force: bool,

    /// Integer column used for pagination (default: "id").
    pub id_column: String,

    /// Restrict extraction to one source partition.
    pub partition: Option<String>,

    /// Raw MySQL predicates ANDed into the select.
    #[serde(rename = "where")]
    pub filters: Vec<String>,

    /// Copy only these columns.
    pub only_columns: Vec<String>,

    /// Copy every column except these.
    pub exclude_columns: Vec<String>,

    /// Rows per source select (default: 100000).
    pub read_batch: usize,

    /// Rows per destination transaction (default: 10000).
    pub write_batch: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            output: None,
            force: false,
            id_column: default_id_column(),
            partition: None,
            filters: Vec::new(),
            only_columns: Vec::new(),
            exclude_columns: Vec::new(),
            read_batch: DEFAULT_READ_BATCH_SIZE,
            write_batch: DEFAULT_WRITE_BATCH_SIZE,
        }
    }
}

impl CopyConfig {
    /// Schema inputs for [`Schema::read`](crate::core::Schema::read).
    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            table: self.table.clone(),
            id_column: self.id_column.clone(),
            partition: self.partition.clone(),
            filters: self.filters.clone(),
            only_columns: self.only_columns.clone(),
            exclude_columns: self.exclude_columns.clone(),
        }
    }

    pub fn copy_options(&self) -> CopyOptions {
        CopyOptions::new(self.read_batch, self.write_batch)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable debug-level logs.
    pub verbose: bool,

    /// Output format (default: text).
    pub format: LogFormat,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_id_column() -> String {
    "id".to_string()
}
