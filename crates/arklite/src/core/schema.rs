//! Table schema built from a live structural probe of the source.
//!
//! A [`Schema`] is computed once per run and never mutated afterwards. It
//! drives the destination DDL, the select/insert statements, and the
//! per-column decoding strategy.

use tracing::{debug, info, warn};

use crate::error::{CopyError, Result};
use crate::typemap::{classify, StorageClass};

use super::traits::RowSource;

/// Column as reported by the source probe, before type mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedColumn {
    /// Column name.
    pub name: String,
    /// Declared source type name (e.g. "BIGINT UNSIGNED").
    pub type_name: String,
}

impl ProbedColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Column metadata with its destination storage class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Declared source type name.
    pub source_type: String,

    /// SQLite storage class derived from `source_type`.
    pub storage_class: StorageClass,
}

impl ColumnInfo {
    fn from_probe(probed: ProbedColumn) -> Self {
        let storage_class = classify(&probed.type_name);
        Self {
            name: probed.name,
            source_type: probed.type_name,
            storage_class,
        }
    }
}

/// Which columns to copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelection {
    /// Every column of the table.
    #[default]
    All,
    /// Only the listed columns (allow-list).
    Only(Vec<String>),
    /// Every column except the listed ones (deny-list).
    Exclude(Vec<String>),
}

impl ColumnSelection {
    /// Build a selection from allow/deny lists, enforcing the id column rules.
    ///
    /// Entries are trimmed and empty entries dropped.
    pub fn new(only: &[String], exclude: &[String], id_column: &str) -> Result<Self> {
        let only = clean_list(only);
        let exclude = clean_list(exclude);

        match (only.is_empty(), exclude.is_empty()) {
            (true, true) => Ok(ColumnSelection::All),
            (false, false) => Err(CopyError::Schema(
                "only-columns and exclude-columns cannot be used together".into(),
            )),
            (false, true) => {
                if !only.iter().any(|c| c == id_column) {
                    return Err(CopyError::Schema(format!(
                        "id column '{}' must be included in only-columns (got: {})",
                        id_column,
                        only.join(", ")
                    )));
                }
                Ok(ColumnSelection::Only(only))
            }
            (true, false) => {
                if exclude.iter().any(|c| c == id_column) {
                    return Err(CopyError::Schema(format!(
                        "id column '{}' cannot be excluded",
                        id_column
                    )));
                }
                Ok(ColumnSelection::Exclude(exclude))
            }
        }
    }

    fn keeps(&self, name: &str) -> bool {
        match self {
            ColumnSelection::All => true,
            ColumnSelection::Only(list) => list.iter().any(|c| c == name),
            ColumnSelection::Exclude(list) => !list.iter().any(|c| c == name),
        }
    }
}

fn clean_list(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inputs for reading a table schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    /// Source table name.
    pub table: String,
    /// Integer column driving pagination and ordering.
    pub id_column: String,
    /// Optional source partition to restrict extraction to.
    pub partition: Option<String>,
    /// Raw source-dialect predicates ANDed into the select.
    pub filters: Vec<String>,
    /// Allow-list of columns.
    pub only_columns: Vec<String>,
    /// Deny-list of columns.
    pub exclude_columns: Vec<String>,
}

impl SchemaOptions {
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_column: id_column.into(),
            ..Default::default()
        }
    }
}

/// Immutable description of the table being copied.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Table name (same on both sides).
    pub table: String,

    /// Cursor column.
    pub id_column: String,

    /// Copied columns, in source ordinal order.
    pub columns: Vec<ColumnInfo>,

    /// Source partition restriction.
    pub partition: Option<String>,

    /// Extra select predicates.
    pub filters: Vec<String>,

    /// Column selection the schema was built with.
    pub selection: ColumnSelection,

    id_index: usize,
}

impl Schema {
    /// Introspect `opts.table` on the source and build the schema.
    ///
    /// The column selection is validated before the probe, so a bad
    /// allow/deny list never reaches the source.
    pub async fn read(source: &dyn RowSource, opts: &SchemaOptions) -> Result<Self> {
        if opts.id_column.trim().is_empty() {
            return Err(CopyError::Config("id column name cannot be empty".into()));
        }
        let selection =
            ColumnSelection::new(&opts.only_columns, &opts.exclude_columns, &opts.id_column)?;

        let probed = source.probe_columns(&opts.table).await.map_err(|e| {
            CopyError::Schema(format!("cannot read columns of table '{}': {}", opts.table, e))
        })?;

        let schema = Self::from_probe(opts, selection, probed)?;
        info!(
            "Read schema for {}: {} columns, id column '{}'",
            schema.table,
            schema.columns.len(),
            schema.id_column
        );
        Ok(schema)
    }

    /// Apply type mapping and column selection to probe output.
    pub fn from_probe(
        opts: &SchemaOptions,
        selection: ColumnSelection,
        probed: Vec<ProbedColumn>,
    ) -> Result<Self> {
        if probed.is_empty() {
            return Err(CopyError::Schema(format!(
                "table '{}' has no columns",
                opts.table
            )));
        }

        match &selection {
            ColumnSelection::Only(list) => {
                let missing: Vec<&str> = list
                    .iter()
                    .filter(|c| !probed.iter().any(|p| &p.name == *c))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    return Err(CopyError::Schema(format!(
                        "only-columns names unknown columns of '{}': {}",
                        opts.table,
                        missing.join(", ")
                    )));
                }
            }
            ColumnSelection::Exclude(list) => {
                for name in list.iter().filter(|c| !probed.iter().any(|p| &p.name == *c)) {
                    warn!("exclude-columns names unknown column '{}', ignoring", name);
                }
            }
            ColumnSelection::All => {}
        }

        let columns: Vec<ColumnInfo> = probed
            .into_iter()
            .filter(|p| selection.keeps(&p.name))
            .map(ColumnInfo::from_probe)
            .collect();

        for col in &columns {
            debug!(
                "Column {}: {} -> {}",
                col.name, col.source_type, col.storage_class
            );
        }

        let id_index = columns
            .iter()
            .position(|c| c.name == opts.id_column)
            .ok_or_else(|| {
                CopyError::Schema(format!(
                    "id column '{}' not found in table '{}'",
                    opts.id_column, opts.table
                ))
            })?;

        Ok(Self {
            table: opts.table.clone(),
            id_column: opts.id_column.clone(),
            columns,
            partition: opts.partition.clone().filter(|p| !p.trim().is_empty()),
            filters: clean_list(&opts.filters),
            selection,
            id_index,
        })
    }

    /// Position of the id column within [`Schema::columns`].
    pub fn id_index(&self) -> usize {
        self.id_index
    }

    /// Names of the copied columns, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
