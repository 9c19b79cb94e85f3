//! Statement rendering for both sides of the copy.
//!
//! [`QueryBuilder`] turns a [`Schema`] into the three statements a copy
//! needs: the SQLite DDL, the MySQL cursor select, and the SQLite insert.
//! Identifier escaping is left to each side's [`Dialect`].

use crate::core::schema::Schema;
use crate::core::traits::Dialect;
use crate::drivers::mysql::MysqlDialect;
use crate::drivers::sqlite::SqliteDialect;
use crate::typemap::StorageClass;

/// A rendered cursor select together with its row cap.
///
/// The single placeholder binds the cursor (exclusive lower bound).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// SQL text with one positional placeholder.
    pub sql: String,
    /// LIMIT baked into `sql`.
    pub limit: usize,
}

/// Pure renderers over a [`Schema`].
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    schema: &'a Schema,
    source: MysqlDialect,
    target: SqliteDialect,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            source: MysqlDialect::new(),
            target: SqliteDialect::new(),
        }
    }

    /// Destination DDL, one column per copied source column.
    ///
    /// The id column becomes the primary key; SQLite only accepts
    /// AUTOINCREMENT on an INTEGER primary key.
    pub fn create_table_statement(&self) -> String {
        let columns = self
            .schema
            .columns
            .iter()
            .map(|col| {
                let mut def = format!(
                    "{} {}",
                    self.target.quote_ident(&col.name),
                    col.storage_class
                );
                if col.name == self.schema.id_column {
                    if col.storage_class == StorageClass::Integer {
                        def.push_str(" PRIMARY KEY AUTOINCREMENT");
                    } else {
                        def.push_str(" PRIMARY KEY");
                    }
                }
                def
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE {} ({})",
            self.target.quote_ident(&self.schema.table),
            columns
        )
    }

    /// Cursor select: `id > ?`, ascending by id, capped at `limit` rows.
    pub fn select_statement(&self, limit: usize) -> SelectQuery {
        let cols = self
            .schema
            .columns
            .iter()
            .map(|c| self.source.quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT {} FROM {}",
            cols,
            self.source.quote_ident(&self.schema.table)
        );

        if let Some(ref partition) = self.schema.partition {
            sql.push(' ');
            sql.push_str(&self.source.partition_clause(partition));
        }

        let id = self.source.quote_ident(&self.schema.id_column);
        let mut conditions = vec![format!("{} > {}", id, self.source.param_placeholder(1))];
        conditions.extend(self.schema.filters.iter().map(|f| format!("({})", f)));

        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
        sql.push_str(&format!(" ORDER BY {} ASC LIMIT {}", id, limit));

        SelectQuery { sql, limit }
    }

    /// Parameterized insert of every copied column.
    pub fn insert_statement(&self) -> String {
        let cols = self
            .schema
            .columns
            .iter()
            .map(|c| self.target.quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let params = (1..=self.schema.columns.len())
            .map(|i| self.target.param_placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.target.quote_ident(&self.schema.table),
            cols,
            params
        )
    }

    /// Human-readable plan printed by preview mode.
    pub fn preview(&self, read_batch: usize, write_batch: usize) -> String {
        format!(
            "Will create SQLite table with:\n{}\n\n\
             Will select data from MySQL with:\n{}\n\n\
             Will insert data into SQLite with:\n{}\n\n\
             Reads in batches of {} rows from MySQL and writes to SQLite in batches of {} rows.",
            self.create_table_statement(),
            self.select_statement(read_batch).sql,
            self.insert_statement(),
            read_batch,
            write_batch
        )
    }
}
