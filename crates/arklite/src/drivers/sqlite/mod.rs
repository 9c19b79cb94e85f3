//! SQLite destination driver.
//!
//! - [`SqliteDialect`]: minimal identifier quoting
//! - [`SqliteTarget`]: destination file creation and bulk-load tuning

mod dialect;
mod target;

pub use dialect::SqliteDialect;
pub use target::SqliteTarget;
