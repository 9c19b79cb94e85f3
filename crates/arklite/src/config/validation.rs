//! Configuration validation.

use super::Config;
use crate::error::{CopyError, Result};

/// Validate the configuration.
///
/// Only checks what can be known without touching either database.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.host.trim().is_empty() {
        return Err(CopyError::Config("source.host is required".into()));
    }
    if config.source.port == 0 {
        return Err(CopyError::Config("source.port must be non-zero".into()));
    }
    if config.source.database.trim().is_empty() {
        return Err(CopyError::Config("source.database is required".into()));
    }
    if config.source.user.trim().is_empty() {
        return Err(CopyError::Config("source.user is required".into()));
    }

    // Copy validation
    let copy = &config.copy;
    if copy.table.trim().is_empty() {
        return Err(CopyError::Config("copy.table is required".into()));
    }
    if copy.output.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
        return Err(CopyError::Config("copy.output is required".into()));
    }
    if copy.id_column.trim().is_empty() {
        return Err(CopyError::Config("copy.id_column cannot be empty".into()));
    }
    if copy.read_batch == 0 {
        return Err(CopyError::Config(
            "copy.read_batch must be at least 1".into(),
        ));
    }
    if copy.write_batch == 0 {
        return Err(CopyError::Config(
            "copy.write_batch must be at least 1".into(),
        ));
    }

    let has_only = copy.only_columns.iter().any(|c| !c.trim().is_empty());
    let has_exclude = copy.exclude_columns.iter().any(|c| !c.trim().is_empty());
    if has_only && has_exclude {
        return Err(CopyError::Config(
            "only_columns and exclude_columns cannot be used together".into(),
        ));
    }

    Ok(())
}
