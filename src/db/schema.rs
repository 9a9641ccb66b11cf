//! One-time schema execution at startup.
//!
//! Every file in the configured scripts directory runs against the primary
//! pool in lexical filename order, aborting on the first failure, followed
//! by a full-database reindex. This happens once during initialization and
//! is never retried.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Database, DbError};
use crate::config::PoolConfig;

impl Database {
    /// Runs the schema scripts and reindex when enabled for this pool.
    ///
    /// # Errors
    ///
    /// Any script read or execution failure aborts immediately; the caller
    /// treats this as fatal since a partially-migrated database must not
    /// serve traffic.
    pub async fn execute_schema(&self, config: &PoolConfig) -> Result<(), DbError> {
        if !config.execute_schema {
            return Ok(());
        }

        tracing::info!(dir = %config.scripts_dir.display(), "executing schema scripts");

        for path in script_files(&config.scripts_dir)? {
            let sql = fs::read_to_string(&path).map_err(|source| DbError::ScriptIo {
                path: path.clone(),
                source,
            })?;

            tracing::info!(script = %path.display(), "executing schema script");
            sqlx::raw_sql(&sql)
                .execute(&self.primary.pool)
                .await
                .map_err(|source| DbError::Script { path, source })?;
        }

        let reindex = reindex_statement(&config.database);
        tracing::info!(database = %config.database, "rebuilding indexes");
        sqlx::raw_sql(&reindex)
            .execute(&self.primary.pool)
            .await
            .map_err(DbError::Query)?;

        tracing::info!("schema scripts successfully executed");
        Ok(())
    }
}

/// Lists script files in lexical filename order.
pub(crate) fn script_files(dir: &Path) -> Result<Vec<PathBuf>, DbError> {
    let entries = fs::read_dir(dir).map_err(|source| DbError::ScriptIo {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DbError::ScriptIo {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// The full-database reindex statement for the configured database name.
pub(crate) fn reindex_statement(database: &str) -> String {
    format!("REINDEX DATABASE {database}")
}
