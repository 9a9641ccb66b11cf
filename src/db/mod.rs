//! Data access: primary/replica pools, time-bounded statements, and the
//! one-time schema runner.
//!
//! Writes and mutations go to the primary pool; reads go to the replica.
//! Every statement runs under its pool's configured budget and fails fast
//! with [`DbError::DeadlineExceeded`] when the budget elapses; there is no
//! retry at this layer.

pub mod router;
pub mod schema;

use std::path::PathBuf;
use std::time::Duration;

pub use router::{Database, PgQuery};

/// Errors from the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The statement did not complete within the owning pool's budget.
    #[error("statement exceeded the pool budget of {budget:?}")]
    DeadlineExceeded { budget: Duration },

    /// Driver-level failure (connection, syntax, constraint, ...).
    #[error("database error: {0}")]
    Query(#[from] sqlx::Error),

    /// A schema script failed; startup aborts on the first one.
    #[error("schema script {} failed: {source}", path.display())]
    Script {
        path: PathBuf,
        source: sqlx::Error,
    },

    /// Schema scripts could not be read from disk.
    #[error("reading schema scripts at {}: {source}", path.display())]
    ScriptIo {
        path: PathBuf,
        source: std::io::Error,
    },
}
