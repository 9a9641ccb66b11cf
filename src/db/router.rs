//! Primary/replica pools and the four time-bounded data operations.

use std::future::Future;
use std::time::Duration;

use sqlx::postgres::{
    PgArguments, PgConnectOptions, PgPoolOptions, PgQueryResult, PgRow, PgSslMode,
};
use sqlx::{PgPool, Postgres};

use super::DbError;
use crate::config::PoolConfig;

/// A parameterized statement bound for either pool.
pub type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// One pool plus its statement budget.
pub(crate) struct TimedPool {
    pub(crate) pool: PgPool,
    budget: Duration,
}

impl TimedPool {
    /// Runs a driver future under this pool's budget. The stricter of the
    /// caller's own deadline and this budget applies, because an outer
    /// timeout simply drops this future; either way the connection returns
    /// to the pool on drop.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.budget, fut).await {
            Ok(result) => result.map_err(DbError::Query),
            Err(_) => {
                metrics::counter!("db_deadline_exceeded").increment(1);
                tracing::warn!(
                    operation,
                    budget_secs = self.budget.as_secs(),
                    "statement exceeded pool budget"
                );
                Err(DbError::DeadlineExceeded {
                    budget: self.budget,
                })
            }
        }
    }
}

/// Routes statements to the primary (writes) or replica (reads) pool.
///
/// Pools are created lazily: construction never touches the network, and a
/// connection is first established when a statement runs. Both pools exist
/// for the lifetime of the [`crate::state::ServiceContext`] and are safe for
/// concurrent use.
pub struct Database {
    pub(crate) primary: TimedPool,
    pub(crate) replica: TimedPool,
}

impl Database {
    /// Builds both pools from their independent configuration blocks.
    pub fn connect(primary: &PoolConfig, replica: &PoolConfig) -> Self {
        Self {
            primary: TimedPool {
                pool: build_pool(primary),
                budget: Duration::from_secs(primary.timeout_secs),
            },
            replica: TimedPool {
                pool: build_pool(replica),
                budget: Duration::from_secs(replica.timeout_secs),
            },
        }
    }

    /// Wraps pre-built pools. Used by embedders and tests that already own
    /// a pool.
    pub fn from_pools(
        primary: PgPool,
        primary_budget: Duration,
        replica: PgPool,
        replica_budget: Duration,
    ) -> Self {
        Self {
            primary: TimedPool {
                pool: primary,
                budget: primary_budget,
            },
            replica: TimedPool {
                pool: replica,
                budget: replica_budget,
            },
        }
    }

    /// Runs an `INSERT ... RETURNING`-style statement on the primary and
    /// returns its single row.
    pub async fn write(&self, query: PgQuery<'_>) -> Result<PgRow, DbError> {
        self.primary
            .bounded("write", query.fetch_one(&self.primary.pool))
            .await
    }

    /// Executes a mutating statement on the primary.
    pub async fn mutate(&self, query: PgQuery<'_>) -> Result<PgQueryResult, DbError> {
        self.primary
            .bounded("mutate", query.execute(&self.primary.pool))
            .await
    }

    /// Fetches a result set from the replica.
    pub async fn query_many(&self, query: PgQuery<'_>) -> Result<Vec<PgRow>, DbError> {
        self.replica
            .bounded("query_many", query.fetch_all(&self.replica.pool))
            .await
    }

    /// Fetches a single row from the replica.
    pub async fn query_one(&self, query: PgQuery<'_>) -> Result<PgRow, DbError> {
        self.replica
            .bounded("query_one", query.fetch_one(&self.replica.pool))
            .await
    }

    /// Round-trips both pools, for health reporting.
    pub async fn ping(&self) -> Result<(), DbError> {
        self.primary
            .bounded("ping", sqlx::query("SELECT 1").execute(&self.primary.pool))
            .await?;
        self.replica
            .bounded("ping", sqlx::query("SELECT 1").execute(&self.replica.pool))
            .await?;
        Ok(())
    }
}

/// Builds a lazy pool from one configuration block.
fn build_pool(config: &PoolConfig) -> PgPool {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .ssl_mode(if config.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        });

    if let Some(root) = &config.ssl_root_cert {
        options = options.ssl_root_cert(root);
    }
    if let Some(cert) = &config.ssl_cert {
        options = options.ssl_client_cert(cert);
    }
    if let Some(key) = &config.ssl_key {
        options = options.ssl_client_key(key);
    }

    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .max_lifetime(Duration::from_secs(config.max_lifetime_mins * 60))
        .acquire_timeout(Duration::from_secs(config.timeout_secs))
        .connect_lazy_with(options)
}
