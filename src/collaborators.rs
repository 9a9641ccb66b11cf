//! Contracts for the external collaborators the core depends on.
//!
//! The core never implements caching, scheduling, job dispatch or event
//! fan-out itself; it holds these trait objects on the
//! [`crate::state::ServiceContext`] and calls through them. The null
//! implementations below keep a service runnable before real collaborators
//! are wired in, and double as test stand-ins.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// A unit of deferred work handed to the scheduler or dispatcher.
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// Read-through cache for hot values.
///
/// Implementations must be thread-safe and fail open: a cache error is a
/// miss, never a request failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the cached value, or `None` on miss or error.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores a value with an optional TTL.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>);

    /// Drops a cached value.
    async fn remove(&self, key: &str);

    /// Whether the backing store is reachable, for health reporting.
    async fn health_check(&self) -> bool;
}

/// Recurring-job scheduler (cron).
pub trait Scheduler: Send + Sync {
    /// Registers `job` to run every `every`, identified by `name`.
    fn schedule(&self, name: &str, every: Duration, job: Job);
}

/// Worker-pool dispatcher for one-shot background jobs.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// In-process publish/subscribe bus.
pub trait EventBus: Send + Sync {
    fn publish(&self, topic: &str, event: serde_json::Value);
}

/// A cache that never hits.
pub struct NullCache;

#[async_trait]
impl CacheStore for NullCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) {}

    async fn remove(&self, _key: &str) {}

    async fn health_check(&self) -> bool {
        true
    }
}

/// A scheduler that drops every registration.
pub struct NullScheduler;

impl Scheduler for NullScheduler {
    fn schedule(&self, name: &str, every: Duration, _job: Job) {
        debug!(name, every_secs = every.as_secs(), "scheduler disabled, dropping job");
    }
}

/// A dispatcher that drops every job.
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {
    fn dispatch(&self, _job: Job) {
        debug!("dispatcher disabled, dropping job");
    }
}

/// A bus with no subscribers.
pub struct NullBus;

impl EventBus for NullBus {
    fn publish(&self, topic: &str, _event: serde_json::Value) {
        debug!(topic, "event bus disabled, dropping event");
    }
}
