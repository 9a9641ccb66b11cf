//! Process-wide service context shared by every in-flight request.

use std::sync::Arc;

use crate::auth::TokenAuthority;
use crate::collaborators::{
    CacheStore, Dispatcher, EventBus, NullBus, NullCache, NullDispatcher, NullScheduler,
    Scheduler,
};
use crate::config::Config;
use crate::db::Database;
use crate::envelope::EnvelopeCodec;
use crate::middleware::{GovernorLimiter, RateLimiter};

/// Long-lived, read-mostly aggregate created once at startup.
///
/// Everything here is immutable after construction and safe for concurrent
/// access without synchronization; cloning is cheap (all fields are `Arc`s).
/// Collaborators default to their null implementations and are swapped in
/// with the `with_*` builders before the server starts.
#[derive(Clone)]
pub struct ServiceContext {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenAuthority>,
    pub envelope: Arc<EnvelopeCodec>,
    pub db: Arc<Database>,
    pub limiter: Arc<dyn RateLimiter>,
    pub cache: Arc<dyn CacheStore>,
    pub scheduler: Arc<dyn Scheduler>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub bus: Arc<dyn EventBus>,
}

impl ServiceContext {
    /// Builds the context from validated configuration and connected pools.
    ///
    /// The token authority, envelope codec and governor-backed rate limiter
    /// are derived from the configuration; collaborators start as nulls.
    pub fn new(config: Arc<Config>, db: Arc<Database>) -> Self {
        let tokens = Arc::new(TokenAuthority::new(&config.jwt));
        let envelope = Arc::new(EnvelopeCodec::new(&config.envelope_secret));
        let limiter = Arc::new(GovernorLimiter::new(
            config.server.rate_per_second,
            config.server.rate_burst,
        ));

        Self {
            config,
            tokens,
            envelope,
            db,
            limiter,
            cache: Arc::new(NullCache),
            scheduler: Arc::new(NullScheduler),
            dispatcher: Arc::new(NullDispatcher),
            bus: Arc::new(NullBus),
        }
    }

    /// Replaces the rate limiter collaborator.
    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replaces the cache collaborator.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the scheduler collaborator.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replaces the dispatcher collaborator.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Replaces the event bus collaborator.
    pub fn with_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = bus;
        self
    }
}
