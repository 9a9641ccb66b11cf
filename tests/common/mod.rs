#![allow(dead_code)]

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chassis::config::{Config, Environment, JwtConfig, PoolConfig, ServerConfig};
use chassis::db::Database;
use chassis::middleware::RateLimiter;
use chassis::state::ServiceContext;

pub const ALLOWED_IP: &str = "10.1.1.1";
pub const ALLOWED_ORIGIN: &str = "https://a.example";

pub fn test_pool_config(host: &str) -> PoolConfig {
    PoolConfig {
        host: host.to_string(),
        port: 5432,
        database: "app".to_string(),
        user: "app".to_string(),
        password: "secret".to_string(),
        ssl: false,
        ssl_root_cert: None,
        ssl_cert: None,
        ssl_key: None,
        timeout_secs: 5,
        max_lifetime_mins: 30,
        min_connections: 0,
        max_connections: 5,
        execute_schema: false,
        scripts_dir: PathBuf::from("./scripts"),
    }
}

pub fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        server: ServerConfig {
            port: 3000,
            timeout_secs: 30,
            allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
            allowed_ips: vec![ALLOWED_IP.to_string()],
            rate_per_second: 50,
            rate_burst: 100,
        },
        jwt: JwtConfig {
            secret: "test-jwt-secret".to_string(),
            authorized: true,
            minutes: 60,
        },
        envelope_secret: "test-envelope-secret".to_string(),
        tls: None,
        primary: test_pool_config("primary-host"),
        replica: test_pool_config("replica-host"),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
    }
}

/// Builds a context over lazy pools; nothing touches the network until a
/// statement actually runs, so admission tests never need a database.
pub fn test_context() -> ServiceContext {
    let config = Arc::new(test_config());
    let db = Arc::new(Database::connect(&config.primary, &config.replica));
    ServiceContext::new(config, db)
}

/// A limiter that admits everything.
pub struct AllowAll;

impl RateLimiter for AllowAll {
    fn allow(&self, _ip: IpAddr) -> bool {
        true
    }
}

/// A limiter that rejects everything.
pub struct DenyAll;

impl RateLimiter for DenyAll {
    fn allow(&self, _ip: IpAddr) -> bool {
        false
    }
}
