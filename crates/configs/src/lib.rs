use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_addr")]
    pub addr: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: i64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_startup_ping_timeout")]
    pub startup_ping_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: default_redis_addr(),
            password: None,
            db: 0,
            max_retries: default_max_retries(),
            connect_timeout_secs: default_connect_timeout(),
            response_timeout_secs: default_response_timeout(),
            startup_ping_timeout_secs: default_startup_ping_timeout(),
        }
    }
}

/// Pre-shared secret expected in the `x-api-key` header.
#[derive(Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8080 }
fn default_redis_addr() -> String { "127.0.0.1:6379".into() }
fn default_max_retries() -> usize { 3 }
fn default_connect_timeout() -> u64 { 10 }
fn default_response_timeout() -> u64 { 5 }
fn default_startup_ping_timeout() -> u64 { 15 }

/// Read the TOML file named by `CONFIG_PATH` (default `config.toml`).
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

/// A missing file yields defaults; an unreadable or malformed one is an error.
pub fn load_from_file(path: &str) -> Result<AppConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse(&content).with_context(|| format!("parse {path}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(anyhow!("cannot read {path}: {e}")),
    }
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// File, then process environment, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Override fields from environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("API_KEY") {
            self.auth.api_key = v;
        }
        if let Some(v) = get("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(port) = get("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(w) = get("TOKIO_WORKER_THREADS").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(v) = get("REDIS_ADDR") {
            self.redis.addr = v;
        }
        if let Some(v) = get("REDIS_PASSWORD") {
            self.redis.password = Some(v);
        }
        if let Some(db) = get("REDIS_DB").and_then(|v| v.trim().parse::<i64>().ok()) {
            self.redis.db = db;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.redis.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<()> {
        self.host_port()?;
        if self.db < 0 {
            return Err(anyhow!("redis.db must be >= 0"));
        }
        if self.connect_timeout_secs == 0
            || self.response_timeout_secs == 0
            || self.startup_ping_timeout_secs == 0
        {
            return Err(anyhow!("redis timeouts must be positive seconds"));
        }
        Ok(())
    }

    /// Split `addr` into host and port.
    pub fn host_port(&self) -> Result<(String, u16)> {
        let (host, port) = self
            .addr
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("redis.addr must be host:port, got {:?}", self.addr))?;
        if host.is_empty() {
            return Err(anyhow!("redis.addr has an empty host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| anyhow!("redis.addr has an invalid port: {port:?}"))?;
        Ok((host.to_string(), port))
    }

    pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }
    pub fn response_timeout(&self) -> Duration { Duration::from_secs(self.response_timeout_secs) }
    pub fn startup_ping_timeout(&self) -> Duration { Duration::from_secs(self.startup_ping_timeout_secs) }
}

impl AuthConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("API_KEY environment variable is required"));
        }
        Ok(())
    }
}
