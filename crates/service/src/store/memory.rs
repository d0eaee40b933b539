use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::HashStore;
use crate::errors::ServiceError;

/// Store commands that can be made to fail on purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    /// `set_field`
    Write,
    /// `get_all`
    Read,
    /// `keys_with_prefix`
    Scan,
    /// `incr_field`
    Increment,
}

impl FailPoint {
    fn bit(self) -> u8 {
        match self {
            FailPoint::Write => 1,
            FailPoint::Read => 1 << 1,
            FailPoint::Scan => 1 << 2,
            FailPoint::Increment => 1 << 3,
        }
    }

    fn message(self) -> &'static str {
        match self {
            FailPoint::Write => "injected write failure",
            FailPoint::Read => "injected read failure",
            FailPoint::Scan => "injected scan failure",
            FailPoint::Increment => "injected increment failure",
        }
    }
}

/// In-process [`HashStore`] for tests and local runs.
///
/// Follows Redis semantics where they matter to callers: a hash whose last
/// field is deleted disappears, and incrementing a non-integer field fails.
/// Keys enumerate in lexical order. Every command bumps a counter so tests
/// can assert that a request never reached the store.
#[derive(Clone, Default)]
pub struct MemoryHashStore {
    inner: Arc<RwLock<BTreeMap<String, HashMap<String, String>>>>,
    commands: Arc<AtomicUsize>,
    failing: Arc<AtomicU8>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commands issued against this store (shared across clones).
    pub fn command_count(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }

    /// Make every command behind `point` fail until switched off again.
    pub fn fail(&self, point: FailPoint, fail: bool) {
        if fail {
            self.failing.fetch_or(point.bit(), Ordering::SeqCst);
        } else {
            self.failing.fetch_and(!point.bit(), Ordering::SeqCst);
        }
    }

    /// Shorthand for [`FailPoint::Increment`].
    pub fn fail_increments(&self, fail: bool) {
        self.fail(FailPoint::Increment, fail);
    }

    fn record(&self) {
        self.commands.fetch_add(1, Ordering::SeqCst);
    }

    fn check(&self, point: FailPoint) -> Result<(), ServiceError> {
        if self.failing.load(Ordering::SeqCst) & point.bit() != 0 {
            return Err(ServiceError::store(point.message()));
        }
        Ok(())
    }
}

#[async_trait]
impl HashStore for MemoryHashStore {
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), ServiceError> {
        self.record();
        self.check(FailPoint::Write)?;
        let mut map = self.inner.write().await;
        map.entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, ServiceError> {
        self.record();
        let map = self.inner.read().await;
        Ok(map.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, ServiceError> {
        self.record();
        self.check(FailPoint::Read)?;
        let map = self.inner.read().await;
        Ok(map.get(key).cloned().unwrap_or_default())
    }

    async fn field_exists(&self, key: &str, field: &str) -> Result<bool, ServiceError> {
        self.record();
        let map = self.inner.read().await;
        Ok(map.get(key).is_some_and(|h| h.contains_key(field)))
    }

    async fn delete_field(&self, key: &str, field: &str) -> Result<bool, ServiceError> {
        self.record();
        let mut map = self.inner.write().await;
        let Some(hash) = map.get_mut(key) else { return Ok(false) };
        let existed = hash.remove(field).is_some();
        if hash.is_empty() {
            map.remove(key);
        }
        Ok(existed)
    }

    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, ServiceError> {
        self.record();
        self.check(FailPoint::Increment)?;
        let mut map = self.inner.write().await;
        let hash = map.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ServiceError::store("hash value is not an integer"))?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ServiceError> {
        self.record();
        self.check(FailPoint::Scan)?;
        let map = self.inner.read().await;
        Ok(map.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}
