//! Key-value store abstraction used by the cookie service.
//!
//! The contract mirrors the hash commands of a Redis-like server: one
//! string key per hash, field-level set/get/delete, atomic increment and
//! prefix enumeration of keys. Every call is a single command; nothing here
//! is transactional across calls.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::ServiceError;

pub mod memory;
pub mod redis_store;

pub use memory::{FailPoint, MemoryHashStore};
pub use redis_store::RedisHashStore;

#[async_trait]
pub trait HashStore: Send + Sync {
    /// Set `field` of hash `key`, overwriting any previous value.
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), ServiceError>;
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, ServiceError>;
    /// All fields of a hash; empty when the key does not exist.
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, ServiceError>;
    async fn field_exists(&self, key: &str, field: &str) -> Result<bool, ServiceError>;
    /// Delete a field; returns whether it existed.
    async fn delete_field(&self, key: &str, field: &str) -> Result<bool, ServiceError>;
    /// Atomically add `delta` to an integer field, returning the new value.
    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, ServiceError>;
    /// Keys starting with `prefix`, in backend order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ServiceError>;
}
