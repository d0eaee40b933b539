use std::collections::BTreeMap;
use std::sync::Arc;

use models::cookie::CookieKeys;
use models::request::{ListOptions, NewCookie};
use models::CookieRecord;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::observer::{CookieObserver, TracingObserver};
use crate::store::HashStore;

/// Cookie CRUD over a [`HashStore`].
///
/// Entries live in one hash per `(user, cookie type, category)`; per-category
/// counts live in one stats hash per `(user, cookie type)`. Count updates run
/// after the primary write and never fail the operation.
#[derive(Clone)]
pub struct CookieService {
    store: Arc<dyn HashStore>,
    observer: Arc<dyn CookieObserver>,
}

impl CookieService {
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self { store, observer: Arc::new(TracingObserver) }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CookieObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Upsert a cookie into its category and bump the category count.
    ///
    /// Re-saving an existing value overwrites the record and still increments
    /// the count, so counts can exceed the number of distinct entries.
    pub async fn save(
        &self,
        user_id: &str,
        cookie_type: &str,
        new: NewCookie,
    ) -> Result<CookieRecord, ServiceError> {
        let keys = CookieKeys::new(user_id, cookie_type);
        let record = CookieRecord::new(new.value, new.category);
        let payload = serde_json::to_string(&record).map_err(|e| ServiceError::store(e.to_string()))?;

        let key = keys.category(&record.category);
        self.store.set_field(&key, &record.cookie, &payload).await?;
        self.observer.cookie_saved(&key, &record.cookie);

        self.adjust_count(&keys, &record.category, 1).await;
        Ok(record)
    }

    /// Remove `value` from the first category (in key enumeration order) that
    /// holds it. Returns that category, or `None` when the value was absent.
    ///
    /// A value stored under several categories loses only one copy per call.
    pub async fn remove(
        &self,
        user_id: &str,
        cookie_type: &str,
        value: &str,
    ) -> Result<Option<String>, ServiceError> {
        let keys = CookieKeys::new(user_id, cookie_type);
        let candidates = self.store.keys_with_prefix(&keys.category_prefix()).await?;

        for key in candidates {
            match self.store.field_exists(&key, value).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    self.observer.key_skipped(&key, &e);
                    continue;
                }
            }

            self.store.delete_field(&key, value).await?;
            self.observer.cookie_removed(&key, value);

            let Some(category) = keys.category_of(&key) else {
                return Ok(None);
            };
            self.adjust_count(&keys, category, -1).await;
            return Ok(Some(category.to_string()));
        }

        debug!(user_id, cookie_type, "cookie not found; nothing removed");
        Ok(None)
    }

    /// Collect records for one category (when filtered) or all of them,
    /// optionally shuffle, then cap at `qty`.
    pub async fn list(
        &self,
        user_id: &str,
        cookie_type: &str,
        opts: &ListOptions,
    ) -> Result<Vec<CookieRecord>, ServiceError> {
        let keys = CookieKeys::new(user_id, cookie_type);
        let sources = match &opts.category {
            Some(category) => vec![keys.category(category)],
            None => self.store.keys_with_prefix(&keys.category_prefix()).await?,
        };

        let mut records = Vec::new();
        for key in sources {
            let entries = match self.store.get_all(&key).await {
                Ok(entries) => entries,
                Err(e) => {
                    self.observer.key_skipped(&key, &e);
                    continue;
                }
            };
            for (field, raw) in entries {
                match serde_json::from_str::<CookieRecord>(&raw) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(%key, %field, error = %e, "skipping unparseable cookie record"),
                }
            }
        }

        if opts.random {
            records.shuffle(&mut rand::thread_rng());
        }
        if let Some(qty) = opts.qty {
            records.truncate(qty);
        }
        Ok(records)
    }

    /// Positive per-category counts; anything else in the stats hash is dropped.
    pub async fn stats(
        &self,
        user_id: &str,
        cookie_type: &str,
    ) -> Result<BTreeMap<String, i64>, ServiceError> {
        let keys = CookieKeys::new(user_id, cookie_type);
        let raw = self.store.get_all(&keys.stats()).await?;
        Ok(raw
            .into_iter()
            .filter_map(|(category, count)| match count.parse::<i64>() {
                Ok(n) if n > 0 => Some((category, n)),
                _ => None,
            })
            .collect())
    }

    /// Non-critical: failures go to the observer, never to the caller.
    async fn adjust_count(&self, keys: &CookieKeys<'_>, category: &str, delta: i64) {
        let stats_key = keys.stats();
        let count = match self.store.incr_field(&stats_key, category, delta).await {
            Ok(count) => count,
            Err(e) => {
                self.observer.stats_update_failed(&stats_key, category, &e);
                return;
            }
        };
        if count <= 0 {
            if let Err(e) = self.store.delete_field(&stats_key, category).await {
                self.observer.stats_update_failed(&stats_key, category, &e);
            }
        }
    }
}
