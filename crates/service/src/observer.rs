use tracing::{debug, error, warn};

use crate::errors::ServiceError;

/// Receives notable events from [`crate::CookieService`].
///
/// Stats maintenance is a non-critical side effect: when it fails the
/// request still succeeds and the failure is only reported here, leaving the
/// counts eventually consistent with the stored entries.
pub trait CookieObserver: Send + Sync {
    fn cookie_saved(&self, _key: &str, _value: &str) {}

    fn cookie_removed(&self, _key: &str, _value: &str) {}

    /// A stats increment or cleanup failed and was swallowed.
    fn stats_update_failed(&self, stats_key: &str, category: &str, err: &ServiceError);

    /// A read on the listing/removal path failed and that key was skipped.
    fn key_skipped(&self, key: &str, err: &ServiceError);
}

/// Default observer that only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl CookieObserver for TracingObserver {
    fn cookie_saved(&self, key: &str, _value: &str) {
        debug!(%key, "cookie saved");
    }

    fn cookie_removed(&self, key: &str, _value: &str) {
        debug!(%key, "cookie removed");
    }

    fn stats_update_failed(&self, stats_key: &str, category: &str, err: &ServiceError) {
        error!(%stats_key, %category, error = %err, "failed to update stats");
    }

    fn key_skipped(&self, key: &str, err: &ServiceError) {
        warn!(%key, error = %err, "skipping unreadable key");
    }
}
