use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Category assigned when a save request omits one.
pub const DEFAULT_CATEGORY: &str = "default";

const COOKIES_NS: &str = "cookies";
const STATS_NS: &str = "stats";

/// A stored cookie value, serialized as JSON into the category hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub cookie: String,
    pub category: String,
    /// Unix seconds at save time.
    pub timestamp: i64,
}

impl CookieRecord {
    pub fn new(cookie: impl Into<String>, category: impl Into<String>) -> Self {
        Self::new_at(cookie, category, Utc::now().timestamp())
    }

    pub fn new_at(cookie: impl Into<String>, category: impl Into<String>, timestamp: i64) -> Self {
        Self { cookie: cookie.into(), category: category.into(), timestamp }
    }
}

/// Storage keys for one `(user, cookie type)` namespace.
#[derive(Clone, Copy, Debug)]
pub struct CookieKeys<'a> {
    pub user_id: &'a str,
    pub cookie_type: &'a str,
}

impl<'a> CookieKeys<'a> {
    pub fn new(user_id: &'a str, cookie_type: &'a str) -> Self {
        Self { user_id, cookie_type }
    }

    /// Hash holding `value -> record` for one category.
    pub fn category(&self, category: &str) -> String {
        format!("{}{}", self.category_prefix(), category)
    }

    /// Common prefix of every category hash in this namespace.
    pub fn category_prefix(&self) -> String {
        format!("{COOKIES_NS}:{}:{}:", self.user_id, self.cookie_type)
    }

    /// Hash holding `category -> count`.
    pub fn stats(&self) -> String {
        format!("{STATS_NS}:{}:{}", self.user_id, self.cookie_type)
    }

    /// Recover the category name from a key produced by [`Self::category`].
    pub fn category_of<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.category_prefix().as_str())
    }
}
