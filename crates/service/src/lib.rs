//! Service layer for the cookie store.
//! - `store`: the hash-map key-value contract and its backends
//! - `cookies`: save / remove / list / stats on top of a store
//! - `observer`: hook for non-critical side effects and failures

pub mod errors;
pub mod store;
pub mod observer;
pub mod cookies;

pub use cookies::CookieService;
pub use errors::ServiceError;
