//! Domain types shared by the service and HTTP layers.
//! - `cookie`: stored record and storage key naming
//! - `request`: inbound payloads and their validation

pub mod errors;
pub mod cookie;
pub mod request;

pub use cookie::{CookieRecord, DEFAULT_CATEGORY};
pub use errors::ModelError;
