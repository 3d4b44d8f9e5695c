//! Per-token session actors with lazy TTL expiry.
//!
//! Each session token maps to exactly one actor that owns the session state
//! and serializes its own operations through a mailbox. Expiry is evaluated
//! at read time; an expired read clears the state before reporting absent.

mod actor;
mod error;
mod registry;

pub use actor::SessionHandle;
pub use error::{Error, Result};
pub use registry::{SessionRegistry, derive_key};
