//! Session module: network identities and browsing sessions
//!
//! This module provides:
//! - The proxy pool and its identities
//! - The capability traits every session collaborator implements
//! - The session manager that owns rotation
//! - A reqwest-backed session for the catalog

mod http;
mod manager;
mod proxy;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use http::{HttpBrowser, HttpSession};
pub use manager::SessionManager;
pub use proxy::{ProxyIdentity, ProxyPool};
pub use traits::{Browser, Condition, Control, Session, Target};
