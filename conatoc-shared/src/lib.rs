//! # CONATOC Net Shared Library
//!
//! Core of the members-only portal: identity, the role policy, content
//! stores, upload staging and the publish transaction. The HTTP layer in
//! `conatoc-api` resolves the current actor and calls into this crate.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, session tokens, the policy table, actor middleware
//! - `db`: SQLite pool and migrations
//! - `models`: Database models and their SQL
//! - `identity`: Registration, login, role changes, deactivation, admin bootstrap
//! - `staging`: Single-use upload staging handles
//! - `publish`: Paper and dataset publish transaction
//! - `content`: Listings, downloads, news, chat, directories, overview
//! - `error`: Core error kinds

pub mod auth;
pub mod content;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod publish;
pub mod staging;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
