//! # bazaar_core
//!
//! Identity resolution, access control and list-query construction for the
//! Bazaar marketplace. Nothing in here knows about HTTP.

pub mod auth;
pub mod ids;
pub mod migrate;
pub mod models;
pub mod query;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
