//! Caching of built artifacts.

pub mod freshness;

pub use freshness::{Fingerprint, FreshnessCache};
