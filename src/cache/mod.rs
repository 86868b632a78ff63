//! Cache module for storing API responses to disk
//!
//! This module provides a cache manager that persists payloads to the filesystem,
//! one JSON file per key. Callers decide staleness with a maximum age, and
//! `get_or_refresh` re-fetches through a caller-supplied routine once an entry
//! is too old or missing.

mod manager;

pub use manager::{CacheError, CacheManager, CachedData};
