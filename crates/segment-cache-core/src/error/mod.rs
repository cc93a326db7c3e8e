//! Error types for the segment cache.
//!
//! One unified [`CacheError`] covers the public surface; domain-specific
//! failures live in sub-error enums ([`IndexError`], [`StoreError`]) and
//! convert into the unified type via `From`.

mod sub_errors;
mod unified;

#[cfg(test)]
mod tests;

pub use sub_errors::{IndexError, StoreError};
pub use unified::{CacheError, CacheResult};
