//! Idempotent review memory
//!
//! There is no local database: the record of what was already reviewed is
//! the set of fingerprint markers embedded in previously posted comments.
//! [`hash`] computes and formats those fingerprints, [`tracker`] rehydrates
//! the reviewed-set from existing comments and filters new work against it.

pub mod hash;
pub mod tracker;

pub use hash::{extract_hash, format_hash_marker, function_hash, HASH_LENGTH};
pub use tracker::Tracker;
