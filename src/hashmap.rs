//! Hash container aliases used for dictionary interning and id lookups.
//! Swapped for `ahash` under the `fast_hash` feature, the same trade-off
//! the teacher crate's `utils.rs` makes for its own interning paths.

#[cfg(feature = "fast_hash")]
pub use ahash::{AHashMap as HashMap, AHashSet as HashSet};
#[cfg(not(feature = "fast_hash"))]
pub use std::collections::{HashMap, HashSet};
