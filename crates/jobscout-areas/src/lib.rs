//! Location resolver for the jobscout workspace.
//!
//! Builds an in-memory index over the listings API's hierarchical area
//! tree and resolves free-text place names to canonical area ids via
//! exact, alias, and fuzzy matching.

pub mod index;
pub mod similarity;

pub use index::{AreaIndex, AreaLookup};
pub use similarity::similarity_ratio;
