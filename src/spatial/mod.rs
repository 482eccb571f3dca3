//! Spatial indexing for per-tick neighbor queries

pub mod sparse_hash;

pub use sparse_hash::{CellKey, SpatialEntry, SpatialIndex};
