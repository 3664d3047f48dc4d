//! Domain layer types and invariants.

pub mod error;
pub mod languages;
pub mod posts;
pub mod types;
