//! Domain layer types and invariants.

pub mod distances;
pub mod entities;
pub mod error;
pub mod proximity;
pub mod types;
