//! Application services layer.

pub mod admin;
pub mod distances;
pub mod error;
pub mod listings;
pub mod nearby;
pub mod proximity;
pub mod repos;
