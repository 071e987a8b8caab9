//! Shared types used across the order management crates.

pub mod types;

pub use types::OrderId;
