//! Enums shared across the Keepsake crates.

pub mod enums;

pub use enums::*;
