//! Save persistence for a party-based dungeon crawler
//!
//! See the `save` module for an overview.

pub mod save;

pub use save::*;
