//! # Video Index Provider
//!
//! Implements `VideoIndex` against the index service HTTP API: entry lookup,
//! creation from a manifest address, and manifest updates for an existing
//! entry.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::IndexConnector;
pub use error::{IndexError, Result};
