//! # Storage Gateway Provider
//!
//! Implements `PostageGateway` and `ContentStore` against the gateway HTTP
//! API.
//!
//! ## Overview
//!
//! This module provides:
//! - Chain price lookup and postage batch reservation
//! - Batch id resolution and usability checks for the batch poller
//! - File uploads stamped against a batch, with optional pinning
//! - Public offers for uploaded resources
//!
//! Requests are single attempts. Retrying is decided by the pipeline.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GatewayConnector;
pub use error::{GatewayError, Result};
