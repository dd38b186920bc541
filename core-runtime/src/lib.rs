//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the importer:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus and progress reporting
//! - Bounded retry execution
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the download and publish
//! crates depend on. It fixes the logging conventions, the retry semantics
//! shared by every network-mutating operation and the way progress leaves the
//! pipeline.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod retry;

pub use config::{BatchSettings, ImporterConfig, TransferSettings};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, NullProgress, ProgressSink};
pub use retry::{RetryBudget, RetryError, RetryPolicy};
