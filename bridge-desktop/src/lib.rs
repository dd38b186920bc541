//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the platform
//! bridge traits using desktop-appropriate libraries:
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `Timer` using `tokio::time`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem, TokioTimer};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let timer = TokioTimer;
//!
//!     // Hand these to core-service
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;
mod timer;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use timer::TokioTimer;
