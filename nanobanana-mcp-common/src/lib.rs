//! Nano Banana MCP Common Library
//!
//! Shared configuration, error handling, model registry, tracing and
//! transport utilities for the Nano Banana MCP server.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod tracing;
pub mod transport;

#[cfg(test)]
mod error_test;

pub use config::Config;
pub use error::{ConfigError, Error, ErrorKind, Result};
pub use models::ModelRegistry;
pub use server::{McpServerBuilder, ServerError, shutdown_channel};
pub use transport::{Transport, TransportArgs, TransportMode};
