//! Nano Banana MCP Server Library
//!
//! Image generation and editing over MCP using Gemini image models, with
//! model fallback, a persisted API key and edit chaining on the last image.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod backend;
pub mod codec;
pub mod credentials;
pub mod handler;
pub mod resolver;
pub mod resources;
pub mod server;
pub mod session;

pub use backend::{BackendFactory, GeminiBackendFactory, GeminiClient, ImageBackend};
pub use credentials::{Credential, CredentialSource, CredentialStore, LoadReport, SourceOutcome};
pub use handler::{ConfigurationStatus, NanoBananaHandler};
pub use resolver::{is_model_unavailable, ModelResolver};
pub use server::NanoBananaServer;
pub use session::LastImageInfo;
