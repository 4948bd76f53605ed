//! MCP Resources for the Nano Banana server.
//!
//! This module provides resource content for:
//! - `nanobanana://models` - Candidate order and registered image models

use nanobanana_mcp_common::models::ModelRegistry;
use serde::{Deserialize, Serialize};

/// URI of the models resource.
pub const MODELS_URI: &str = "nanobanana://models";

/// Model entry for the resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model identifier
    pub id: String,
    /// Accepted aliases
    pub aliases: Vec<String>,
    /// Kept only as a fallback
    pub legacy: bool,
}

/// Body of the models resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResource {
    /// Models in the order they are tried
    pub candidates: Vec<String>,
    /// All registered image models
    pub models: Vec<ModelEntry>,
}

/// Get the models resource as JSON.
pub fn models_resource_json(candidates: &[String]) -> String {
    let resource = ModelsResource {
        candidates: candidates.to_vec(),
        models: ModelRegistry::list_models()
            .iter()
            .map(|m| ModelEntry {
                id: m.id.to_string(),
                aliases: m.aliases.iter().map(|a| a.to_string()).collect(),
                legacy: m.legacy,
            })
            .collect(),
    };

    serde_json::to_string_pretty(&resource).unwrap_or_else(|_| "{}".to_string())
}
