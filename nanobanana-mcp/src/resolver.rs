//! Model resolution with fallback.
//!
//! Tries each candidate model in order until one serves the request. Only
//! "model unavailable" failures move on to the next candidate; anything else
//! aborts immediately.

use nanobanana_mcp_common::error::Error;
use nanobanana_mcp_common::models::ModelRegistry;
use tracing::{info, instrument, warn};

use crate::api::{GenerateContentRequest, GenerateContentResponse};
use crate::backend::ImageBackend;

/// Substrings (lowercase) that mark a backend error as "model unavailable".
const UNAVAILABLE_MARKERS: &[&str] = &[
    "not found",
    "not_found",
    "not supported for generatecontent",
];

/// Whether a backend error message means the model is absent or unsupported.
///
/// This is a heuristic over the error text, not a structured code, because
/// the API reports retired and unknown models through free-form messages.
pub fn is_model_unavailable(message: &str) -> bool {
    let lower = message.to_lowercase();
    UNAVAILABLE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A successful resolution.
#[derive(Debug)]
pub struct Resolved {
    /// Backend response
    pub response: GenerateContentResponse,
    /// Model that served the request
    pub model: String,
}

/// Ordered list of candidate models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResolver {
    candidates: Vec<String>,
}

impl ModelResolver {
    /// Resolver over an explicit candidate list.
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// Resolver for an optional preferred model followed by the defaults.
    pub fn from_override(model_override: Option<&str>) -> Self {
        Self::new(ModelRegistry::candidates(model_override))
    }

    /// Candidates in trial order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Run `request` against each candidate until one succeeds.
    ///
    /// # Errors
    /// - The first non-recoverable backend error, unchanged.
    /// - `Error::ModelUnavailable` when every candidate reported the model as
    ///   unavailable.
    #[instrument(level = "debug", skip(self, backend, request))]
    pub async fn resolve(
        &self,
        backend: &dyn ImageBackend,
        request: &GenerateContentRequest,
    ) -> Result<Resolved, Error> {
        let mut tried = Vec::with_capacity(self.candidates.len());
        let mut last_error = String::from("no candidate models configured");

        for model in &self.candidates {
            info!(model = %model, "Trying image model");
            tried.push(model.clone());

            match backend.generate_content(model, request).await {
                Ok(response) => {
                    info!(model = %model, "Image model responded");
                    return Ok(Resolved {
                        response,
                        model: model.clone(),
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    if !is_model_unavailable(&message) {
                        return Err(e);
                    }
                    warn!(model = %model, error = %message, "Model unavailable, falling back");
                    last_error = message;
                }
            }
        }

        Err(Error::ModelUnavailable { tried, last_error })
    }
}
