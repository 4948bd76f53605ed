//! Generative image backend.
//!
//! The [`ImageBackend`] trait is the seam between the orchestration layer and
//! the Gemini API. [`GeminiClient`] is the production implementation; tests
//! substitute scripted backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nanobanana_mcp_common::config::Config;
use nanobanana_mcp_common::error::Error;
use tracing::{debug, instrument};

use crate::api::{GenerateContentRequest, GenerateContentResponse};
use crate::credentials::Credential;

/// Connect timeout for the Gemini API. Generation itself has no timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A backend able to run `generateContent` against a named model.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Submit `request` to `model`.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, Error>;
}

/// Creates a backend handle for a credential.
pub trait BackendFactory: Send + Sync {
    /// Build a backend authenticated with `credential`.
    fn create(&self, credential: &Credential) -> Result<Arc<dyn ImageBackend>, Error>;
}

/// Gemini API client authenticated with an API key.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    config: Config,
}

impl GeminiClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns `Error::Internal` if the HTTP client cannot be built.
    pub fn new(config: Config, credential: &Credential) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: credential.expose().to_string(),
            config,
        })
    }
}

#[async_trait]
impl ImageBackend for GeminiClient {
    #[instrument(level = "debug", name = "gemini_generate_content", skip(self, request))]
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, Error> {
        let endpoint = self.config.generate_content_endpoint(model);
        debug!(endpoint = %endpoint, parts = request.parts().len(), "Calling Gemini API");

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::api(&endpoint, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(&endpoint, status.as_u16(), body));
        }

        let response_text = response.text().await.map_err(|e| {
            Error::api(&endpoint, status.as_u16(), format!("Failed to read response: {}", e))
        })?;

        serde_json::from_str(&response_text).map_err(|e| {
            Error::api(
                &endpoint,
                status.as_u16(),
                format!(
                    "Failed to parse response: {}. Raw: {}",
                    e,
                    truncate(&response_text, 1000)
                ),
            )
        })
    }
}

/// Factory producing [`GeminiClient`]s for the configured API base URL.
pub struct GeminiBackendFactory {
    config: Config,
}

impl GeminiBackendFactory {
    /// Create a factory using `config`'s API base URL.
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl BackendFactory for GeminiBackendFactory {
    fn create(&self, credential: &Credential) -> Result<Arc<dyn ImageBackend>, Error> {
        Ok(Arc::new(GeminiClient::new(self.config.clone(), credential)?))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
