//! Credential store.
//!
//! Resolves the Gemini API key at startup from the environment or the
//! persisted credential file, and persists keys set through the
//! `configure_credential` tool.

use std::fmt;
use std::path::{Path, PathBuf};

use nanobanana_mcp_common::error::Error;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A validated, non-blank API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

/// Reasons a credential is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Empty or whitespace-only value
    #[error("API key cannot be empty")]
    Empty,
}

impl From<CredentialError> for Error {
    fn from(err: CredentialError) -> Self {
        Error::invalid_input(err.to_string())
    }
}

impl Credential {
    /// Validate a raw secret. Surrounding whitespace is trimmed.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CredentialError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Where the in-memory credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSource {
    /// The `GEMINI_API_KEY` environment variable
    Environment,
    /// The persisted credential file (or an explicit configuration call)
    PersistedFile,
    /// No credential
    #[default]
    Unset,
}

/// On-disk credential file format.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCredential {
    #[serde(rename = "geminiApiKey")]
    gemini_api_key: String,
}

/// Outcome of consulting one credential source at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Nothing there
    Absent,
    /// Present but unusable; the reason is for diagnostics only
    Invalid(String),
    /// Credential taken from this source
    Loaded,
    /// Not consulted because an earlier source succeeded
    Skipped,
}

/// Per-source results of [`CredentialStore::load_on_startup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Resulting source tag
    pub source: CredentialSource,
    /// Environment variable outcome
    pub environment: SourceOutcome,
    /// Credential file outcome
    pub file: SourceOutcome,
}

/// Holds the active credential and its source tag.
#[derive(Debug)]
pub struct CredentialStore {
    credential: Option<Credential>,
    source: CredentialSource,
    file: PathBuf,
}

impl CredentialStore {
    /// Empty store persisting to `file`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            credential: None,
            source: CredentialSource::Unset,
            file: file.into(),
        }
    }

    /// The active credential, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// How the active credential was obtained.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Path of the persisted credential file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Resolve the startup credential.
    ///
    /// `env_value` is the raw value of `GEMINI_API_KEY`. A valid environment
    /// value wins and the file is not read. An invalid one falls through to
    /// the file. Missing or corrupt files leave the store unset. No error is
    /// returned; problems are logged and reported in the [`LoadReport`].
    pub async fn load_on_startup(&mut self, env_value: Option<&str>) -> LoadReport {
        let environment = match env_value.filter(|v| !v.is_empty()) {
            None => SourceOutcome::Absent,
            Some(raw) => match Credential::parse(raw) {
                Ok(credential) => {
                    self.credential = Some(credential);
                    self.source = CredentialSource::Environment;
                    info!("Loaded API key from environment");
                    return LoadReport {
                        source: self.source,
                        environment: SourceOutcome::Loaded,
                        file: SourceOutcome::Skipped,
                    };
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid API key in environment");
                    SourceOutcome::Invalid(e.to_string())
                }
            },
        };

        let file = match read_persisted(&self.file).await {
            Ok(Some(credential)) => {
                self.credential = Some(credential);
                self.source = CredentialSource::PersistedFile;
                info!(path = %self.file.display(), "Loaded API key from config file");
                SourceOutcome::Loaded
            }
            Ok(None) => {
                debug!(path = %self.file.display(), "No config file");
                SourceOutcome::Absent
            }
            Err(reason) => {
                warn!(path = %self.file.display(), reason = %reason, "Ignoring unusable config file");
                SourceOutcome::Invalid(reason)
            }
        };

        LoadReport {
            source: self.source,
            environment,
            file,
        }
    }

    /// Replace the active credential and persist it (overwriting the file).
    ///
    /// The new credential stays active even if writing the file fails.
    ///
    /// # Errors
    /// Returns `Error::File` if the credential file cannot be written.
    pub async fn configure(&mut self, credential: Credential) -> Result<(), Error> {
        let persisted = PersistedCredential {
            gemini_api_key: credential.expose().to_string(),
        };
        self.credential = Some(credential);
        self.source = CredentialSource::PersistedFile;

        let json = serde_json::to_string_pretty(&persisted)?;
        tokio::fs::write(&self.file, json)
            .await
            .map_err(|e| Error::file(&self.file, e))?;

        info!(path = %self.file.display(), "API key saved to config file");
        Ok(())
    }
}

/// `Ok(None)` when the file does not exist, `Err(reason)` when it is unusable.
async fn read_persisted(path: &Path) -> Result<Option<Credential>, String> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };

    let persisted: PersistedCredential =
        serde_json::from_str(&contents).map_err(|e| e.to_string())?;

    Credential::parse(&persisted.gemini_api_key)
        .map(Some)
        .map_err(|e| e.to_string())
}
