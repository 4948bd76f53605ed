//! Image generation handler.
//!
//! Owns the credential, the backend handle, the model resolver and the session
//! state, and implements every tool operation on top of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use nanobanana_mcp_common::config::Config;
use nanobanana_mcp_common::error::Error;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::{GenerateContentRequest, GeminiPart};
use crate::backend::{BackendFactory, GeminiBackendFactory, ImageBackend};
use crate::codec::{self, ImagePayload};
use crate::credentials::{Credential, CredentialSource, CredentialStore, LoadReport};
use crate::resolver::ModelResolver;
use crate::session::{LastImageInfo, SessionState};

/// Acknowledgement returned by a successful credential configuration.
pub const CONFIGURED_ACK: &str = "configured";

/// Filename prefix for text-to-image results.
pub const GENERATED_PREFIX: &str = "generated";

/// Filename prefix for edit results.
pub const EDITED_PREFIX: &str = "edited";

/// Attempts at finding an unused output filename before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

/// Reply to `get_configuration_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationStatus {
    /// Whether a credential and a backend handle are both present
    pub configured: bool,
    /// Where the credential came from
    pub source: CredentialSource,
}

/// Image generation handler.
pub struct NanoBananaHandler {
    config: Config,
    credentials: CredentialStore,
    backend: Option<Arc<dyn ImageBackend>>,
    backend_factory: Arc<dyn BackendFactory>,
    resolver: ModelResolver,
    session: SessionState,
}

impl NanoBananaHandler {
    /// Handler talking to the Gemini API.
    pub fn new(config: Config) -> Self {
        let factory = Arc::new(GeminiBackendFactory::new(config.clone()));
        Self::with_backend_factory(config, factory)
    }

    /// Handler creating backends through `backend_factory`.
    pub fn with_backend_factory(config: Config, backend_factory: Arc<dyn BackendFactory>) -> Self {
        let resolver = ModelResolver::from_override(config.model_override.as_deref());
        let credentials = CredentialStore::new(config.config_file.clone());
        Self {
            config,
            credentials,
            backend: None,
            backend_factory,
            resolver,
            session: SessionState::new(),
        }
    }

    /// Application configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Candidate models in trial order.
    pub fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// Resolve the startup credential and create a backend for it.
    ///
    /// `env_value` is the raw value of `GEMINI_API_KEY`, if set.
    #[instrument(level = "debug", skip_all)]
    pub async fn load_on_startup(&mut self, env_value: Option<&str>) -> LoadReport {
        let report = self.credentials.load_on_startup(env_value).await;

        if let Some(credential) = self.credentials.credential() {
            match self.backend_factory.create(credential) {
                Ok(backend) => self.backend = Some(backend),
                Err(e) => warn!(error = %e, "Failed to create backend for startup credential"),
            }
        }

        info!(
            source = ?report.source,
            environment = ?report.environment,
            file = ?report.file,
            configured = self.backend.is_some(),
            "Credential startup resolution finished"
        );
        report
    }

    /// Set the API key, create a fresh backend and persist the key.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank key (nothing changes).
    /// - `IOError` if the key cannot be persisted; the new key stays active.
    #[instrument(level = "info", skip_all)]
    pub async fn configure_credential(&mut self, api_key: &str) -> Result<&'static str, Error> {
        let credential = Credential::parse(api_key)?;
        let backend = self.backend_factory.create(&credential)?;

        self.backend = Some(backend);
        self.credentials.configure(credential).await?;

        Ok(CONFIGURED_ACK)
    }

    /// Current credential status.
    pub fn configuration_status(&self) -> ConfigurationStatus {
        ConfigurationStatus {
            configured: self.credentials.credential().is_some() && self.backend.is_some(),
            source: self.credentials.source(),
        }
    }

    /// Generate an image from a text prompt and return the saved path.
    ///
    /// # Errors
    /// `PreconditionFailed` without a credential, `InvalidInput` for a blank
    /// prompt, and any resolution, generation or save failure.
    #[instrument(level = "info", skip(self))]
    pub async fn generate_image(&mut self, prompt: &str) -> Result<PathBuf, Error> {
        let backend = self.require_backend()?;
        require_prompt(prompt)?;

        let request = GenerateContentRequest::from_prompt(prompt);
        self.run_and_save(backend.as_ref(), &request, GENERATED_PREFIX)
            .await
    }

    /// Edit `image_path` guided by `prompt` and optional reference images.
    ///
    /// Unreadable reference images are skipped; an unreadable main image is
    /// an error.
    #[instrument(level = "info", skip(self, reference_images), fields(references = reference_images.len()))]
    pub async fn edit_image(
        &mut self,
        image_path: &Path,
        prompt: &str,
        reference_images: &[PathBuf],
    ) -> Result<PathBuf, Error> {
        let backend = self.require_backend()?;
        require_prompt(prompt)?;

        let main = codec::load_image(image_path).await?;
        let mut parts = vec![GeminiPart::inline(main.to_inline())];

        for reference in reference_images {
            match codec::load_image(reference).await {
                Ok(payload) => parts.push(GeminiPart::inline(payload.to_inline())),
                Err(e) => warn!(path = %reference.display(), error = %e, "Skipping unreadable reference image"),
            }
        }
        parts.push(GeminiPart::text(prompt));

        let request = GenerateContentRequest::user(parts);
        self.run_and_save(backend.as_ref(), &request, EDITED_PREFIX)
            .await
    }

    /// Edit the last saved image.
    ///
    /// # Errors
    /// `PreconditionFailed` when there is no previous image or it has been
    /// deleted, plus everything [`edit_image`](Self::edit_image) can return.
    pub async fn continue_editing(
        &mut self,
        prompt: &str,
        reference_images: &[PathBuf],
    ) -> Result<PathBuf, Error> {
        let last = self.session.require_last_image().await?;
        info!(path = %last.display(), "Continuing edit of last image");
        self.edit_image(&last, prompt, reference_images).await
    }

    /// Describe the last saved image.
    pub async fn last_image_info(&self) -> LastImageInfo {
        self.session.info().await
    }

    fn require_backend(&self) -> Result<Arc<dyn ImageBackend>, Error> {
        match (&self.backend, self.credentials.credential()) {
            (Some(backend), Some(_)) => Ok(backend.clone()),
            _ => Err(Error::precondition(
                "Gemini API key is not configured. Call configure_credential or set GEMINI_API_KEY.",
            )),
        }
    }

    /// Resolve a model, save every returned image and return the first path.
    async fn run_and_save(
        &mut self,
        backend: &dyn ImageBackend,
        request: &GenerateContentRequest,
        prefix: &str,
    ) -> Result<PathBuf, Error> {
        let resolved = self.resolver.resolve(backend, request).await?;

        for text in resolved.response.first_candidate_texts() {
            debug!(model = %resolved.model, text = %text, "Model text response");
        }

        let payloads = resolved
            .response
            .first_candidate_images()
            .into_iter()
            .map(ImagePayload::from_inline)
            .collect::<Result<Vec<_>, _>>()?;

        if payloads.is_empty() {
            let reason = resolved
                .response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("none");
            return Err(Error::generation_failed(format!(
                "{} returned no image data (finish reason: {})",
                resolved.model, reason
            )));
        }

        let mut first = None;
        for payload in &payloads {
            let path = save_image(&self.config.output_dir, prefix, &payload.bytes).await?;
            self.session.record(path.clone());
            first.get_or_insert(path);
        }

        first.ok_or_else(|| Error::internal("no image saved"))
    }
}

fn require_prompt(prompt: &str) -> Result<(), Error> {
    if prompt.trim().is_empty() {
        return Err(Error::invalid_input("Prompt cannot be empty"));
    }
    Ok(())
}

/// `<prefix>-<UTC timestamp, ':' and '.' as '-'>-<suffix>.png`
pub fn output_filename(prefix: &str, at: DateTime<Utc>, suffix: &str) -> String {
    let timestamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}-{}-{}.png", prefix, timestamp, suffix)
}

fn random_suffix() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(6);
    id
}

/// Create `dir` (and parents) with mode 0o755 on Unix.
async fn ensure_output_dir(dir: &Path) -> Result<(), Error> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(dir).await.map_err(|e| Error::file(dir, e))
}

/// Write `bytes` to a fresh file in `dir`. Never overwrites.
async fn save_image(dir: &Path, prefix: &str, bytes: &[u8]) -> Result<PathBuf, Error> {
    ensure_output_dir(dir).await?;

    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(output_filename(prefix, Utc::now(), &random_suffix()));
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::file(&path, e)),
        };

        file.write_all(bytes).await.map_err(|e| Error::file(&path, e))?;
        file.flush().await.map_err(|e| Error::file(&path, e))?;

        info!(path = %path.display(), size = bytes.len(), "Saved image");
        return Ok(path);
    }

    Err(Error::internal(format!(
        "Could not find an unused filename in {}",
        dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{image_response, not_found, ScriptedBackend, SharedBackendFactory};
    use crate::credentials::SourceOutcome;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use chrono::TimeZone;
    use nanobanana_mcp_common::ErrorKind;
    use nanobanana_mcp_common::models::LEGACY_IMAGE_MODEL;

    struct Fixture {
        dir: tempfile::TempDir,
        backend: Arc<ScriptedBackend>,
        handler: NanoBananaHandler,
    }

    fn fixture(backend: ScriptedBackend) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(backend);
        let handler = NanoBananaHandler::with_backend_factory(
            Config::rooted_at(dir.path()),
            Arc::new(SharedBackendFactory(backend.clone())),
        );
        Fixture { dir, backend, handler }
    }

    async fn configured(backend: ScriptedBackend) -> Fixture {
        let mut fx = fixture(backend);
        fx.handler.configure_credential("test-key").await.unwrap();
        fx
    }

    fn inline_of(part: &GeminiPart) -> Option<&crate::api::InlineData> {
        match part {
            GeminiPart::InlineData { inline_data } => Some(inline_data),
            GeminiPart::Text { .. } => None,
        }
    }

    #[test]
    fn test_output_filename_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(678);
        assert_eq!(
            output_filename(GENERATED_PREFIX, at, "abc123"),
            "generated-2024-01-02T03-04-05-678Z-abc123.png"
        );
    }

    #[test]
    fn test_random_suffix_shape() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_generate_requires_credential() {
        let mut fx = fixture(ScriptedBackend::returning_image(b"png"));

        let err = fx.handler.generate_image("a cat").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert!(fx.backend.models_called().is_empty());
    }

    #[tokio::test]
    async fn test_blank_credential_changes_nothing() {
        let mut fx = fixture(ScriptedBackend::returning_image(b"png"));

        let err = fx.handler.configure_credential("   ").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            fx.handler.configuration_status(),
            ConfigurationStatus {
                configured: false,
                source: CredentialSource::Unset
            }
        );
        assert!(!fx.handler.config().config_file.exists());
    }

    #[tokio::test]
    async fn test_configure_reports_status_and_persists() {
        let mut fx = fixture(ScriptedBackend::returning_image(b"png"));

        assert_eq!(fx.handler.configure_credential("key-1").await.unwrap(), CONFIGURED_ACK);

        let status = serde_json::to_value(fx.handler.configuration_status()).unwrap();
        assert_eq!(status, serde_json::json!({"configured": true, "source": "persisted-file"}));

        let on_disk = std::fs::read_to_string(&fx.handler.config().config_file).unwrap();
        assert!(on_disk.contains("key-1"));
    }

    #[tokio::test]
    async fn test_startup_from_environment() {
        let mut fx = fixture(ScriptedBackend::returning_image(b"png"));

        let report = fx.handler.load_on_startup(Some("env-key")).await;

        assert_eq!(report.environment, SourceOutcome::Loaded);
        assert_eq!(
            fx.handler.configuration_status(),
            ConfigurationStatus {
                configured: true,
                source: CredentialSource::Environment
            }
        );
        assert!(fx.handler.generate_image("a cat").await.is_ok());
    }

    #[tokio::test]
    async fn test_startup_without_credential() {
        let mut fx = fixture(ScriptedBackend::returning_image(b"png"));

        fx.handler.load_on_startup(None).await;

        assert!(!fx.handler.configuration_status().configured);
    }

    #[tokio::test]
    async fn test_generate_saves_image() {
        let mut fx = configured(ScriptedBackend::returning_image(b"png-bytes")).await;

        let path = fx.handler.generate_image("a cat").await.unwrap();

        assert_eq!(path.parent().unwrap(), fx.handler.config().output_dir);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("generated-"), "{}", name);
        assert!(name.ends_with(".png"), "{}", name);
        assert!(!name.contains(':'));
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");

        let requests = fx.backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].parts(), &[GeminiPart::text("a cat")]);
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_prompt() {
        let mut fx = configured(ScriptedBackend::returning_image(b"png")).await;

        let err = fx.handler.generate_image(" \n").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(fx.backend.models_called().is_empty());
    }

    #[tokio::test]
    async fn test_multiple_images_return_first_and_track_last() {
        let mut fx = configured(ScriptedBackend::new(|_, _| {
            Ok(image_response(&[b"first".as_slice(), b"second".as_slice()]))
        }))
        .await;

        let path = fx.handler.generate_image("two cats").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"first");
        let last = match fx.handler.last_image_info().await {
            LastImageInfo::Exists { path, size_bytes, .. } => {
                assert_eq!(size_bytes, 6);
                PathBuf::from(path)
            }
            other => panic!("unexpected {:?}", other),
        };
        assert_ne!(last, path);
        assert_eq!(std::fs::read(&last).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_zero_images_is_generation_failure() {
        let mut fx = configured(ScriptedBackend::new(|_, _| Ok(image_response(&[])))).await;

        let err = fx.handler.generate_image("a cat").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::GenerationFailed);
        assert_eq!(fx.handler.last_image_info().await, LastImageInfo::None);
    }

    #[tokio::test]
    async fn test_generate_falls_back_to_legacy_model() {
        let mut fx = configured(ScriptedBackend::new(|attempt, model| {
            if attempt == 0 {
                Err(not_found(model))
            } else {
                Ok(image_response(&[b"png"]))
            }
        }))
        .await;

        assert!(fx.handler.generate_image("a cat").await.is_ok());
        assert_eq!(fx.backend.models_called().last().unwrap(), LEGACY_IMAGE_MODEL);
    }

    #[tokio::test]
    async fn test_consecutive_saves_get_distinct_names() {
        let mut fx = configured(ScriptedBackend::returning_image(b"png")).await;

        let a = fx.handler.generate_image("one").await.unwrap();
        let b = fx.handler.generate_image("two").await.unwrap();

        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
    }

    #[tokio::test]
    async fn test_edit_builds_parts_in_order_and_skips_bad_references() {
        let mut fx = configured(ScriptedBackend::returning_image(b"edited")).await;
        let main = fx.dir.path().join("main.PNG");
        let reference = fx.dir.path().join("ref.webp");
        std::fs::write(&main, b"main").unwrap();
        std::fs::write(&reference, b"ref").unwrap();
        let missing = fx.dir.path().join("missing.jpg");

        let path = fx
            .handler
            .edit_image(&main, "make it blue", &[missing, reference])
            .await
            .unwrap();

        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("edited-"));

        let requests = fx.backend.requests();
        let parts = requests[0].parts();
        assert_eq!(parts.len(), 3);
        let main_inline = inline_of(&parts[0]).unwrap();
        assert_eq!(main_inline.mime_type, "image/png");
        assert_eq!(main_inline.data, BASE64.encode(b"main"));
        let ref_inline = inline_of(&parts[1]).unwrap();
        assert_eq!(ref_inline.mime_type, "image/webp");
        assert_eq!(parts[2], GeminiPart::text("make it blue"));
    }

    #[tokio::test]
    async fn test_edit_missing_main_image_is_io_error() {
        let mut fx = configured(ScriptedBackend::returning_image(b"png")).await;
        let missing = fx.dir.path().join("nope.png");

        let err = fx.handler.edit_image(&missing, "p", &[]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert!(fx.backend.models_called().is_empty());
    }

    #[tokio::test]
    async fn test_continue_editing_chains_on_last_image() {
        let mut fx = configured(ScriptedBackend::new(|attempt, _| {
            let bytes: &'static [u8] = if attempt == 0 { b"v1" } else { b"v2" };
            Ok(image_response(&[bytes]))
        }))
        .await;

        let no_previous = fx.handler.continue_editing("more", &[]).await.unwrap_err();
        assert_eq!(no_previous.kind(), ErrorKind::PreconditionFailed);

        let first = fx.handler.generate_image("start").await.unwrap();
        let second = fx.handler.continue_editing("more", &[]).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"v2");
        let requests = fx.backend.requests();
        assert_eq!(
            inline_of(&requests[1].parts()[0]).unwrap().data,
            BASE64.encode(b"v1")
        );

        std::fs::remove_file(&second).unwrap();
        let missing = fx.handler.continue_editing("again", &[]).await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::PreconditionFailed);
        assert_ne!(missing.to_string(), no_previous.to_string());
        assert_eq!(
            fx.handler.last_image_info().await,
            LastImageInfo::Missing {
                path: second.display().to_string(),
                exists: false
            }
        );
    }

    #[tokio::test]
    async fn test_save_failure_is_io_error() {
        let mut fx = configured(ScriptedBackend::returning_image(b"png")).await;
        // A regular file where the output directory should be
        std::fs::write(&fx.handler.config.output_dir, b"").unwrap();

        let err = fx.handler.generate_image("a cat").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoError);
    }
}
