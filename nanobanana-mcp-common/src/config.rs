//! Configuration module for loading environment variables and settings.
//!
//! The credential itself is not part of [`Config`]; it is owned by the
//! credential store, which reads [`API_KEY_ENV`] and [`CONFIG_FILE_NAME`].

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the preferred image model.
pub const MODEL_OVERRIDE_ENV: &str = "NANOBANANA_MODEL";

/// Environment variable overriding the output directory policy.
pub const OUTPUT_DIR_ENV: &str = "NANOBANANA_OUTPUT_DIR";

/// Environment variable overriding the Gemini API base URL.
pub const API_BASE_URL_ENV: &str = "GEMINI_API_BASE_URL";

/// Default Gemini API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Name of the persisted credential file, relative to the working directory.
pub const CONFIG_FILE_NAME: &str = ".nano-banana-config.json";

/// Output folder name used under the user's home (or Documents) directory.
pub const HOME_OUTPUT_DIR_NAME: &str = "nano-banana-images";

/// Output folder name used under the working directory.
pub const LOCAL_OUTPUT_DIR_NAME: &str = "generated_imgs";

/// Working-directory prefixes considered system-owned.
const SYSTEM_DIR_PREFIXES: &[&str] = &[
    "/usr",
    "/opt",
    "/bin",
    "/sbin",
    "/System",
    "/Library",
    "/Applications",
];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Preferred model identifier or alias, tried before the defaults
    pub model_override: Option<String>,
    /// Directory generated images are written to
    pub output_dir: PathBuf,
    /// Location of the persisted credential file
    pub config_file: PathBuf,
    /// Gemini API base URL
    pub api_base_url: String,
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if the working directory cannot be
    /// determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::invalid_value("current directory", e.to_string()))?;

        let model_override = std::env::var(MODEL_OVERRIDE_ENV)
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let output_dir = match std::env::var(OUTPUT_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => default_output_dir(Platform::current(), &cwd, home_dir().as_deref()),
        };

        let api_base_url = std::env::var(API_BASE_URL_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            model_override,
            output_dir,
            config_file: cwd.join(CONFIG_FILE_NAME),
            api_base_url,
        })
    }

    /// Configuration rooted at `dir`: images go to `dir/generated_imgs` and the
    /// credential file lives in `dir`.
    pub fn rooted_at(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_override: None,
            output_dir: dir.join(LOCAL_OUTPUT_DIR_NAME),
            config_file: dir.join(CONFIG_FILE_NAME),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Get the `generateContent` endpoint URL for a model.
    pub fn generate_content_endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            model
        )
    }
}

/// Platform family for the output directory policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows: images go to the Documents folder
    Windows,
    /// Everything else
    Unix,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Resolve the default output directory.
///
/// - Windows: `<home>/Documents/nano-banana-images`
/// - Working directory at `/` or under a system-owned prefix:
///   `<home>/nano-banana-images`
/// - Otherwise: `<cwd>/generated_imgs`
///
/// Without a home directory the working-directory rule applies.
pub fn default_output_dir(platform: Platform, cwd: &Path, home: Option<&Path>) -> PathBuf {
    match (platform, home) {
        (Platform::Windows, Some(home)) => home.join("Documents").join(HOME_OUTPUT_DIR_NAME),
        (Platform::Unix, Some(home)) if is_system_directory(cwd) => {
            home.join(HOME_OUTPUT_DIR_NAME)
        }
        _ => cwd.join(LOCAL_OUTPUT_DIR_NAME),
    }
}

/// Whether `dir` is the filesystem root or lies under a system-owned prefix.
pub fn is_system_directory(dir: &Path) -> bool {
    dir == Path::new("/")
        || SYSTEM_DIR_PREFIXES
            .iter()
            .any(|prefix| dir.starts_with(prefix))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
