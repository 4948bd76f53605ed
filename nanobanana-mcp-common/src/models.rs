//! Model definitions and registry for Gemini image models.
//!
//! This module provides static model definitions, a registry for resolving
//! model names and aliases, and the ordered candidate list used for
//! fallback when a model is not available to the caller's API key.

use serde::Serialize;

/// Gemini image model definition.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeminiImageModel {
    /// Full model identifier
    pub id: &'static str,
    /// Model aliases for convenience
    pub aliases: &'static [&'static str],
    /// Whether the model is a preview/legacy variant kept only for fallback
    pub legacy: bool,
}

// =============================================================================
// Static Model Definitions
// =============================================================================

/// Gemini 2.5 Flash Image ("Nano Banana"), the default model
pub const GEMINI_2_5_FLASH_IMAGE: GeminiImageModel = GeminiImageModel {
    id: "gemini-2.5-flash-image",
    aliases: &["nano-banana", "gemini-flash-image", "flash-image"],
    legacy: false,
};

/// Gemini 2.5 Flash Image preview, served to keys without GA access
pub const GEMINI_2_5_FLASH_IMAGE_PREVIEW: GeminiImageModel = GeminiImageModel {
    id: "gemini-2.5-flash-image-preview",
    aliases: &["nano-banana-preview", "flash-image-preview"],
    legacy: true,
};

/// Gemini 3 Pro Image ("Nano Banana Pro"), opt-in via override
pub const GEMINI_3_PRO_IMAGE_PREVIEW: GeminiImageModel = GeminiImageModel {
    id: "gemini-3-pro-image-preview",
    aliases: &["nano-banana-pro", "gemini-3-pro-image"],
    legacy: false,
};

/// All known Gemini image models
pub const GEMINI_IMAGE_MODELS: &[GeminiImageModel] = &[
    GEMINI_2_5_FLASH_IMAGE,
    GEMINI_2_5_FLASH_IMAGE_PREVIEW,
    GEMINI_3_PRO_IMAGE_PREVIEW,
];

/// Default model identifier.
pub const DEFAULT_IMAGE_MODEL: &str = GEMINI_2_5_FLASH_IMAGE.id;

/// Fallback model identifier tried after the default.
pub const LEGACY_IMAGE_MODEL: &str = GEMINI_2_5_FLASH_IMAGE_PREVIEW.id;

// =============================================================================
// Model Registry
// =============================================================================

/// Model registry for resolution and listing.
pub struct ModelRegistry;

impl ModelRegistry {
    /// Resolve a model name or alias to its full definition.
    ///
    /// # Examples
    ///
    /// ```
    /// use nanobanana_mcp_common::models::ModelRegistry;
    ///
    /// let model = ModelRegistry::resolve("nano-banana");
    /// assert_eq!(model.map(|m| m.id), Some("gemini-2.5-flash-image"));
    /// ```
    pub fn resolve(name: &str) -> Option<&'static GeminiImageModel> {
        GEMINI_IMAGE_MODELS
            .iter()
            .find(|model| model.id == name || model.aliases.contains(&name))
    }

    /// Canonical identifier for `name`: the registered id for a known name or
    /// alias, `name` itself otherwise.
    pub fn canonical_id(name: &str) -> String {
        Self::resolve(name)
            .map(|model| model.id.to_string())
            .unwrap_or_else(|| name.to_string())
    }

    /// List all known image models.
    pub fn list_models() -> &'static [GeminiImageModel] {
        GEMINI_IMAGE_MODELS
    }

    /// Build the ordered, deduplicated candidate list.
    ///
    /// Order: the override (if any, alias-resolved), then `DEFAULT_IMAGE_MODEL`,
    /// then `LEGACY_IMAGE_MODEL`. Blank overrides are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use nanobanana_mcp_common::models::ModelRegistry;
    ///
    /// let candidates = ModelRegistry::candidates(Some("gemini-2.5-flash-image"));
    /// assert_eq!(
    ///     candidates,
    ///     vec!["gemini-2.5-flash-image", "gemini-2.5-flash-image-preview"]
    /// );
    /// ```
    pub fn candidates(model_override: Option<&str>) -> Vec<String> {
        let preferred = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(Self::canonical_id);

        let mut candidates: Vec<String> = Vec::with_capacity(3);
        for id in preferred
            .into_iter()
            .chain([DEFAULT_IMAGE_MODEL.to_string(), LEGACY_IMAGE_MODEL.to_string()])
        {
            if !candidates.contains(&id) {
                candidates.push(id);
            }
        }
        candidates
    }
}
