//! Gemini `generateContent` request/response types.

use serde::{Deserialize, Serialize};

/// Gemini API request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns (a single user turn here)
    pub contents: Vec<GeminiContent>,
    /// Generation configuration
    pub generation_config: GeminiGenerationConfig,
}

impl GenerateContentRequest {
    /// A request consisting of a single user turn with the given parts.
    pub fn user(parts: Vec<GeminiPart>) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GeminiGenerationConfig::text_and_image(),
        }
    }

    /// A bare-prompt request.
    pub fn from_prompt(prompt: &str) -> Self {
        Self::user(vec![GeminiPart::text(prompt)])
    }

    /// Parts of the (single) user turn.
    pub fn parts(&self) -> &[GeminiPart] {
        self.contents
            .first()
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }
}

/// Gemini content structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role (user or model)
    pub role: String,
    /// Content parts
    pub parts: Vec<GeminiPart>,
}

/// Gemini content part (request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeminiPart {
    /// Inline image data
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// Text content
    Text { text: String },
}

impl GeminiPart {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        GeminiPart::Text { text: text.into() }
    }

    /// An inline data part.
    pub fn inline(inline_data: InlineData) -> Self {
        GeminiPart::InlineData { inline_data }
    }
}

/// Inline binary data as carried on the wire (base64 encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type
    pub mime_type: String,
    /// Base64-encoded data
    pub data: String,
}

/// Gemini generation config.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    /// Response modalities (TEXT, IMAGE)
    pub response_modalities: Vec<String>,
}

impl GeminiGenerationConfig {
    /// Ask for text and image output.
    pub fn text_and_image() -> Self {
        Self {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
        }
    }
}

/// Gemini API response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Response candidates
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

impl GenerateContentResponse {
    /// Inline data parts of the first candidate, in order.
    pub fn first_candidate_images(&self) -> Vec<&InlineData> {
        self.first_candidate_parts()
            .iter()
            .filter_map(|part| match part {
                GeminiResponsePart::InlineData { inline_data } => Some(inline_data),
                _ => None,
            })
            .collect()
    }

    /// Text parts of the first candidate, in order.
    pub fn first_candidate_texts(&self) -> Vec<&str> {
        self.first_candidate_parts()
            .iter()
            .filter_map(|part| match part {
                GeminiResponsePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn first_candidate_parts(&self) -> &[GeminiResponsePart] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }
}

/// Gemini response candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Content
    pub content: Option<GeminiResponseContent>,
    /// Why generation stopped (e.g. "STOP", "SAFETY")
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Gemini response content.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiResponseContent {
    /// Content parts
    #[serde(default)]
    pub parts: Vec<GeminiResponsePart>,
}

/// Gemini response part.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GeminiResponsePart {
    /// Inline data (image)
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// Text content
    Text { text: String },
    /// Anything else (thought signatures, function calls, ...)
    Other(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_request_serialization() {
        let request = GenerateContentRequest::from_prompt("A cat");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "A cat");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }

    #[test]
    fn test_inline_part_serialization() {
        let part = GeminiPart::inline(InlineData {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        });
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["inlineData"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_response_extracts_first_candidate_images_only() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [
                            {"text": "Here you go"},
                            {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                            {"thoughtSignature": "abc"},
                            {"inlineData": {"mimeType": "image/png", "data": "BBBB"}}
                        ]
                    },
                    "finishReason": "STOP"
                },
                {
                    "content": {
                        "parts": [{"inlineData": {"mimeType": "image/png", "data": "CCCC"}}]
                    }
                }
            ]
        }))
        .unwrap();

        let images = response.first_candidate_images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data, "AAAA");
        assert_eq!(images[1].data, "BBBB");
        assert_eq!(response.first_candidate_texts(), vec!["Here you go"]);
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_candidate_images().is_empty());

        let blocked: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(blocked.first_candidate_images().is_empty());
        assert_eq!(blocked.candidates[0].finish_reason.as_deref(), Some("SAFETY"));
    }
}
